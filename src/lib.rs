//! Adaptive raster image compression.
//!
//! Given decoded RGBA pixels, the crate measures the content ([`analyze`]),
//! picks a codec and quality ([`select_strategy`]), and encodes with either a
//! lossy block-transform pipeline or a lossless filter + deflate pipeline
//! ([`encode`]). Many encodes can be run concurrently with caching and
//! failure recovery through the [`orchestrator`].

pub mod analysis;
pub mod bit_io;
pub mod codec;
pub mod constants;
pub mod error;
pub mod lossless;
pub mod lossy;
#[cfg(not(target_arch = "wasm32"))]
pub mod orchestrator;
pub mod pixel_buffer;
pub mod plan;
pub mod platform;
pub mod strategy;
pub mod stream_reader;
pub mod stream_writer;
pub mod wasm;

pub use analysis::{AnalyzerConfig, ContentClass, ContentStatistics, analyze, analyze_rgba, analyze_with};
pub use codec::{EncodeScratch, EncodedResult, Optimization, decode, encode, encode_with_scratch};
pub use error::{CodecError, CodecResult, EncodeFailure};
#[cfg(not(target_arch = "wasm32"))]
pub use orchestrator::{
    BatchError, BatchJob, CancellationToken, JobError, JobOutcome, Orchestrator, OrchestratorConfig,
    OrchestratorStats, submit_batch,
};
pub use pixel_buffer::PixelBuffer;
pub use plan::{CodecFamily, CodecParams, EncodePlan, FilterMode};
pub use platform::{NoPlatformEncoder, PlatformEncoder};
pub use strategy::{CompressionTier, Preferences, TargetFormat, select_strategy};
