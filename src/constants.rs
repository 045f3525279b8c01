pub const CHANNELS: usize = 4; // RGBA, 8 bits per sample

pub const MINIMUM_DIMENSION: u32 = 1;
pub const MAXIMUM_DIMENSION: u32 = 32767;

// Stream header, see stream_writer.rs for the field layout.
pub const STREAM_MAGIC: [u8; 4] = *b"RPX1";
pub const STREAM_VERSION: u8 = 1;
pub const STREAM_HEADER_SIZE: usize = 16;

pub const FLAG_ALPHA: u8 = 0x01;
pub const FLAG_CHROMA_SUBSAMPLING: u8 = 0x02;
pub const FLAG_PROGRESSIVE: u8 = 0x04;
pub const FLAG_PALETTE: u8 = 0x08;

// Zigzag position where the first spectral band ends when coefficients are
// written progressively (DC plus the five lowest AC terms).
pub const PROGRESSIVE_SPLIT: usize = 6;

pub const MAXIMUM_PALETTE_SIZE: usize = 256;
pub const MAXIMUM_COMPRESSION_LEVEL: u8 = 9;

// Selector thresholds.
pub const DEFAULT_QUALITY: f32 = 0.8;
pub const HIGH_QUALITY_THRESHOLD: f32 = 0.8;
pub const TIER_QUALITY_DELTA: f32 = 0.05;
pub const PROGRESSIVE_PIXEL_THRESHOLD: u64 = 1_000_000;

// Analyzer defaults.
pub const DEFAULT_EDGE_THRESHOLD: f32 = 128.0;
pub const DEFAULT_PHOTO_VARIANCE_THRESHOLD: f64 = 40.0;
pub const DEFAULT_MAX_TRACKED_COLORS: usize = 4096;
pub const DEFAULT_MAX_EDGE_SAMPLES: usize = 65536;
