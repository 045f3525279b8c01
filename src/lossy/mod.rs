//! Transform-quantize codec (lossy family).
//!
//! Pipeline:
//! - RGB to level-shifted YCbCr, optional 2x2 chroma averaging
//! - 8x8 forward DCT with quality-scaled quantization
//! - zigzag scan, zero-run / magnitude Exp-Golomb coding, optionally split
//!   into two spectral bands
//!
//! Alpha, when present, travels losslessly beside the coefficients.

pub mod color;
pub mod dct;
pub mod decoder;
pub mod encoder;
pub mod entropy;
pub mod quantization;

pub use decoder::{LossyDecoder, decode};
pub use encoder::{LossyEncoder, LossyScratch, encode};
