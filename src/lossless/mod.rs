//! Filter-entropy codec (lossless family).
//!
//! Pipeline:
//! - optional palette reduction (median cut) when the image has at most 256 colors
//! - per-row predictive filter chosen by minimum residual sum
//! - zlib compression of the filtered rows

pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod palette;

pub use decoder::{LosslessDecoder, decode};
pub use encoder::{LosslessEncoder, encode};
