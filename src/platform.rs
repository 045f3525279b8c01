//! Host-provided encoder slot.
//!
//! An embedding application can hand the orchestrator a native encoder for
//! large images. Whatever it returns must decode with [`crate::decode`]; a
//! `None` answer or an error falls through to the built-in codecs.

use crate::error::CodecResult;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::EncodePlan;

pub trait PlatformEncoder: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Returns `None` when the encoder declines this image or plan.
    fn encode(&self, buffer: &PixelBuffer, plan: &EncodePlan) -> Option<CodecResult<Vec<u8>>>;
}

/// The default: no host encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlatformEncoder;

impl PlatformEncoder for NoPlatformEncoder {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn encode(&self, _buffer: &PixelBuffer, _plan: &EncodePlan) -> Option<CodecResult<Vec<u8>>> {
        None
    }
}
