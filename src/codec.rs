//! Codec family dispatch.
//!
//! Both codecs are pure functions of `(buffer, plan)`. The only state a caller
//! can carry between encodes is [`EncodeScratch`], which holds reusable working
//! memory and never affects the output bytes.

use serde::Serialize;
use tracing::debug;

use crate::error::CodecResult;
use crate::lossy::LossyScratch;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::{CodecFamily, EncodePlan};
use crate::stream_reader::peek_header;
use crate::{lossless, lossy};

/// Diagnostics describing what an encode actually did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Optimization {
    ChromaSubsampling,
    Progressive,
    /// Alpha stored as a separate lossless plane inside a lossy stream.
    AlphaPlane,
    PaletteReduction { colors: u16 },
    AdaptiveFilter,
    /// Fully opaque image written without its alpha channel.
    AlphaStripped,
    PlatformEncoder,
    Fallback { from: CodecFamily },
}

/// Raw output of one codec before it is tagged with plan metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedStream {
    pub data: Vec<u8>,
    pub optimizations: Vec<Optimization>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedResult {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub family: CodecFamily,
    /// Quality the stream was produced at.
    pub quality: f32,
    pub optimizations: Vec<Optimization>,
}

impl EncodedResult {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn from_stream(stream: EncodedStream, buffer: &PixelBuffer, plan: &EncodePlan) -> Self {
        Self {
            data: stream.data,
            width: buffer.width(),
            height: buffer.height(),
            family: plan.family(),
            quality: plan.quality,
            optimizations: stream.optimizations,
        }
    }
}

/// Per-worker working memory.
#[derive(Debug, Default)]
pub struct EncodeScratch {
    lossy: LossyScratch,
}

/// Encodes `buffer` with the codec named by `plan`.
pub fn encode(buffer: &PixelBuffer, plan: &EncodePlan) -> CodecResult<EncodedResult> {
    encode_with_scratch(buffer, plan, &mut EncodeScratch::default())
}

pub fn encode_with_scratch(
    buffer: &PixelBuffer,
    plan: &EncodePlan,
    scratch: &mut EncodeScratch,
) -> CodecResult<EncodedResult> {
    let stream = match plan.family() {
        CodecFamily::TransformQuantize => {
            lossy::LossyEncoder::new(plan)?.encode_with(buffer, &mut scratch.lossy)?
        }
        CodecFamily::FilterEntropy => lossless::encode(buffer, plan)?,
    };
    debug!(
        family = plan.family().name(),
        width = buffer.width(),
        height = buffer.height(),
        bytes = stream.data.len(),
        "encoded"
    );
    Ok(EncodedResult::from_stream(stream, buffer, plan))
}

/// Decodes any stream produced by [`encode`].
pub fn decode(source: &[u8]) -> CodecResult<PixelBuffer> {
    match peek_header(source)?.family {
        CodecFamily::TransformQuantize => lossy::decode(source),
        CodecFamily::FilterEntropy => lossless::decode(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn test_dispatch_tags_result() {
        let buffer = PixelBuffer::filled(16, 16, [255, 0, 0, 255]).unwrap();
        let result = encode(&buffer, &EncodePlan::transform_quantize(0.9)).unwrap();
        assert_eq!(result.family, CodecFamily::TransformQuantize);
        assert_eq!(result.quality, 0.9);
        assert_eq!((result.width, result.height), (16, 16));
        assert!(result.len() < 1024, "{} bytes", result.len());

        let result = encode(&buffer, &EncodePlan::filter_entropy(0.9)).unwrap();
        assert_eq!(result.family, CodecFamily::FilterEntropy);
        assert_eq!(decode(&result.data).unwrap(), buffer);
    }

    #[test]
    fn test_decode_rejects_foreign_data() {
        assert!(decode(b"not a stream at all").is_err());
        let mut stream = encode(
            &PixelBuffer::filled(2, 2, [0, 0, 0, 255]).unwrap(),
            &EncodePlan::filter_entropy(1.0),
        )
        .unwrap()
        .data;
        stream[5] = 9;
        assert_eq!(decode(&stream).unwrap_err(), CodecError::UnknownFamily(9));
    }
}
