//! Filter-entropy encoder.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tracing::trace;

use crate::codec::{EncodedStream, Optimization};
use crate::constants::{CHANNELS, FLAG_ALPHA, FLAG_PALETTE};
use crate::error::{CodecError, CodecResult};
use crate::lossless::filter::filter_image;
use crate::lossless::palette::IndexedImage;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::{CodecFamily, CodecParams, EncodePlan, FilterMode};
use crate::stream_writer::{StreamHeader, StreamWriter};

/// Deflates `data` into zlib format at `level` (0..=9).
pub(crate) fn deflate(data: &[u8], level: u8) -> CodecResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level as u32),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Filters and deflates a single 8-bit plane, used for the alpha channel of
/// lossy streams.
pub(crate) fn encode_plane(plane: &[u8], width: usize, height: usize, level: u8) -> CodecResult<Vec<u8>> {
    let filtered = filter_image(plane, width, height, 1, FilterMode::Adaptive);
    deflate(&filtered, level)
}

pub struct LosslessEncoder {
    filter: FilterMode,
    palette: bool,
    compression_level: u8,
}

impl LosslessEncoder {
    pub fn new(plan: &EncodePlan) -> CodecResult<Self> {
        plan.validate()?;
        let CodecParams::FilterEntropy {
            filter,
            palette,
            compression_level,
        } = plan.params
        else {
            return Err(CodecError::InvalidData("plan is not a filter-entropy plan"));
        };
        Ok(Self {
            filter,
            palette,
            compression_level,
        })
    }

    pub fn encode(&self, buffer: &PixelBuffer) -> CodecResult<EncodedStream> {
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let mut optimizations = Vec::new();

        let indexed = if self.palette {
            let indexed = IndexedImage::from_buffer(buffer);
            if indexed.is_none() {
                trace!("palette step skipped, more than 256 colors");
            }
            indexed
        } else {
            None
        };

        let mut flags = 0u8;
        let (channels, raw): (u8, Vec<u8>) = match &indexed {
            Some(image) => {
                flags |= FLAG_PALETTE;
                if image.palette.iter().any(|c| c[3] < 255) {
                    flags |= FLAG_ALPHA;
                }
                optimizations.push(Optimization::PaletteReduction {
                    colors: image.palette.len() as u16,
                });
                (1, image.indices.clone())
            }
            None if buffer.has_alpha() => {
                flags |= FLAG_ALPHA;
                (CHANNELS as u8, buffer.data().to_vec())
            }
            None => {
                optimizations.push(Optimization::AlphaStripped);
                let rgb = buffer
                    .data()
                    .chunks_exact(CHANNELS)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                (3, rgb)
            }
        };

        let stride = width * channels as usize;
        let filtered = filter_image(&raw, stride, height, channels as usize, self.filter);
        if self.filter == FilterMode::Adaptive {
            optimizations.push(Optimization::AdaptiveFilter);
        }
        let compressed = deflate(&filtered, self.compression_level)?;

        let mut writer = StreamWriter::with_capacity(compressed.len() + 64);
        writer.write_header(&StreamHeader {
            family: CodecFamily::FilterEntropy,
            flags,
            width: buffer.width(),
            height: buffer.height(),
        });
        writer.write_byte(channels);
        writer.write_byte(self.filter.tag());
        if let Some(image) = &indexed {
            writer.write_u16(image.palette.len() as u16);
            for entry in &image.palette {
                writer.write_bytes(entry);
            }
        }
        writer.write_bytes(&compressed);

        Ok(EncodedStream {
            data: writer.into_inner(),
            optimizations,
        })
    }
}

/// Encodes `buffer` losslessly.
pub fn encode(buffer: &PixelBuffer, plan: &EncodePlan) -> CodecResult<EncodedStream> {
    LosslessEncoder::new(plan)?.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeFailure;

    #[test]
    fn test_opaque_image_drops_alpha() {
        let buffer = PixelBuffer::filled(4, 4, [1, 2, 3, 255]).unwrap();
        let stream = encode(&buffer, &EncodePlan::filter_entropy(1.0)).unwrap();
        assert!(stream.optimizations.contains(&Optimization::AlphaStripped));
        assert_eq!(stream.data[16], 3);
    }

    #[test]
    fn test_palette_flag_and_entries() {
        let buffer = PixelBuffer::filled(4, 4, [1, 2, 3, 200]).unwrap();
        let plan = EncodePlan::filter_entropy(1.0).with_palette(true);
        let stream = encode(&buffer, &plan).unwrap();
        assert_eq!(stream.data[6], FLAG_PALETTE | FLAG_ALPHA);
        assert_eq!(stream.data[16], 1);
        assert_eq!(&stream.data[18..20], &[0, 1]);
        assert_eq!(&stream.data[20..24], &[1, 2, 3, 200]);
        assert!(stream
            .optimizations
            .contains(&Optimization::PaletteReduction { colors: 1 }));
    }

    #[test]
    fn test_rejects_lossy_plan_and_bad_quality() {
        let buffer = PixelBuffer::filled(2, 2, [0, 0, 0, 255]).unwrap();
        assert!(encode(&buffer, &EncodePlan::transform_quantize(0.5)).is_err());
        assert_eq!(
            encode(&buffer, &EncodePlan::filter_entropy(2.0)).unwrap_err(),
            CodecError::EncodeFailure(EncodeFailure::QualityOutOfRange(2.0))
        );
    }
}
