//! Transform-quantize encoder orchestration.

use tracing::trace;

use crate::bit_io::BitWriter;
use crate::codec::{EncodedStream, Optimization};
use crate::constants::{FLAG_ALPHA, FLAG_CHROMA_SUBSAMPLING, FLAG_PROGRESSIVE};
use crate::error::{CodecError, CodecResult};
use crate::lossless::encoder::encode_plane;
use crate::lossy::color::{downsample_2x2, split_planes, subsampled_dims};
use crate::lossy::dct::{BLOCK_DIM, BLOCK_SIZE, fdct_8x8};
use crate::lossy::entropy::{encode_band, spectral_bands, to_zigzag};
use crate::lossy::quantization::{
    STD_CHROMINANCE_QUANT_TABLE, STD_LUMINANCE_QUANT_TABLE, quantize_block, scaled_quant_table,
};
use crate::pixel_buffer::PixelBuffer;
use crate::plan::{CodecFamily, CodecParams, EncodePlan};
use crate::stream_writer::{StreamHeader, StreamWriter};

/// Deflate level for the embedded alpha plane. Fixed so the alpha section
/// does not depend on quality.
const ALPHA_COMPRESSION_LEVEL: u8 = 6;

/// Working memory reused between encodes on the same worker.
#[derive(Debug, Default)]
pub struct LossyScratch {
    luma: Vec<f32>,
    cb: Vec<f32>,
    cr: Vec<f32>,
    cb_small: Vec<f32>,
    cr_small: Vec<f32>,
    blocks: Vec<[i16; BLOCK_DIM]>,
    alpha: Vec<u8>,
}

/// Cuts `plane` into 8x8 blocks (edges replicated), transforms and quantizes
/// them, and appends the zigzag-ordered result to `blocks`.
fn transform_plane(
    plane: &[f32],
    width: usize,
    height: usize,
    table: &[u16; BLOCK_DIM],
    blocks: &mut Vec<[i16; BLOCK_DIM]>,
) {
    let mut samples = [0.0f32; BLOCK_DIM];
    let mut coefficients = [0.0f32; BLOCK_DIM];
    let mut quantized = [0i16; BLOCK_DIM];
    let mut zigzag = [0i16; BLOCK_DIM];

    for block_y in (0..height).step_by(BLOCK_SIZE) {
        for block_x in (0..width).step_by(BLOCK_SIZE) {
            for y in 0..BLOCK_SIZE {
                let sy = (block_y + y).min(height - 1);
                for x in 0..BLOCK_SIZE {
                    let sx = (block_x + x).min(width - 1);
                    samples[y * BLOCK_SIZE + x] = plane[sy * width + sx];
                }
            }
            fdct_8x8(&samples, &mut coefficients);
            quantize_block(&coefficients, table, &mut quantized);
            to_zigzag(&quantized, &mut zigzag);
            blocks.push(zigzag);
        }
    }
}

pub struct LossyEncoder {
    quality: f32,
    progressive: bool,
    chroma_subsampling: bool,
    luma_table: [u16; BLOCK_DIM],
    chroma_table: [u16; BLOCK_DIM],
}

impl LossyEncoder {
    pub fn new(plan: &EncodePlan) -> CodecResult<Self> {
        plan.validate()?;
        let CodecParams::TransformQuantize {
            quant_scale,
            chroma_subsampling,
        } = plan.params
        else {
            return Err(CodecError::InvalidData("plan is not a transform-quantize plan"));
        };
        Ok(Self {
            quality: plan.quality,
            progressive: plan.progressive,
            chroma_subsampling,
            luma_table: scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, plan.quality, quant_scale),
            chroma_table: scaled_quant_table(&STD_CHROMINANCE_QUANT_TABLE, plan.quality, quant_scale),
        })
    }

    pub fn encode(&self, buffer: &PixelBuffer) -> CodecResult<EncodedStream> {
        self.encode_with(buffer, &mut LossyScratch::default())
    }

    pub fn encode_with(&self, buffer: &PixelBuffer, scratch: &mut LossyScratch) -> CodecResult<EncodedStream> {
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let mut optimizations = Vec::new();
        let mut flags = 0u8;

        split_planes(buffer.data(), &mut scratch.luma, &mut scratch.cb, &mut scratch.cr);

        scratch.blocks.clear();
        transform_plane(&scratch.luma, width, height, &self.luma_table, &mut scratch.blocks);
        if self.chroma_subsampling {
            flags |= FLAG_CHROMA_SUBSAMPLING;
            optimizations.push(Optimization::ChromaSubsampling);
            let (cw, ch) = subsampled_dims(width, height);
            downsample_2x2(&scratch.cb, width, height, &mut scratch.cb_small);
            downsample_2x2(&scratch.cr, width, height, &mut scratch.cr_small);
            transform_plane(&scratch.cb_small, cw, ch, &self.chroma_table, &mut scratch.blocks);
            transform_plane(&scratch.cr_small, cw, ch, &self.chroma_table, &mut scratch.blocks);
        } else {
            transform_plane(&scratch.cb, width, height, &self.chroma_table, &mut scratch.blocks);
            transform_plane(&scratch.cr, width, height, &self.chroma_table, &mut scratch.blocks);
        }

        if self.progressive {
            flags |= FLAG_PROGRESSIVE;
            optimizations.push(Optimization::Progressive);
        }

        let alpha_section = if buffer.has_alpha() {
            flags |= FLAG_ALPHA;
            optimizations.push(Optimization::AlphaPlane);
            scratch.alpha.clear();
            scratch.alpha.extend(buffer.pixels().map(|px| px[3]));
            Some(encode_plane(&scratch.alpha, width, height, ALPHA_COMPRESSION_LEVEL)?)
        } else {
            None
        };

        let mut bits = BitWriter::with_capacity(scratch.blocks.len() * 8);
        for &(start, end) in spectral_bands(self.progressive) {
            for block in &scratch.blocks {
                encode_band(&mut bits, block, start, end);
            }
        }
        trace!(
            blocks = scratch.blocks.len(),
            bits = bits.bit_len(),
            "coefficients coded"
        );
        let coefficients = bits.finish();

        let mut writer = StreamWriter::with_capacity(coefficients.len() + 512);
        writer.write_header(&StreamHeader {
            family: CodecFamily::TransformQuantize,
            flags,
            width: buffer.width(),
            height: buffer.height(),
        });
        writer.write_u16((self.quality * 1000.0).round() as u16);
        for &step in self.luma_table.iter().chain(self.chroma_table.iter()) {
            writer.write_u16(step);
        }
        if let Some(alpha) = &alpha_section {
            writer.write_section(alpha);
        }
        writer.write_section(&coefficients);

        Ok(EncodedStream {
            data: writer.into_inner(),
            optimizations,
        })
    }
}

/// Encodes `buffer` with the transform-quantize pipeline.
pub fn encode(buffer: &PixelBuffer, plan: &EncodePlan) -> CodecResult<EncodedStream> {
    LossyEncoder::new(plan)?.encode(buffer)
}
