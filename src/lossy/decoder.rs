//! Transform-quantize decoder.

use crate::bit_io::BitReader;
use crate::constants::{CHANNELS, FLAG_ALPHA, FLAG_CHROMA_SUBSAMPLING, FLAG_PROGRESSIVE};
use crate::error::{CodecError, CodecResult};
use crate::lossless::decoder::decode_plane;
use crate::lossy::color::{subsampled_dims, upsample_2x2, ycbcr_to_rgb};
use crate::lossy::dct::{BLOCK_DIM, BLOCK_SIZE, idct_8x8};
use crate::lossy::entropy::{decode_band, from_zigzag, spectral_bands};
use crate::lossy::quantization::dequantize_block;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::CodecFamily;
use crate::stream_reader::StreamReader;

fn block_count(width: usize, height: usize) -> usize {
    width.div_ceil(BLOCK_SIZE) * height.div_ceil(BLOCK_SIZE)
}

/// Rebuilds a level-shifted plane from its zigzag blocks, cropping the padding.
fn reconstruct_plane(
    blocks: &[[i16; BLOCK_DIM]],
    width: usize,
    height: usize,
    table: &[u16; BLOCK_DIM],
) -> Vec<f32> {
    let mut plane = vec![0.0f32; width * height];
    let blocks_per_row = width.div_ceil(BLOCK_SIZE);
    let mut natural = [0i16; BLOCK_DIM];
    let mut coefficients = [0.0f32; BLOCK_DIM];
    let mut samples = [0.0f32; BLOCK_DIM];

    for (index, block) in blocks.iter().enumerate() {
        from_zigzag(block, &mut natural);
        dequantize_block(&natural, table, &mut coefficients);
        idct_8x8(&coefficients, &mut samples);

        let block_x = (index % blocks_per_row) * BLOCK_SIZE;
        let block_y = (index / blocks_per_row) * BLOCK_SIZE;
        for y in 0..BLOCK_SIZE.min(height - block_y) {
            for x in 0..BLOCK_SIZE.min(width - block_x) {
                plane[(block_y + y) * width + block_x + x] = samples[y * BLOCK_SIZE + x];
            }
        }
    }
    plane
}

pub struct LossyDecoder<'a> {
    reader: StreamReader<'a>,
}

impl<'a> LossyDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: StreamReader::new(source),
        }
    }

    fn read_table(&mut self) -> CodecResult<[u16; BLOCK_DIM]> {
        let mut table = [0u16; BLOCK_DIM];
        for step in table.iter_mut() {
            *step = self.reader.read_u16()?;
            if *step == 0 {
                return Err(CodecError::InvalidData("zero quantization step"));
            }
        }
        Ok(table)
    }

    pub fn decode(&mut self) -> CodecResult<PixelBuffer> {
        let header = self.reader.read_header()?;
        if header.family != CodecFamily::TransformQuantize {
            return Err(CodecError::InvalidData("not a transform-quantize stream"));
        }
        let width = header.width as usize;
        let height = header.height as usize;

        if self.reader.read_u16()? > 1000 {
            return Err(CodecError::InvalidData("quality out of range"));
        }
        let luma_table = self.read_table()?;
        let chroma_table = self.read_table()?;

        let alpha = if header.has_flag(FLAG_ALPHA) {
            let section = self.reader.read_section()?;
            Some(decode_plane(section, width, height)?)
        } else {
            None
        };
        let coefficients = self.reader.read_section()?;

        let (chroma_width, chroma_height) = if header.has_flag(FLAG_CHROMA_SUBSAMPLING) {
            subsampled_dims(width, height)
        } else {
            (width, height)
        };
        let luma_blocks = block_count(width, height);
        let chroma_blocks = block_count(chroma_width, chroma_height);
        let total_blocks = luma_blocks + 2 * chroma_blocks;

        // Every band of every block costs at least one bit.
        let bands = spectral_bands(header.has_flag(FLAG_PROGRESSIVE));
        if (total_blocks * bands.len()) as u64 > coefficients.len() as u64 * 8 {
            return Err(CodecError::InvalidData("coefficient section too short"));
        }

        let mut blocks = vec![[0i16; BLOCK_DIM]; total_blocks];
        let mut bits = BitReader::new(coefficients);
        for &(start, end) in bands {
            for block in blocks.iter_mut() {
                decode_band(&mut bits, block, start, end)?;
            }
        }

        let (luma, chroma) = blocks.split_at(luma_blocks);
        let (cb, cr) = chroma.split_at(chroma_blocks);
        let luma = reconstruct_plane(luma, width, height, &luma_table);
        let mut cb = reconstruct_plane(cb, chroma_width, chroma_height, &chroma_table);
        let mut cr = reconstruct_plane(cr, chroma_width, chroma_height, &chroma_table);
        if header.has_flag(FLAG_CHROMA_SUBSAMPLING) {
            cb = upsample_2x2(&cb, width, height);
            cr = upsample_2x2(&cr, width, height);
        }

        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for i in 0..width * height {
            let [r, g, b] = ycbcr_to_rgb(luma[i] + 128.0, cb[i] + 128.0, cr[i] + 128.0);
            let a = alpha.as_ref().map_or(255, |plane| plane[i]);
            data.extend_from_slice(&[r, g, b, a]);
        }
        PixelBuffer::new(header.width, header.height, data)
    }
}

pub fn decode(source: &[u8]) -> CodecResult<PixelBuffer> {
    LossyDecoder::new(source).decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lossy::encoder::encode;
    use crate::plan::EncodePlan;

    fn smooth(width: u32, height: u32, alpha: bool) -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let a = if alpha { (x * 255 / width.max(1)) as u8 } else { 255 };
                data.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128, a]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    fn max_error(a: &PixelBuffer, b: &PixelBuffer) -> i32 {
        a.data()
            .iter()
            .zip(b.data())
            .map(|(&x, &y)| (x as i32 - y as i32).abs())
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_high_quality_reconstruction() {
        let buffer = smooth(21, 11, false);
        for progressive in [false, true] {
            let plan = EncodePlan::transform_quantize(1.0).with_progressive(progressive);
            let stream = encode(&buffer, &plan).unwrap();
            let decoded = decode(&stream.data).unwrap();
            assert_eq!(decoded.width(), 21);
            assert_eq!(decoded.height(), 11);
            assert!(max_error(&buffer, &decoded) <= 5, "error {}", max_error(&buffer, &decoded));
        }
    }

    #[test]
    fn test_alpha_plane_is_exact() {
        let buffer = smooth(16, 16, true);
        let plan = EncodePlan::transform_quantize(0.3).with_chroma_subsampling(true);
        let decoded = decode(&encode(&buffer, &plan).unwrap().data).unwrap();
        for (original, restored) in buffer.pixels().zip(decoded.pixels()) {
            assert_eq!(original[3], restored[3]);
        }
    }

    #[test]
    fn test_solid_color_survives_low_quality() {
        let buffer = PixelBuffer::filled(10, 6, [200, 40, 90, 255]).unwrap();
        let plan = EncodePlan::transform_quantize(0.1).with_chroma_subsampling(true);
        let decoded = decode(&encode(&buffer, &plan).unwrap().data).unwrap();
        assert!(max_error(&buffer, &decoded) <= 24, "error {}", max_error(&buffer, &decoded));
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let buffer = smooth(16, 16, false);
        let stream = encode(&buffer, &EncodePlan::transform_quantize(0.8)).unwrap();
        assert!(decode(&stream.data[..stream.data.len() - 4]).is_err());
        assert!(decode(&stream.data[..20]).is_err());
    }
}
