//! Quantization tables and the quality -> step mapping.

use crate::lossy::dct::BLOCK_DIM;

/// Standard luminance table (the usual "quality 50" reference).
pub const STD_LUMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard chrominance table.
pub const STD_CHROMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Multiplier applied to the base tables for a quality in [0, 1].
///
/// Non-increasing in `quality`: 50 at quality 0, 1 at 0.5, 0 at 1.0 (steps
/// are floored at 1 afterwards).
pub fn quality_scale(quality: f32) -> f32 {
    let q = (quality * 100.0).clamp(1.0, 100.0);
    if q < 50.0 { 50.0 / q } else { 2.0 - q / 50.0 }
}

/// Builds the step table for `quality` and an extra `quant_scale` multiplier.
pub fn scaled_quant_table(base: &[u8; BLOCK_DIM], quality: f32, quant_scale: f32) -> [u16; BLOCK_DIM] {
    let s = quality_scale(quality) * quant_scale;
    let mut table = [1u16; BLOCK_DIM];
    for i in 0..BLOCK_DIM {
        table[i] = (base[i] as f32 * s).round().clamp(1.0, u16::MAX as f32) as u16;
    }
    table
}

/// Divides each coefficient by its step and rounds half away from zero.
pub fn quantize_block(dct_block: &[f32; BLOCK_DIM], quant_table: &[u16; BLOCK_DIM], output: &mut [i16; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        output[i] = (dct_block[i] / quant_table[i] as f32).round() as i16;
    }
}

pub fn dequantize_block(quant_block: &[i16; BLOCK_DIM], quant_table: &[u16; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        output[i] = quant_block[i] as f32 * quant_table[i] as f32;
    }
}
