//! Coefficient entropy coding.
//!
//! Coefficients are visited in zigzag order over a band `[start, end)`. Each
//! nonzero coefficient is written as `EG(run + 1)`, `EG(|value|)` and a sign
//! bit, where `run` counts the zeros before it and `EG` is an order-0
//! Exp-Golomb code. The band is closed with `EG(trailing_zeros + 1)`.
//!
//! Merging two zero runs never costs more than the runs plus the coefficient
//! between them, and `EG` lengths grow with the magnitude, so coarser
//! quantization can only shorten the stream.

use crate::bit_io::{BitReader, BitWriter};
use crate::constants::PROGRESSIVE_SPLIT;
use crate::error::{CodecError, CodecResult};
use crate::lossy::dct::BLOCK_DIM;

/// Zigzag ranges written in turn over every block of every plane.
pub fn spectral_bands(progressive: bool) -> &'static [(usize, usize)] {
    if progressive {
        &[(0, PROGRESSIVE_SPLIT), (PROGRESSIVE_SPLIT, BLOCK_DIM)]
    } else {
        &[(0, BLOCK_DIM)]
    }
}

/// Zigzag scan pattern for 8x8 blocks.
pub const ZIGZAG_ORDER: [usize; 64] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Length in bits of the Exp-Golomb code for `value >= 1`.
pub fn exp_golomb_len(value: u32) -> u32 {
    debug_assert!(value >= 1);
    2 * (31 - value.leading_zeros()) + 1
}

pub fn write_exp_golomb(writer: &mut BitWriter, value: u32) {
    debug_assert!(value >= 1);
    let prefix = 31 - value.leading_zeros();
    writer.write_bits(0, prefix);
    writer.write_bits(value, prefix + 1);
}

pub fn read_exp_golomb(reader: &mut BitReader) -> CodecResult<u32> {
    let mut prefix = 0u32;
    while !reader.read_bit()? {
        prefix += 1;
        if prefix > 30 {
            return Err(CodecError::InvalidData("exp-golomb prefix too long"));
        }
    }
    let rest = reader.read_bits(prefix)?;
    Ok((1 << prefix) | rest)
}

/// Reorders a natural-order block into zigzag order.
pub fn to_zigzag(block: &[i16; BLOCK_DIM], out: &mut [i16; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        out[i] = block[ZIGZAG_ORDER[i]];
    }
}

pub fn from_zigzag(zigzag: &[i16; BLOCK_DIM], out: &mut [i16; BLOCK_DIM]) {
    for i in 0..BLOCK_DIM {
        out[ZIGZAG_ORDER[i]] = zigzag[i];
    }
}

/// Writes zigzag coefficients `start..end` of one block.
pub fn encode_band(writer: &mut BitWriter, zigzag: &[i16; BLOCK_DIM], start: usize, end: usize) {
    let mut run = 0u32;
    for &value in &zigzag[start..end] {
        if value == 0 {
            run += 1;
            continue;
        }
        write_exp_golomb(writer, run + 1);
        write_exp_golomb(writer, value.unsigned_abs() as u32);
        writer.write_bit(value < 0);
        run = 0;
    }
    write_exp_golomb(writer, run + 1);
}

/// Reads one band written by [`encode_band`] into `zigzag[start..end]`.
pub fn decode_band(reader: &mut BitReader, zigzag: &mut [i16; BLOCK_DIM], start: usize, end: usize) -> CodecResult<()> {
    let mut position = start;
    loop {
        let run = read_exp_golomb(reader)? as usize - 1;
        position += run;
        if position >= end {
            if position > end {
                return Err(CodecError::InvalidData("zero run overruns the band"));
            }
            return Ok(());
        }
        let magnitude = read_exp_golomb(reader)?;
        let magnitude =
            i16::try_from(magnitude).map_err(|_| CodecError::InvalidData("coefficient out of range"))?;
        zigzag[position] = if reader.read_bit()? { -magnitude } else { magnitude };
        position += 1;
    }
}

/// Number of bits [`encode_band`] would emit.
pub fn band_cost(zigzag: &[i16; BLOCK_DIM], start: usize, end: usize) -> u64 {
    let mut bits = 0u64;
    let mut run = 0u32;
    for &value in &zigzag[start..end] {
        if value == 0 {
            run += 1;
            continue;
        }
        bits += exp_golomb_len(run + 1) as u64 + exp_golomb_len(value.unsigned_abs() as u32) as u64 + 1;
        run = 0;
    }
    bits + exp_golomb_len(run + 1) as u64
}
