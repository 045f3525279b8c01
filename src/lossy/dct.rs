//! 8x8 Discrete Cosine Transform.

use std::f32::consts::PI;
use std::sync::OnceLock;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

/// `COS[k * 8 + n] = cos((2n + 1) k pi / 16)`
fn cos_table() -> &'static [f32; BLOCK_DIM] {
    static TABLE: OnceLock<[f32; BLOCK_DIM]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; BLOCK_DIM];
        for k in 0..BLOCK_SIZE {
            for n in 0..BLOCK_SIZE {
                table[k * BLOCK_SIZE + n] = (((2 * n + 1) * k) as f32 * PI / 16.0).cos();
            }
        }
        table
    })
}

#[inline]
fn norm(k: usize) -> f32 {
    if k == 0 { std::f32::consts::FRAC_1_SQRT_2 } else { 1.0 }
}

/// Forward DCT. `input` is row-major `[y * 8 + x]`, output is `[v * 8 + u]`
/// with the DC term at index 0.
pub fn fdct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let cos = cos_table();
    // Rows first, then columns.
    let mut rows = [0.0f32; BLOCK_DIM];
    for y in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for x in 0..BLOCK_SIZE {
                sum += input[y * BLOCK_SIZE + x] * cos[u * BLOCK_SIZE + x];
            }
            rows[y * BLOCK_SIZE + u] = sum;
        }
    }
    for v in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for y in 0..BLOCK_SIZE {
                sum += rows[y * BLOCK_SIZE + u] * cos[v * BLOCK_SIZE + y];
            }
            output[v * BLOCK_SIZE + u] = 0.25 * norm(u) * norm(v) * sum;
        }
    }
}

/// Inverse of [`fdct_8x8`].
pub fn idct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let cos = cos_table();
    let mut cols = [0.0f32; BLOCK_DIM];
    for y in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for v in 0..BLOCK_SIZE {
                sum += norm(v) * input[v * BLOCK_SIZE + u] * cos[v * BLOCK_SIZE + y];
            }
            cols[y * BLOCK_SIZE + u] = sum;
        }
    }
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for u in 0..BLOCK_SIZE {
                sum += norm(u) * cols[y * BLOCK_SIZE + u] * cos[u * BLOCK_SIZE + x];
            }
            output[y * BLOCK_SIZE + x] = 0.25 * sum;
        }
    }
}

/// Direct quadruple-loop form of the forward transform, kept for
/// verification and benchmarking.
pub fn fdct_8x8_reference(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    for v in 0..8 {
        for u in 0..8 {
            let mut sum = 0.0f32;
            for y in 0..8 {
                for x in 0..8 {
                    let cos_x = (((2 * x + 1) * u) as f32 * PI) / 16.0;
                    let cos_y = (((2 * y + 1) * v) as f32 * PI) / 16.0;
                    sum += input[y * 8 + x] * cos_x.cos() * cos_y.cos();
                }
            }
            output[v * 8 + u] = 0.25 * norm(u) * norm(v) * sum;
        }
    }
}
