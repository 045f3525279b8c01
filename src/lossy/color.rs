//! RGB <-> YCbCr (BT.601 full range) and chroma resampling.
//!
//! Planes hold level-shifted samples (value - 128) so they feed the DCT
//! directly.

use crate::constants::CHANNELS;

#[inline]
pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.1687 * r - 0.3313 * g + 0.5 * b + 128.0;
    let cr = 0.5 * r - 0.4187 * g - 0.0813 * b + 128.0;
    (luma, cb, cr)
}

#[inline]
pub fn ycbcr_to_rgb(luma: f32, cb: f32, cr: f32) -> [u8; 3] {
    let cb = cb - 128.0;
    let cr = cr - 128.0;
    let r = luma + 1.402 * cr;
    let g = luma - 0.344136 * cb - 0.714136 * cr;
    let b = luma + 1.772 * cb;
    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

#[inline]
pub fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Splits interleaved RGBA into three level-shifted planes.
pub fn split_planes(rgba: &[u8], luma: &mut Vec<f32>, cb: &mut Vec<f32>, cr: &mut Vec<f32>) {
    let pixels = rgba.len() / CHANNELS;
    luma.clear();
    cb.clear();
    cr.clear();
    luma.reserve(pixels);
    cb.reserve(pixels);
    cr.reserve(pixels);
    for px in rgba.chunks_exact(CHANNELS) {
        let (y, u, v) = rgb_to_ycbcr(px[0] as f32, px[1] as f32, px[2] as f32);
        luma.push(y - 128.0);
        cb.push(u - 128.0);
        cr.push(v - 128.0);
    }
}

/// Dimensions of a plane after 2x2 subsampling.
pub fn subsampled_dims(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Averages each 2x2 neighbourhood. Odd trailing rows/columns average only
/// the samples that exist.
pub fn downsample_2x2(plane: &[f32], width: usize, height: usize, out: &mut Vec<f32>) {
    let (cw, ch) = subsampled_dims(width, height);
    out.clear();
    out.reserve(cw * ch);
    for cy in 0..ch {
        for cx in 0..cw {
            let mut sum = 0.0f32;
            let mut count = 0.0f32;
            for y in (cy * 2)..(cy * 2 + 2).min(height) {
                for x in (cx * 2)..(cx * 2 + 2).min(width) {
                    sum += plane[y * width + x];
                    count += 1.0;
                }
            }
            out.push(sum / count);
        }
    }
}

/// Nearest-neighbour expansion back to `width` x `height`.
pub fn upsample_2x2(plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    let (cw, _) = subsampled_dims(width, height);
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            out.push(plane[(y / 2) * cw + x / 2]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_roundtrip_within_one_level() {
        for rgb in [[255u8, 0, 0], [0, 255, 0], [0, 0, 255], [12, 200, 99], [255, 255, 255], [0, 0, 0]] {
            let (y, cb, cr) = rgb_to_ycbcr(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32);
            let back = ycbcr_to_rgb(y, cb, cr);
            for i in 0..3 {
                assert!((back[i] as i32 - rgb[i] as i32).abs() <= 1, "{:?} -> {:?}", rgb, back);
            }
        }
    }

    #[test]
    fn test_gray_has_neutral_chroma() {
        let (_, cb, cr) = rgb_to_ycbcr(77.0, 77.0, 77.0);
        assert!((cb - 128.0).abs() < 0.01);
        assert!((cr - 128.0).abs() < 0.01);
    }

    #[test]
    fn test_downsample_odd_dimensions() {
        // 3x3 plane: the last column and row average fewer samples.
        let plane = [1.0, 3.0, 10.0, 5.0, 7.0, 20.0, 100.0, 200.0, 50.0];
        let mut out = Vec::new();
        downsample_2x2(&plane, 3, 3, &mut out);
        assert_eq!(out, vec![4.0, 15.0, 150.0, 50.0]);

        let up = upsample_2x2(&out, 3, 3);
        assert_eq!(up, vec![4.0, 4.0, 15.0, 4.0, 4.0, 15.0, 150.0, 150.0, 50.0]);
    }
}
