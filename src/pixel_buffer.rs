//! Validated RGBA8 pixel storage handed to the analyzer and the codecs.

use crate::constants::{CHANNELS, MAXIMUM_DIMENSION, MINIMUM_DIMENSION};
use crate::error::{CodecError, CodecResult};

/// A decoded image: row-major RGBA samples, 8 bits per channel.
///
/// The length of `data` always equals `width * height * 4`; the constructor is
/// the only way in, so every consumer can rely on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> CodecResult<Self> {
        let expected = Self::required_len(width, height);
        let dimensions_ok = (MINIMUM_DIMENSION..=MAXIMUM_DIMENSION).contains(&width)
            && (MINIMUM_DIMENSION..=MAXIMUM_DIMENSION).contains(&height);
        if !dimensions_ok || data.len() != expected {
            return Err(CodecError::InvalidBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a buffer filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> CodecResult<Self> {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(width, height, data)
    }

    /// Expands packed RGB samples to RGBA with opaque alpha.
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8]) -> CodecResult<Self> {
        if rgb.len() != width as usize * height as usize * 3 {
            return Err(CodecError::InvalidBuffer {
                width,
                height,
                expected: width as usize * height as usize * 3,
                actual: rgb.len(),
            });
        }
        let mut data = Vec::with_capacity(rgb.len() / 3 * CHANNELS);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self::new(width, height, data)
    }

    pub fn required_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub fn has_alpha(&self) -> bool {
        self.data.chunks_exact(CHANNELS).any(|px| px[3] < 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = PixelBuffer::new(2, 2, vec![0u8; 15]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidBuffer {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_new_rejects_zero_and_oversized_dimensions() {
        assert!(PixelBuffer::new(0, 4, Vec::new()).is_err());
        assert!(PixelBuffer::new(MAXIMUM_DIMENSION + 1, 1, vec![0; (MAXIMUM_DIMENSION as usize + 1) * 4]).is_err());
    }

    #[test]
    fn test_from_rgb_sets_opaque_alpha() {
        let buffer = PixelBuffer::from_rgb(2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(buffer.data(), &[1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(!buffer.has_alpha());
    }

    #[test]
    fn test_pixel_accessor() {
        let mut data = vec![0u8; 3 * 2 * 4];
        data[(1 * 3 + 2) * 4..(1 * 3 + 2) * 4 + 4].copy_from_slice(&[9, 8, 7, 6]);
        let buffer = PixelBuffer::new(3, 2, data).unwrap();
        assert_eq!(buffer.pixel(2, 1), [9, 8, 7, 6]);
        assert!(buffer.has_alpha());
    }
}
