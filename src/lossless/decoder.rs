//! Filter-entropy decoder.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::constants::{CHANNELS, FLAG_PALETTE, MAXIMUM_PALETTE_SIZE};
use crate::error::{CodecError, CodecResult};
use crate::lossless::filter::unfilter_image;
use crate::pixel_buffer::PixelBuffer;
use crate::plan::{CodecFamily, FilterMode};
use crate::stream_reader::StreamReader;

// Upfront reservation per compressed byte; the vector grows past it only as
// inflated data actually arrives.
const INFLATE_RESERVE_RATIO: usize = 16;

pub(crate) fn inflate(data: &[u8], expected_len: usize) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(INFLATE_RESERVE_RATIO)));
    ZlibDecoder::new(data)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() != expected_len {
        return Err(CodecError::InvalidData("inflated size does not match the image"));
    }
    Ok(out)
}

/// Inverse of `encode_plane`.
pub(crate) fn decode_plane(data: &[u8], width: usize, height: usize) -> CodecResult<Vec<u8>> {
    let filtered = inflate(data, height * (width + 1))?;
    unfilter_image(&filtered, width, height, 1)
}

pub struct LosslessDecoder<'a> {
    reader: StreamReader<'a>,
}

impl<'a> LosslessDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: StreamReader::new(source),
        }
    }

    pub fn decode(&mut self) -> CodecResult<PixelBuffer> {
        let header = self.reader.read_header()?;
        if header.family != CodecFamily::FilterEntropy {
            return Err(CodecError::InvalidData("not a filter-entropy stream"));
        }
        let width = header.width as usize;
        let height = header.height as usize;

        let channels = self.reader.read_byte()? as usize;
        let filter_tag = self.reader.read_byte()?;
        FilterMode::from_tag(filter_tag).ok_or(CodecError::InvalidData("unknown filter mode"))?;

        let palette = if header.has_flag(FLAG_PALETTE) {
            if channels != 1 {
                return Err(CodecError::InvalidData("palette stream must carry one channel"));
            }
            let count = self.reader.read_u16()? as usize;
            if count == 0 || count > MAXIMUM_PALETTE_SIZE {
                return Err(CodecError::InvalidData("palette size out of range"));
            }
            let entries = self.reader.read_bytes(count * 4)?;
            Some(
                entries
                    .chunks_exact(4)
                    .map(|c| [c[0], c[1], c[2], c[3]])
                    .collect::<Vec<_>>(),
            )
        } else {
            if channels != 3 && channels != 4 {
                return Err(CodecError::InvalidData("unsupported channel count"));
            }
            None
        };

        let stride = width * channels;
        let filtered = inflate(self.reader.remaining_data(), height * (stride + 1))?;
        let raw = unfilter_image(&filtered, stride, height, channels)?;

        let mut data = Vec::with_capacity(width * height * CHANNELS);
        match (&palette, channels) {
            (Some(palette), _) => {
                for &index in &raw {
                    let entry = palette
                        .get(index as usize)
                        .ok_or(CodecError::InvalidData("palette index out of range"))?;
                    data.extend_from_slice(entry);
                }
            }
            (None, 3) => {
                for px in raw.chunks_exact(3) {
                    data.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
            }
            (None, _) => data = raw,
        }
        PixelBuffer::new(header.width, header.height, data)
    }
}

pub fn decode(source: &[u8]) -> CodecResult<PixelBuffer> {
    LosslessDecoder::new(source).decode()
}
