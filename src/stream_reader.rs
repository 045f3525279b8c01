use crate::constants::{MAXIMUM_DIMENSION, MINIMUM_DIMENSION, STREAM_MAGIC, STREAM_VERSION};
use crate::error::{CodecError, CodecResult};
use crate::plan::CodecFamily;
use crate::stream_writer::StreamHeader;

/// Cursor over an encoded stream, mirroring [`StreamWriter`](crate::stream_writer::StreamWriter).
pub struct StreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self
            .source
            .get(self.position)
            .ok_or(CodecError::InvalidData("unexpected end of stream"))?;
        self.position += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bytes(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|&end| end <= self.source.len())
            .ok_or(CodecError::InvalidData("unexpected end of stream"))?;
        let bytes = &self.source[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Reads a u32 length prefix and that many bytes.
    pub fn read_section(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_header(&mut self) -> CodecResult<StreamHeader> {
        if self.read_bytes(4)? != &STREAM_MAGIC[..] {
            return Err(CodecError::InvalidData("missing stream magic"));
        }
        let version = self.read_byte()?;
        if version != STREAM_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let family_tag = self.read_byte()?;
        let family =
            CodecFamily::try_from(family_tag).map_err(|_| CodecError::UnknownFamily(family_tag))?;
        let flags = self.read_byte()?;
        let _reserved = self.read_byte()?;
        let width = self.read_u32()?;
        let height = self.read_u32()?;
        let range = MINIMUM_DIMENSION..=MAXIMUM_DIMENSION;
        if !range.contains(&width) || !range.contains(&height) {
            return Err(CodecError::InvalidData("stream dimensions out of range"));
        }
        Ok(StreamHeader {
            family,
            flags,
            width,
            height,
        })
    }
}

/// Reads only the header of an encoded stream.
pub fn peek_header(source: &[u8]) -> CodecResult<StreamHeader> {
    StreamReader::new(source).read_header()
}
