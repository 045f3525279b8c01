//! Stream writer.
//!
//! Every encoded stream starts with a fixed 16 byte header:
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | magic `RPX1`                            |
//! | 4      | 1    | version                                 |
//! | 5      | 1    | codec family                            |
//! | 6      | 1    | flags (alpha, subsampling, progressive, palette) |
//! | 7      | 1    | reserved, zero                          |
//! | 8      | 4    | width, big endian                       |
//! | 12     | 4    | height, big endian                      |
//!
//! The family-specific body follows directly.

use crate::constants::{STREAM_HEADER_SIZE, STREAM_MAGIC, STREAM_VERSION};
use crate::plan::CodecFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub family: CodecFamily,
    pub flags: u8,
    pub width: u32,
    pub height: u32,
}

impl StreamHeader {
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Appends big-endian fields to an owned buffer.
pub struct StreamWriter {
    destination: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::with_capacity(STREAM_HEADER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            destination: Vec::with_capacity(capacity),
        }
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    /// Writes a u32 length prefix followed by `bytes`.
    pub fn write_section(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    pub fn write_header(&mut self, header: &StreamHeader) {
        self.write_bytes(&STREAM_MAGIC);
        self.write_byte(STREAM_VERSION);
        self.write_byte(header.family.into());
        self.write_byte(header.flags);
        self.write_byte(0);
        self.write_u32(header.width);
        self.write_u32(header.height);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }
}

impl Default for StreamWriter {
    fn default() -> Self {
        Self::new()
    }
}
