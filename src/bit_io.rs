//! MSB-first bit packing for the coefficient stream.

use crate::error::{CodecError, CodecResult};

/// Packs bits into a growable byte vector, most significant bit first.
pub struct BitWriter {
    data: Vec<u8>,
    bit_buffer: u64,
    bits_in_buffer: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    /// Writes the low `length` bits of `value`. `length` must be at most 32.
    pub fn write_bits(&mut self, value: u32, length: u32) {
        debug_assert!(length <= 32);
        if length == 0 {
            return;
        }
        let mask = if length == 32 { u32::MAX } else { (1u32 << length) - 1 };
        self.bit_buffer = (self.bit_buffer << length) | (value & mask) as u64;
        self.bits_in_buffer += length;

        while self.bits_in_buffer >= 8 {
            let shift = self.bits_in_buffer - 8;
            self.data.push((self.bit_buffer >> shift) as u8);
            self.bits_in_buffer = shift;
            self.bit_buffer &= (1u64 << shift) - 1;
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1);
    }

    /// Number of bits written so far, including the unflushed tail.
    pub fn bit_len(&self) -> u64 {
        self.data.len() as u64 * 8 + self.bits_in_buffer as u64
    }

    /// Pads the last partial byte with zeros and returns the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bits_in_buffer > 0 {
            let pad = 8 - self.bits_in_buffer;
            self.write_bits(0, pad);
        }
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bits written by [`BitWriter`].
pub struct BitReader<'a> {
    source: &'a [u8],
    position: usize,
    bit_buffer: u64,
    bits_in_buffer: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    pub fn read_bits(&mut self, count: u32) -> CodecResult<u32> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(0);
        }
        while self.bits_in_buffer < count {
            let byte = *self
                .source
                .get(self.position)
                .ok_or(CodecError::InvalidData("coefficient stream truncated"))?;
            self.position += 1;
            self.bit_buffer = (self.bit_buffer << 8) | byte as u64;
            self.bits_in_buffer += 8;
        }
        let shift = self.bits_in_buffer - count;
        let value = (self.bit_buffer >> shift) & ((1u64 << count) - 1);
        self.bits_in_buffer = shift;
        self.bit_buffer &= (1u64 << shift) - 1;
        Ok(value as u32)
    }

    pub fn read_bit(&mut self) -> CodecResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_reader_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x01, 2);
        writer.write_bits(0xFF, 8);
        writer.write_bits(0x0A, 4);
        writer.write_bits(0xDEAD_BEEF, 32);
        assert_eq!(writer.bit_len(), 46);
        let bytes = writer.finish();
        assert_eq!(bytes.len(), 6);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(2).unwrap(), 0x01);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert_eq!(reader.read_bits(4).unwrap(), 0x0A);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut reader = BitReader::new(&[0xAB]);
        assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
        assert!(reader.read_bit().is_err());
    }
}
