//! Byte-level reading and writing for the container format.
//!
//! Encoding writes into a `Vec<u8>` through the [`ByteWriter`] trait.
//! Decoding walks an immutable byte slice through [`BufferReader`], and the
//! rANS decoder additionally reads its framed payload back to front through
//! [`TailReader`].

use thiserror::Error;

#[remain::sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderErr {
    #[error("malformed variable-length integer")]
    MalformedVarint,
    #[error("read past the end of the buffer")]
    OutOfBounds,
}

/// Little-endian byte sink.
pub trait ByteWriter {
    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16);
    fn write_u24(&mut self, value: u32);
    fn write_u32(&mut self, value: u32);
    fn write_f32(&mut self, value: f32);
    fn write_bytes(&mut self, bytes: &[u8]);
}

impl ByteWriter for Vec<u8> {
    fn write_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u24(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    fn write_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Forward cursor over a byte slice. All multi-byte reads are little-endian.
pub struct BufferReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderErr> {
        if self.pos >= self.data.len() {
            return Err(ReaderErr::OutOfBounds);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderErr> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderErr> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, ReaderErr> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReaderErr> {
        if len > self.remaining() {
            return Err(ReaderErr::OutOfBounds);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Splits off the next `len` bytes as an independent reader, advancing
    /// this one past them. Used for length-framed sections.
    pub fn subreader(&mut self, len: usize) -> Result<BufferReader<'a>, ReaderErr> {
        Ok(BufferReader::new(self.read_bytes(len)?))
    }
}

/// Back-to-front cursor over a byte slice. The rANS coder emits its
/// renormalization bytes forward and its final state last, so the decoder
/// consumes the payload from the end.
pub struct TailReader<'a> {
    data: &'a [u8],
    end: usize,
}

impl<'a> TailReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            end: data.len(),
        }
    }

    pub fn bytes_left(&self) -> usize {
        self.end
    }

    pub fn read_u8_back(&mut self) -> Result<u8, ReaderErr> {
        if self.end == 0 {
            return Err(ReaderErr::OutOfBounds);
        }
        self.end -= 1;
        Ok(self.data[self.end])
    }
}

/// An encoded mesh. Opaque bytes plus convenience accessors; the layout is
/// documented in the header and payload modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBuffer {
    data: Vec<u8>,
}

impl CompressedBuffer {
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
