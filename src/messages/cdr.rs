//! Little-endian CDR primitives for topic payloads.
//!
//! Fixed buffers only, no allocation.  Alignment is relative to the start of
//! the payload, which is how the agent frames samples for a data writer.

use crate::error::CodecError;

/// CDR writer over a caller-provided buffer.
pub struct CdrWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> CdrWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub const fn position(&self) -> usize {
        self.pos
    }

    fn align(&mut self, alignment: usize) -> Result<(), CodecError> {
        let remainder = self.pos % alignment;
        if remainder != 0 {
            let padding = alignment - remainder;
            if self.pos + padding > self.buf.len() {
                return Err(CodecError::BufferTooSmall);
            }
            self.buf[self.pos..self.pos + padding].fill(0);
            self.pos += padding;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if self.pos + bytes.len() > self.buf.len() {
            return Err(CodecError::BufferTooSmall);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), CodecError> {
        self.align(4)?;
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.align(4)?;
        self.write_bytes(&value.to_le_bytes())
    }

    /// Encode a string: u32 length including the NUL terminator, the bytes,
    /// then the terminator.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = u32::try_from(value.len() + 1).map_err(|_| CodecError::BoundExceeded)?;
        self.write_u32(len)?;
        self.write_bytes(value.as_bytes())?;
        self.write_bytes(&[0])
    }
}

/// CDR reader over a received payload.
pub struct CdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn align(&mut self, alignment: usize) -> Result<(), CodecError> {
        let remainder = self.pos % alignment;
        if remainder != 0 {
            let padding = alignment - remainder;
            if self.pos + padding > self.buf.len() {
                return Err(CodecError::Truncated);
            }
            self.pos += padding;
        }
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated)?;
        if end > self.buf.len() {
            return Err(CodecError::Truncated);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.align(4)?;
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.align(4)?;
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decode a NUL-terminated string into a bounded `heapless::String`.
    ///
    /// A zero length is accepted as the empty string.
    pub fn read_string<const N: usize>(&mut self) -> Result<heapless::String<N>, CodecError> {
        let len = self.read_u32()? as usize;
        let mut out = heapless::String::new();
        if len == 0 {
            return Ok(out);
        }
        if len - 1 > N {
            return Err(CodecError::BoundExceeded);
        }
        let bytes = self.read_bytes(len)?;
        let (text, terminator) = bytes.split_at(len - 1);
        if terminator[0] != 0 {
            return Err(CodecError::InvalidString);
        }
        let text = core::str::from_utf8(text).map_err(|_| CodecError::InvalidString)?;
        out.push_str(text).map_err(|()| CodecError::BoundExceeded)?;
        Ok(out)
    }
}
