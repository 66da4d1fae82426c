//! Bounds-checked cursor over a product buffer.
//!
//! Every read either succeeds completely or fails with
//! [`TruncatedInputError`] leaving the cursor where it was.

use crate::error::{ReadError, TruncatedInputError};

/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Read cursor over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread part of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn check(&self, n: usize) -> Result<(), TruncatedInputError> {
        if n > self.remaining() {
            return Err(TruncatedInputError {
                offset: self.pos,
                requested: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Move the cursor to an absolute offset (at most the buffer length).
    pub fn seek(&mut self, offset: usize) -> Result<(), ReadError> {
        if offset > self.data.len() {
            return Err(TruncatedInputError {
                offset: self.pos,
                requested: offset - self.pos,
                remaining: self.remaining(),
            }
            .into());
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        self.check(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Split off the next `n` bytes as an independent reader and advance
    /// past them.
    pub fn take(&mut self, n: usize) -> Result<ByteReader<'a>, ReadError> {
        Ok(ByteReader::new(self.read_bytes(n)?))
    }

    /// Like [`take`](Self::take), but clamps `n` to the bytes available.
    pub fn take_up_to(&mut self, n: usize) -> ByteReader<'a> {
        let n = n.min(self.remaining());
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        ByteReader::new(bytes)
    }

    /// Read an unsigned integer of 1, 2, 4 or 8 bytes.
    pub fn read_uint(&mut self, width: usize, endian: Endian) -> Result<u64, ReadError> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(ReadError::InvalidWidth(width));
        }
        let bytes = self.read_bytes(width)?;
        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        Ok(match endian {
            Endian::Big => bytes.iter().fold(0, fold),
            Endian::Little => bytes.iter().rev().fold(0, fold),
        })
    }

    /// Read a two's complement signed integer of 1, 2, 4 or 8 bytes.
    pub fn read_int(&mut self, width: usize, endian: Endian) -> Result<i64, ReadError> {
        let raw = self.read_uint(width, endian)?;
        let shift = 64 - (width as u32 * 8);
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Read a fixed-length ASCII field; trailing NULs and spaces are
    /// stripped.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, ReadError> {
        let bytes = self.read_bytes(len)?;
        let text = String::from_utf8_lossy(bytes);
        Ok(text.trim_end_matches(&['\0', ' '][..]).to_string())
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        let b = self.read_bytes(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
