//! Bounds-checked little-endian access to borrowed byte buffers.
//!
//! Nothing in here ever indexes past the end of a slice: every read either
//! returns the value or `Error::TruncatedInput`.

use crate::error::{Error, Result};

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let available = buf.len().saturating_sub(offset);
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::TruncatedInput { needed: N, available })
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    read_array::<1>(buf, offset).map(|b| b[0])
}

pub fn read_u16le(buf: &[u8], offset: usize) -> Result<u16> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

pub fn read_u32le(buf: &[u8], offset: usize) -> Result<u32> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

pub fn read_u64le(buf: &[u8], offset: usize) -> Result<u64> {
    read_array(buf, offset).map(u64::from_le_bytes)
}

pub fn write_u16le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn write_u32le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

pub fn write_u64le(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Split a NUL-terminated byte string off the front of `buf`, returning the
/// string (without its terminator) and whatever follows it.
pub fn split_cstr(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let nul = buf.iter().position(|&b| b == 0)?;
    Some((&buf[..nul], &buf[nul + 1..]))
}

/// Append `s` and a null terminator. `what` names the field in the error
/// when `s` already holds a null byte.
pub fn push_cstr(out: &mut Vec<u8>, s: &str, what: &'static str) -> Result<()> {
    if s.bytes().any(|b| b == 0) {
        return Err(Error::InteriorNul(what));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

/// A read cursor over a byte slice that tracks how much is left and refuses
/// to hand out bytes it does not have.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf:    &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the buffer. Does not advance.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::TruncatedInput {
                needed:    len,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = read_u8(self.buf, self.offset)?;
        self.offset += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = read_u16le(self.buf, self.offset)?;
        self.offset += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = read_u32le(self.buf, self.offset)?;
        self.offset += 4;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let v = read_u64le(self.buf, self.offset)?;
        self.offset += 8;
        Ok(v)
    }
}
