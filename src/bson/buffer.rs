//! Byte buffer adapters used by the encoder, decoder and frame codec.
//!
//! [`Writer`] appends little-endian values to a [`BytesMut`] and supports the
//! "write a placeholder, patch it later" pattern BSON needs for its length
//! prefixes. [`Reader`] is a cursor over borrowed bytes whose reads fail with
//! [`BsonError::Truncated`] instead of panicking.

use crate::error::{constants, BsonError, Result};
use bytes::{Buf, BufMut, BytesMut};

pub struct Writer<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    /// Current write offset
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    #[inline]
    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Bytes followed by a NUL terminator
    #[inline]
    pub fn write_cstring(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
        self.buf.put_u8(0);
    }

    /// Write a zero length prefix and return its offset for [`Writer::patch_length`]
    #[inline]
    pub fn reserve_length(&mut self) -> usize {
        let offset = self.position();
        self.buf.put_u32_le(0);
        offset
    }

    /// Overwrite bytes previously written at `offset`
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Store the byte count from `offset` to the current position at `offset`
    pub fn patch_length(&mut self, offset: usize) -> Result<()> {
        let span = self.position() - offset;
        let len = i32::try_from(span).map_err(|_| {
            BsonError::InvalidValueType(format!("document of {span} bytes exceeds i32 length"))
        })?;
        self.patch(offset, &len.to_le_bytes());
        Ok(())
    }

    /// Drop everything written after `offset`
    pub fn rewind(&mut self, offset: usize) {
        self.buf.truncate(offset);
    }
}

/// Cursor over the unconsumed part of a byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Next `n` bytes without consuming them
    #[inline]
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(..n)
    }

    /// Consume up to `n` bytes
    #[inline]
    pub fn erase(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data = &self.data[n..];
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .peek(n)
            .ok_or(BsonError::Truncated(constants::ERR_SHORT_BYTES))?;
        self.erase(n);
        Ok(bytes)
    }

    fn read_fixed(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .peek(n)
            .ok_or(BsonError::Truncated(constants::ERR_SHORT_VALUE))?;
        self.erase(n);
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fixed(1)?.get_u8())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_fixed(4)?.get_i32_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_fixed(4)?.get_u32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_fixed(8)?.get_i64_le())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.read_fixed(8)?.get_f64_le())
    }

    /// Bytes up to the next NUL; the NUL is consumed but not returned
    pub fn read_cstring(&mut self) -> Result<&'a [u8]> {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .ok_or(BsonError::InvalidCString)?;
        let text = &self.data[..end];
        self.erase(end + 1);
        Ok(text)
    }
}
