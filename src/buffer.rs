//! A bounds-checked cursor over a fixed-size record.
//!
//! Record fields live at well-known byte offsets. Reads go through `u16_at` /
//! `u32_at` so that every field is addressed by a named constant rather than by
//! the order in which it happens to be read.

use bytes::Buf;

use crate::error::WoffError;

pub struct Buffer<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl Buf for Buffer<'_> {
    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    fn chunk(&self) -> &[u8] {
        self.remaining_as_slice()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "Tried to advance past the end of the buffer"
        );
        self.offset += cnt;
    }
}

impl<'a> Buffer<'a> {
    pub fn new(data: &'a [u8]) -> Buffer<'a> {
        Buffer {
            buffer: data,
            offset: 0,
        }
    }

    /// Read the big-endian `u16` stored at `offset`.
    pub fn u16_at(&mut self, offset: usize) -> Result<u16, WoffError> {
        self.set_offset(offset);
        Ok(self.try_get_u16()?)
    }

    /// Read the big-endian `u32` stored at `offset`.
    pub fn u32_at(&mut self, offset: usize) -> Result<u32, WoffError> {
        self.set_offset(offset);
        Ok(self.try_get_u32()?)
    }

    pub fn remaining_as_slice(&self) -> &[u8] {
        self.buffer.get(self.offset..).unwrap_or_default()
    }

    pub fn set_offset(&mut self, new_offset: usize) {
        self.offset = new_offset;
    }
}
