//! Primitive wire helpers
//!
//! LoRaWAN multi-byte integers are little-endian. EUIs, DevAddr, NetID and
//! the join nonces are additionally held MSB-first in memory and sent
//! LSB-first, so they go through the reverse-copy helpers.

use bytes::{Buf, BufMut};

use super::error::{Error, Result};

/// Append the low `width` (1..=4) bytes of `v`, little-endian.
///
/// Fails with `FieldTooLarge` when `v` does not fit in `width` bytes.
pub fn append_uint_le<B: BufMut>(dst: &mut B, field: &'static str, v: u32, width: usize) -> Result<()> {
    debug_assert!((1..=4).contains(&width));
    let max = if width >= 4 {
        u32::MAX as u64
    } else {
        (1u64 << (8 * width)) - 1
    };
    if v as u64 > max {
        return Err(Error::too_large(field, max, v));
    }
    dst.put_uint_le(v as u64, width);
    Ok(())
}

/// Read a little-endian unsigned integer; the width is the slice length (0..=4).
///
/// Fails with `LengthOutOfRange` for slices wider than a `u32`.
pub fn parse_uint_le(field: &'static str, b: &[u8]) -> Result<u32> {
    if b.len() > 4 {
        return Err(Error::LengthOutOfRange {
            field,
            min: 0,
            max: 4,
            got: b.len(),
        });
    }
    Ok(b.iter()
        .rev()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32))
}

/// Append `src` to `dst` in reverse byte order.
pub fn append_reverse<B: BufMut>(dst: &mut B, src: &[u8]) {
    for &byte in src.iter().rev() {
        dst.put_u8(byte);
    }
}

/// Copy `src` into `dst` in reverse byte order; lengths must match.
pub fn copy_reverse(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter().rev()) {
        *d = *s;
    }
}

/// Bounds-checked cursor over a received frame.
///
/// `bytes::Buf` panics on short reads, so every take is checked first and
/// reported against the field being read.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn uint_le(&mut self, field: &'static str, width: usize) -> Result<u32> {
        self.ensure(field, width)?;
        Ok(self.buf.get_uint_le(width) as u32)
    }

    pub fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8]> {
        self.ensure(field, n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Everything left in the buffer.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    fn ensure(&self, field: &'static str, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::length_mismatch(field, n, self.buf.remaining()));
        }
        Ok(())
    }
}
