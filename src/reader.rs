//! Positioned byte-buffer reader with a runtime byte order.
//!
//! [`EndianReader`] borrows its buffer and never grows it.  A reader may be
//! restricted to a window `[start, end)` of the buffer; positions stay
//! absolute (relative to the start of the buffer) so offsets recorded while
//! decoding can be used against the same buffer later.  Any read that would
//! cross `end` fails with [`Error::OutOfRange`] and leaves the cursor where it
//! was.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Serialized files store the flag as one byte: 0 = little, anything
    /// else = big.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 0 { Endian::Little } else { Endian::Big }
    }
}

macro_rules! read_primitive {
    ($name:ident, $ty:ty, $size:expr, $read:ident) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take($size)?;
            Ok(match self.endian {
                Endian::Little => LittleEndian::$read(bytes),
                Endian::Big    => BigEndian::$read(bytes),
            })
        }
    };
}

#[derive(Debug, Clone)]
pub struct EndianReader<'a> {
    data:       &'a [u8],
    pos:        usize,
    start:      usize,
    end:        usize,
    pub endian: Endian,
}

impl<'a> EndianReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, pos: 0, start: 0, end: data.len(), endian }
    }

    /// Reader restricted to `data[start..end]`, positioned at `start`.
    pub fn with_window(data: &'a [u8], start: usize, end: usize, endian: Endian) -> Result<Self> {
        if start > end || end > data.len() {
            return Err(Error::OutOfRange { pos: start, len: end.saturating_sub(start), end: data.len() });
        }
        Ok(Self { data, pos: start, start, end, endian })
    }

    // ── Position ──────────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> usize { self.pos }

    #[inline]
    pub fn window_start(&self) -> usize { self.start }

    #[inline]
    pub fn window_end(&self) -> usize { self.end }

    #[inline]
    pub fn remaining(&self) -> usize { self.end - self.pos }

    /// The whole underlying buffer, ignoring the window.
    #[inline]
    pub fn buffer(&self) -> &'a [u8] { self.data }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos < self.start || pos > self.end {
            return Err(Error::OutOfRange { pos, len: 0, end: self.end });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Advance to the next multiple of `alignment` (a power of two).
    /// Alignment is computed on the absolute position.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        debug_assert!(alignment.is_power_of_two());
        let rem = self.pos & (alignment - 1);
        if rem != 0 {
            self.skip(alignment - rem)?;
        }
        Ok(())
    }

    // ── Raw bytes ─────────────────────────────────────────────────────────────

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let stop = self.pos.checked_add(len).filter(|&stop| stop <= self.end)
            .ok_or(Error::OutOfRange { pos: self.pos, len, end: self.end })?;
        let bytes = &self.data[self.pos..stop];
        self.pos = stop;
        Ok(bytes)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn read_hash128(&mut self) -> Result<[u8; 16]> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.take(16)?);
        Ok(out)
    }

    // ── Primitives ────────────────────────────────────────────────────────────

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// One byte, low bit significant.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? & 1 != 0)
    }

    read_primitive!(read_u16, u16, 2, read_u16);
    read_primitive!(read_i16, i16, 2, read_i16);
    read_primitive!(read_u32, u32, 4, read_u32);
    read_primitive!(read_i32, i32, 4, read_i32);
    read_primitive!(read_u64, u64, 8, read_u64);
    read_primitive!(read_i64, i64, 8, read_i64);
    read_primitive!(read_f32, f32, 4, read_f32);
    read_primitive!(read_f64, f64, 8, read_f64);

    // ── Strings ───────────────────────────────────────────────────────────────

    /// NUL-terminated string.  The terminator is consumed.
    pub fn read_cstring(&mut self) -> Result<String> {
        let window = &self.data[self.pos..self.end];
        let len = window.iter().position(|&b| b == 0)
            .ok_or(Error::OutOfRange { pos: self.pos, len: window.len() + 1, end: self.end })?;
        let s = String::from_utf8_lossy(&window[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// String of exactly `len` bytes.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// 32-bit length prefix, then the bytes.
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        self.read_string(len)
    }

    /// 32-bit length prefix, the bytes, then padding to a 4-byte boundary.
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        if len == 0 {
            return Ok(String::new());
        }
        let s = self.read_string(len)?;
        self.align(4)?;
        Ok(s)
    }

    // ── Arrays ────────────────────────────────────────────────────────────────

    /// Leading 32-bit element count.  Negative counts are corrupt.
    pub fn read_len(&mut self) -> Result<usize> {
        let pos = self.pos;
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| Error::corrupt(format!("negative length {len} at offset {pos}")))
    }

    /// Read `count` elements with `read`.
    pub fn read_vec<T, F>(&mut self, count: usize, mut read: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        // A corrupt count must not turn into a huge allocation.
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    /// Read a leading 32-bit count, then that many elements with `read`.
    pub fn read_array<T, F>(&mut self, read: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_len()?;
        self.read_vec(count, read)
    }

    /// Length-prefixed byte array, borrowed.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }
}
