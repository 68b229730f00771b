//! Bounds-checked little-endian reader over a byte slice.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::AseError;

/// Reads primitive values from a slice, tracking absolute file offsets so
/// errors point at the right byte.
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte.
    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], AseError> {
        if len > self.remaining() {
            return Err(AseError::decode(
                self.offset(),
                format!(
                    "unexpected end of data reading {what} ({len} byte(s) needed, {} left)",
                    self.remaining()
                ),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Everything left, consuming it.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }

    pub(crate) fn skip(&mut self, len: usize, what: &str) -> Result<(), AseError> {
        self.take(len, what).map(|_| ())
    }

    /// Splits off the next `len` bytes as an independent cursor.
    pub(crate) fn sub(&mut self, len: usize, what: &str) -> Result<Cursor<'a>, AseError> {
        let base = self.offset();
        let bytes = self.take(len, what)?;
        Ok(Cursor {
            bytes,
            pos: 0,
            base,
        })
    }

    /// Runs a `byteorder` read over the unread bytes and advances past what
    /// it consumed. Nothing is consumed on failure.
    fn read_with<T>(
        &mut self,
        what: &str,
        read: impl FnOnce(&mut &'a [u8]) -> io::Result<T>,
    ) -> Result<T, AseError> {
        let bytes: &'a [u8] = self.bytes;
        let mut unread = &bytes[self.pos..];
        let left = unread.len();
        let value = read(&mut unread).map_err(|err| {
            AseError::decode(
                self.offset(),
                format!("unexpected end of data reading {what} ({err}, {left} byte(s) left)"),
            )
        })?;
        self.pos += left - unread.len();
        Ok(value)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8, AseError> {
        self.read_with(what, |r| r.read_u8())
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16, AseError> {
        self.read_with(what, |r| r.read_u16::<LittleEndian>())
    }

    pub(crate) fn i16(&mut self, what: &str) -> Result<i16, AseError> {
        self.read_with(what, |r| r.read_i16::<LittleEndian>())
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32, AseError> {
        self.read_with(what, |r| r.read_u32::<LittleEndian>())
    }

    pub(crate) fn i32(&mut self, what: &str) -> Result<i32, AseError> {
        self.read_with(what, |r| r.read_i32::<LittleEndian>())
    }

    /// 16.16 signed fixed point.
    pub(crate) fn fixed(&mut self, what: &str) -> Result<f64, AseError> {
        Ok(f64::from(self.i32(what)?) / 65536.0)
    }

    pub(crate) fn bytes16(&mut self, what: &str) -> Result<[u8; 16], AseError> {
        self.read_with(what, |r| {
            let mut out = [0u8; 16];
            r.read_exact(&mut out)?;
            Ok(out)
        })
    }

    /// WORD length followed by UTF-8 bytes. Invalid UTF-8 is replaced.
    pub(crate) fn string(&mut self, what: &str) -> Result<String, AseError> {
        let len = self.u16(what)? as usize;
        let bytes = self.take(len, what)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
