//! Minimal length-prefixed primitive codec shared by the manifest and OSD
//! wire formats.
//!
//! The original protocol's `llio` layer serializes primitives, strings and
//! vectors with explicit length prefixes rather than a general-purpose
//! serialization framework; this module is that same idea in Rust, all
//! multi-byte integers big-endian to match the rest of this workspace's wire
//! formats (see `FrameHeader`).

use bytes::{Buf, BufMut};

use crate::errors::{ProtocolError, Result};

/// Cursor over an immutable byte slice, tracking how many bytes have been
/// consumed so error messages can report a useful "expected N, got M".
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Wrap `buf` for sequential reads from the front.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn require(&self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(ProtocolError::FieldTruncated { expected: n, actual: self.buf.len() });
        }
        Ok(())
    }

    /// Read one byte.
    pub fn u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    /// Read a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.buf.get_u32())
    }

    /// Read a big-endian `u64`.
    pub fn u64(&mut self) -> Result<u64> {
        self.require(8)?;
        Ok(self.buf.get_u64())
    }

    /// Read a big-endian `f64`.
    pub fn f64(&mut self) -> Result<f64> {
        self.require(8)?;
        Ok(self.buf.get_f64())
    }

    /// A `u32`-length-prefixed byte string.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        self.require(len)?;
        let mut out = vec![0u8; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// A `u32`-length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String> {
        let raw = self.bytes()?;
        String::from_utf8(raw)
            .map_err(|e| ProtocolError::FieldTruncated { expected: 0, actual: e.as_bytes().len() })
    }

    /// A `u32` element count followed by `f(self)` applied that many times.
    pub fn vec<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.u32()? as usize;
        let mut out = Vec::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            out.push(f(self)?);
        }
        Ok(out)
    }
}

/// Accumulates a length-prefixed encoding into a growable buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Start an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the writer, returning the accumulated bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Write one byte.
    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Write a big-endian `u32`.
    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    /// Write a big-endian `u64`.
    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    /// Write a big-endian `f64`.
    pub fn f64(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    /// Write a `u32` length prefix followed by `v`.
    pub fn bytes(&mut self, v: &[u8]) {
        self.u32(v.len() as u32);
        self.buf.put_slice(v);
    }

    /// Write a `u32`-length-prefixed UTF-8 string.
    pub fn string(&mut self, v: &str) {
        self.bytes(v.as_bytes());
    }

    pub fn vec<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.u32(items.len() as u32);
        for item in items {
            f(self, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let mut w = Writer::new();
        w.u8(7);
        w.u32(0xDEAD_BEEF);
        w.u64(0x0102_0304_0506_0708);
        w.string("hello");
        w.vec(&[1u32, 2, 3], |w, v| w.u32(*v));

        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.u8().unwrap(), 7);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(r.string().unwrap(), "hello");
        assert_eq!(r.vec(Reader::u32).unwrap(), vec![1, 2, 3]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_field_is_an_error() {
        let mut r = Reader::new(&[0, 0, 0, 5, b'h', b'i']);
        assert!(matches!(r.string(), Err(ProtocolError::FieldTruncated { .. })));
    }
}
