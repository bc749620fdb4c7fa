use std::fmt;
use std::ops::{Deref, Range};

use bytes::Bytes;

use crate::error::{Error, Result};

/// Cheaply clonable view into a reference-counted buffer.
///
/// The reassembled stream of an archive is allocated once; every entry, every
/// serialized file and every resource stream cut from it shares that
/// allocation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SharedBytes(Bytes);

impl SharedBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }

    /// Sub-view; `range` is relative to this view.
    pub fn slice(&self, range: Range<usize>) -> Result<SharedBytes> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::OutOfRange {
                pos: range.start,
                len: range.end.saturating_sub(range.start),
                end: self.len(),
            });
        }
        Ok(Self(self.0.slice(range)))
    }
}

impl Deref for SharedBytes {
    type Target = [u8];
    fn deref(&self) -> &[u8] { &self.0 }
}

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] { self }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(data: Vec<u8>) -> Self { Self::new(data) }
}

impl From<Bytes> for SharedBytes {
    fn from(data: Bytes) -> Self { Self(data) }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedBytes({} bytes)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_share_and_nest() {
        let all = SharedBytes::new((0u8..10).collect());
        let mid = all.slice(2..8).unwrap();
        assert_eq!(&*mid, &[2, 3, 4, 5, 6, 7]);
        let inner = mid.slice(1..3).unwrap();
        assert_eq!(&*inner, &[3, 4]);
        assert!(mid.slice(4..7).is_err());
    }
}
