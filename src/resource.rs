//! Resource payloads referenced by objects.
//!
//! Large payloads (texture pixels, audio) live either inline in the
//! serialized file or in a separate resource entry of some archive
//! (`.resS`, `.resource`).  External locations are bound by file basename on
//! first access, so the stream may come from an archive loaded after the
//! object was decoded.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::block::basename;
use crate::error::{Error, Result};
use crate::shared::SharedBytes;

/// Name → bytes table of every resource entry seen during loading.
#[derive(Debug, Default, Clone)]
pub struct ResourceStreams {
    streams: HashMap<String, SharedBytes>,
}

impl ResourceStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `name`; returns the stream it displaced.
    pub fn insert(&mut self, name: impl Into<String>, data: SharedBytes) -> Option<SharedBytes> {
        self.streams.insert(name.into(), data)
    }

    pub fn get(&self, name: &str) -> Option<&SharedBytes> {
        self.streams.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.streams.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceLocation {
    /// Bytes stored in the owning serialized file.
    Inline {
        data:   SharedBytes,
        offset: usize,
        size:   usize,
    },
    /// Bytes stored in a named resource stream.
    External {
        path:   String,
        offset: u64,
        size:   u32,
        bound:  OnceLock<SharedBytes>,
    },
}

impl ResourceLocation {
    pub fn inline(data: SharedBytes, offset: usize, size: usize) -> Self {
        ResourceLocation::Inline { data, offset, size }
    }

    pub fn external(path: impl Into<String>, offset: u64, size: u32) -> Self {
        ResourceLocation::External { path: path.into(), offset, size, bound: OnceLock::new() }
    }

    pub fn size(&self) -> usize {
        match self {
            ResourceLocation::Inline { size, .. }   => *size,
            ResourceLocation::External { size, .. } => *size as usize,
        }
    }

    pub fn is_bound(&self) -> bool {
        match self {
            ResourceLocation::Inline { .. }          => true,
            ResourceLocation::External { bound, .. } => bound.get().is_some(),
        }
    }

    /// The payload bytes.
    ///
    /// External locations look their stream up in `streams` by basename the
    /// first time and keep the binding afterwards.
    pub fn get_bytes(&self, streams: &ResourceStreams) -> Result<&[u8]> {
        match self {
            ResourceLocation::Inline { data, offset, size } => window(data, *offset, *size),
            ResourceLocation::External { path, offset, size, bound } => {
                let stream = match bound.get() {
                    Some(stream) => stream,
                    None => {
                        let name = basename(path);
                        let found = streams.get(name)
                            .ok_or_else(|| Error::MissingResourceStream(name.to_owned()))?;
                        debug!(stream = name, "bound resource stream");
                        bound.get_or_init(|| found.clone())
                    }
                };
                let offset = usize::try_from(*offset).map_err(|_| Error::OutOfRange {
                    pos: usize::MAX,
                    len: *size as usize,
                    end: stream.len(),
                })?;
                window(stream, offset, *size as usize)
            }
        }
    }
}

fn window(data: &[u8], offset: usize, size: usize) -> Result<&[u8]> {
    offset.checked_add(size)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::OutOfRange { pos: offset, len: size, end: data.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_reads_owning_buffer() {
        let data = SharedBytes::new((0u8..16).collect());
        let loc = ResourceLocation::inline(data, 4, 3);
        assert_eq!(loc.get_bytes(&ResourceStreams::new()).unwrap(), &[4, 5, 6]);
    }

    #[test]
    fn external_binds_late_by_basename() {
        let loc = ResourceLocation::external("archive:/CAB-1234/CAB-1234.resS", 2, 2);
        let mut streams = ResourceStreams::new();
        assert!(matches!(
            loc.get_bytes(&streams),
            Err(Error::MissingResourceStream(ref name)) if name == "CAB-1234.resS"
        ));
        assert!(!loc.is_bound());

        streams.insert("CAB-1234.resS", SharedBytes::new(vec![9, 8, 7, 6]));
        assert_eq!(loc.get_bytes(&streams).unwrap(), &[7, 6]);
        assert!(loc.is_bound());
        // Bound for good: later table changes are not observed.
        assert_eq!(loc.get_bytes(&ResourceStreams::new()).unwrap(), &[7, 6]);
    }

    #[test]
    fn range_past_stream_is_out_of_range() {
        let loc = ResourceLocation::inline(SharedBytes::new(vec![0; 4]), 3, 2);
        assert!(matches!(loc.get_bytes(&ResourceStreams::new()), Err(Error::OutOfRange { .. })));
    }
}
