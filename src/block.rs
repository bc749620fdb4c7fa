use serde::Serialize;

use crate::codec::{CodecError, CompressionType};
use crate::error::{Error, Result};
use crate::reader::EndianReader;

/// Bytes of uncompressed-data hash preceding the block list.
pub const DIRECTORY_HASH_SIZE: usize = 16;

/// One independently compressed chunk of the archive payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size:   u32,
    pub flags:             u16,
}

impl StorageBlock {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        Ok(Self {
            uncompressed_size: reader.read_u32()?,
            compressed_size:   reader.read_u32()?,
            flags:             reader.read_u16()?,
        })
    }

    pub fn compression(&self) -> std::result::Result<CompressionType, CodecError> {
        CompressionType::from_flags(self.flags as u32)
    }
}

/// Named byte range of the reassembled stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub offset: i64,
    pub size:   i64,
    pub flags:  u32,
    pub path:   String,
}

impl DirectoryEntry {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        Ok(Self {
            offset: reader.read_i64()?,
            size:   reader.read_i64()?,
            flags:  reader.read_u32()?,
            path:   reader.read_cstring()?,
        })
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        basename(&self.path)
    }

    /// Byte range within a stream of `stream_len` bytes.
    pub fn range(&self, stream_len: usize) -> Result<std::ops::Range<usize>> {
        let start = usize::try_from(self.offset).ok();
        let end = start.zip(usize::try_from(self.size).ok()).and_then(|(s, n)| s.checked_add(n));
        match (start, end) {
            (Some(start), Some(end)) if end <= stream_len => Ok(start..end),
            _ => Err(Error::corrupt(format!(
                "entry '{}' [{}, +{}) lies outside the {stream_len}-byte block stream",
                self.path, self.offset, self.size
            ))),
        }
    }
}

/// Decompressed archive directory: storage blocks, then named entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockDirectory {
    pub blocks:  Vec<StorageBlock>,
    pub entries: Vec<DirectoryEntry>,
}

impl BlockDirectory {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        reader.skip(DIRECTORY_HASH_SIZE)?;
        let blocks = reader.read_array(StorageBlock::read)?;
        let entries = reader.read_array(DirectoryEntry::read)?;
        Ok(Self { blocks, entries })
    }

    /// Sum of every block's uncompressed size.
    pub fn stream_len(&self) -> u64 {
        self.blocks.iter().map(|b| b.uncompressed_size as u64).sum()
    }
}

pub(crate) fn basename(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}
