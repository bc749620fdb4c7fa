//! Archive decoder: header → directory → block stream → entries.
//!
//! ```no_run
//! use unityfs::bundle::BundleFile;
//!
//! let bundle = BundleFile::open("icons/__data")?;
//! for entry in bundle.entries() {
//!     println!("{} ({} bytes)", entry.name, entry.data.len());
//! }
//! # Ok::<(), unityfs::Error>(())
//! ```
//!
//! Parsing is linear and never backtracks.  The directory is located either
//! right after the header or in the archive's trailing bytes, decompressed,
//! and used to decompress every storage block into one contiguous stream.
//! Entries are views into that stream; nothing is copied out of it.

use std::path::Path;

use tracing::debug;

use crate::block::BlockDirectory;
use crate::codec::{self, CompressionType};
use crate::error::{Error, Result};
use crate::header::ArchiveHeader;
use crate::reader::{Endian, EndianReader};
use crate::shared::SharedBytes;

/// A named entry borrowed from a parsed archive.
#[derive(Debug, Clone, Copy)]
pub struct ExtractedEntry<'a> {
    pub name:  &'a str,
    pub path:  &'a str,
    pub flags: u32,
    pub data:  &'a [u8],
}

#[derive(Debug)]
pub struct BundleFile {
    pub header:    ArchiveHeader,
    pub directory: BlockDirectory,
    stream:        SharedBytes,
}

impl BundleFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = EndianReader::new(data, Endian::Big);
        let header = ArchiveHeader::read(&mut reader)?;
        debug!(
            signature = header.signature.as_str(),
            version = header.version,
            revision = %header.engine_revision,
            flags = header.flags,
            "read archive header"
        );
        let directory = read_directory(&mut reader, &header)?;
        let stream = read_block_stream(&mut reader, &directory)?;
        // Validate every entry up front so entry access cannot fail later.
        for entry in &directory.entries {
            entry.range(stream.len())?;
        }
        Ok(Self { header, directory, stream })
    }

    /// The reassembled, fully decompressed block stream.
    pub fn stream(&self) -> &[u8] { &self.stream }

    pub fn entries(&self) -> impl Iterator<Item = ExtractedEntry<'_>> + '_ {
        self.directory.entries.iter().map(move |e| {
            // Ranges were checked in `parse`.
            let range = e.range(self.stream.len()).unwrap_or(0..0);
            ExtractedEntry { name: e.name(), path: &e.path, flags: e.flags, data: &self.stream[range] }
        })
    }

    /// Owned, shared view of entry `index` for consumers that outlive `self`.
    pub fn entry_bytes(&self, index: usize) -> Result<SharedBytes> {
        let entry = self.directory.entries.get(index).ok_or(Error::OutOfRange {
            pos: index,
            len: 1,
            end: self.directory.entries.len(),
        })?;
        self.stream.slice(entry.range(self.stream.len())?)
    }
}

// ── Directory ─────────────────────────────────────────────────────────────────

fn read_directory(reader: &mut EndianReader<'_>, header: &ArchiveHeader) -> Result<BlockDirectory> {
    if header.version >= 7 {
        reader.align(16)?;
    }
    let compressed_len = header.directory_size.compressed as usize;
    let compressed = if header.directory_at_end() {
        let data = reader.buffer();
        let start = data.len().checked_sub(compressed_len).ok_or_else(|| {
            Error::corrupt(format!("directory of {compressed_len} bytes exceeds archive of {}", data.len()))
        })?;
        &data[start..]
    } else {
        let bytes = reader.read_bytes(compressed_len)
            .map_err(|_| Error::corrupt("archive truncated inside the directory"))?;
        if header.blocks_need_padding() {
            reader.align(16)?;
        }
        bytes
    };

    let kind = CompressionType::from_flags(header.flags)?;
    let directory = codec::decompress(kind, compressed, header.directory_size.uncompressed as usize)?;
    let mut dir_reader = EndianReader::new(&directory, Endian::Big);
    let directory = BlockDirectory::read(&mut dir_reader)?;
    debug!(
        blocks = directory.blocks.len(),
        entries = directory.entries.len(),
        compression = kind.name(),
        "read archive directory"
    );
    Ok(directory)
}

// ── Blocks ────────────────────────────────────────────────────────────────────

fn read_block_stream(reader: &mut EndianReader<'_>, directory: &BlockDirectory) -> Result<SharedBytes> {
    let packed: u64 = directory.blocks.iter().map(|b| b.compressed_size as u64).sum();
    if packed > reader.remaining() as u64 {
        return Err(Error::corrupt(format!(
            "storage blocks declare {packed} bytes but only {} remain",
            reader.remaining()
        )));
    }
    for (i, block) in directory.blocks.iter().enumerate() {
        let kind = block.compression()?;
        let limit = codec::max_output(kind, block.compressed_size as usize);
        if limit.is_some_and(|limit| block.uncompressed_size as usize > limit) {
            return Err(Error::corrupt(format!(
                "storage block {i} cannot expand {} {} bytes to {}",
                block.compressed_size,
                kind.name(),
                block.uncompressed_size
            )));
        }
    }
    let total = usize::try_from(directory.stream_len())
        .map_err(|_| Error::corrupt("block stream does not fit in memory"))?;
    let mut stream = Vec::new();
    codec::reserve(&mut stream, total)?;
    for (i, block) in directory.blocks.iter().enumerate() {
        let compressed = reader.read_bytes(block.compressed_size as usize).map_err(|_| {
            Error::corrupt(format!("archive truncated inside storage block {i}"))
        })?;
        let kind = block.compression()?;
        codec::decompress_exact(kind, compressed, block.uncompressed_size as usize, &mut stream)?;
        debug!(block = i, compression = kind.name(), size = block.uncompressed_size, "decompressed block");
    }
    Ok(SharedBytes::new(stream))
}
