//! Crate-wide error taxonomy.
//!
//! Every decoder in the crate returns [`Error`].  Codec failures start life as
//! a [`CodecError`](crate::codec::CodecError) and are folded into the matching
//! variant here by the `From` impl in `codec`.

use std::io;
use thiserror::Error;

use crate::class_id::ClassId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown archive signature, or a legacy signature with the wrong
    /// container version.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Size mismatches, truncated payloads, undecodable compressed data.
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// Compression code with no codec in this build.
    #[error("Unsupported compression code {code}")]
    UnsupportedCompression { code: u32 },

    /// Object directory entry whose type index or class id is not in the
    /// type table.
    #[error("Unresolved type for object {path_id}: {detail}")]
    UnresolvedType { path_id: i64, detail: String },

    /// PPtr pointing into another serialized file.
    #[error("External reference (file id {file_id}, path id {path_id}) cannot be followed")]
    UnsupportedExternalReference { file_id: i32, path_id: i64 },

    /// Named resource stream that no loaded archive supplied.
    #[error("Resource stream '{0}' was never loaded")]
    MissingResourceStream(String),

    /// Cursor read past the end of its window.
    #[error("Read of {len} bytes at offset {pos} exceeds buffer end {end}")]
    OutOfRange { pos: usize, len: usize, end: usize },

    /// Texture format with no pixel decoder mapping.
    #[error("Unsupported texture format {0}")]
    UnsupportedTextureFormat(i32),

    /// The external pixel codec reported a failure.
    #[error("Pixel decode failed: {0}")]
    PixelDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptArchive(msg.into())
    }
}

/// One object that failed to decode; the rest of its file keeps going.
#[derive(Debug)]
pub struct ObjectError {
    pub file:     String,
    pub path_id:  i64,
    pub class_id: ClassId,
    pub error:    Error,
}

impl std::fmt::Display for ObjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({}): {}", self.file, self.path_id, self.class_id, self.error)
    }
}
