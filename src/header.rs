//! Archive header: signature, container version, engine version strings,
//! directory sizes and flags.
//!
//! All header fields are big-endian.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::reader::{Endian, EndianReader};

pub const SIGNATURE_FS:  &str = "UnityFS";
pub const SIGNATURE_WEB: &str = "UnityWeb";
pub const SIGNATURE_RAW: &str = "UnityRaw";

/// Only container version accepted with a legacy signature.
pub const LEGACY_VERSION: u32 = 6;

// ── Flags ─────────────────────────────────────────────────────────────────────

/// Directory and blocks are stored back to back (informational).
pub const FLAG_BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;
/// Directory lives in the last `compressed` bytes of the archive.
pub const FLAG_DIRECTORY_AT_END:              u32 = 0x80;
/// Block data starts on a 16-byte boundary after an inline directory.
pub const FLAG_BLOCKS_NEED_PADDING:           u32 = 0x200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signature {
    UnityFs,
    UnityWeb,
    UnityRaw,
}

impl Signature {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            SIGNATURE_FS  => Some(Signature::UnityFs),
            SIGNATURE_WEB => Some(Signature::UnityWeb),
            SIGNATURE_RAW => Some(Signature::UnityRaw),
            _             => None,
        }
    }

    pub fn is_legacy(self) -> bool {
        !matches!(self, Signature::UnityFs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signature::UnityFs  => SIGNATURE_FS,
            Signature::UnityWeb => SIGNATURE_WEB,
            Signature::UnityRaw => SIGNATURE_RAW,
        }
    }
}

/// Compressed / uncompressed byte counts of the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizePair {
    pub compressed:   u32,
    pub uncompressed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveHeader {
    pub signature:      Signature,
    pub version:        u32,
    /// Player version string, e.g. `5.x.x`.
    pub engine_version: String,
    /// Full engine revision, e.g. `2019.4.3f1`.
    pub engine_revision: String,
    pub total_size:     i64,
    pub directory_size: SizePair,
    pub flags:          u32,
}

impl ArchiveHeader {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        reader.endian = Endian::Big;
        let raw_signature = reader.read_cstring()
            .map_err(|_| Error::UnsupportedFormat("missing archive signature".into()))?;
        let signature = Signature::parse(&raw_signature)
            .ok_or_else(|| Error::UnsupportedFormat(format!("unknown signature '{raw_signature}'")))?;
        let version = reader.read_u32()?;
        if signature.is_legacy() && version != LEGACY_VERSION {
            return Err(Error::UnsupportedFormat(format!(
                "'{}' archives are only supported at version {LEGACY_VERSION}, found {version}",
                signature.as_str()
            )));
        }
        let engine_version = reader.read_cstring()?;
        let engine_revision = reader.read_cstring()?;
        let total_size = reader.read_i64()?;
        let directory_size = SizePair {
            compressed:   reader.read_u32()?,
            uncompressed: reader.read_u32()?,
        };
        let flags = reader.read_u32()?;
        if signature.is_legacy() {
            reader.read_u8()?;
        }
        Ok(Self { signature, version, engine_version, engine_revision, total_size, directory_size, flags })
    }

    #[inline]
    pub fn directory_at_end(&self) -> bool { self.flags & FLAG_DIRECTORY_AT_END != 0 }

    #[inline]
    pub fn blocks_need_padding(&self) -> bool { self.flags & FLAG_BLOCKS_NEED_PADDING != 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(signature: &str, version: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(signature.as_bytes());
        b.push(0);
        b.extend_from_slice(&version.to_be_bytes());
        b.extend_from_slice(b"5.x.x\0");
        b.extend_from_slice(b"2019.4.3f1\0");
        b.extend_from_slice(&1234i64.to_be_bytes());
        b.extend_from_slice(&60u32.to_be_bytes());
        b.extend_from_slice(&90u32.to_be_bytes());
        b.extend_from_slice(&0x43u32.to_be_bytes());
        b
    }

    #[test]
    fn reads_unityfs_header() {
        let bytes = header_bytes("UnityFS", 7);
        let mut r = EndianReader::new(&bytes, Endian::Little);
        let h = ArchiveHeader::read(&mut r).unwrap();
        assert_eq!(h.signature, Signature::UnityFs);
        assert_eq!(h.version, 7);
        assert_eq!(h.engine_revision, "2019.4.3f1");
        assert_eq!(h.total_size, 1234);
        assert_eq!(h.directory_size, SizePair { compressed: 60, uncompressed: 90 });
        assert_eq!(h.flags, 0x43);
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn legacy_header_consumes_trailing_byte() {
        let mut bytes = header_bytes("UnityRaw", 6);
        bytes.push(0);
        let mut r = EndianReader::new(&bytes, Endian::Big);
        let h = ArchiveHeader::read(&mut r).unwrap();
        assert!(h.signature.is_legacy());
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn legacy_header_requires_version_six() {
        let bytes = header_bytes("UnityWeb", 3);
        let mut r = EndianReader::new(&bytes, Endian::Big);
        assert!(matches!(ArchiveHeader::read(&mut r), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn unknown_signature_is_unsupported() {
        let bytes = header_bytes("UnityArchive", 6);
        let mut r = EndianReader::new(&bytes, Endian::Big);
        assert!(matches!(ArchiveHeader::read(&mut r), Err(Error::UnsupportedFormat(_))));
    }
}
