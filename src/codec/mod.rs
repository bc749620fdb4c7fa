//! Block decompression for archive directories and storage blocks.
//!
//! # Compression codes
//! The low six bits of a flags word select the codec:
//!
//! | Code | Codec  |
//! |------|--------|
//! | 0    | none   |
//! | 1    | LZMA   |
//! | 2    | LZ4    |
//! | 3    | LZ4HC  |
//! | 4    | LZHAM  |
//!
//! LZ4HC is only an encoder setting; both LZ4 codes decode as plain LZ4
//! blocks.  LZHAM and any unassigned code fail with
//! [`CodecError::UnsupportedCompression`].
//!
//! # Size contract
//! Every call carries the uncompressed size declared by the archive.  A codec
//! that produces a different number of bytes is an error; nothing is ever
//! truncated or padded to fit.

use std::io;
use thiserror::Error;

use crate::error::Error;

/// Mask over a flags word selecting the compression code.
pub const COMPRESSION_MASK: u32 = 0x3f;

// ── CompressionType ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Lzma,
    Lz4,
    Lz4Hc,
    Lzham,
}

impl CompressionType {
    pub fn from_code(code: u32) -> Result<Self, CodecError> {
        match code {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lzma),
            2 => Ok(CompressionType::Lz4),
            3 => Ok(CompressionType::Lz4Hc),
            4 => Ok(CompressionType::Lzham),
            _ => Err(CodecError::UnsupportedCompression { code }),
        }
    }

    /// Extract the compression code from a header or block flags word.
    pub fn from_flags(flags: u32) -> Result<Self, CodecError> {
        Self::from_code(flags & COMPRESSION_MASK)
    }

    pub fn code(self) -> u32 {
        match self {
            CompressionType::None  => 0,
            CompressionType::Lzma  => 1,
            CompressionType::Lz4   => 2,
            CompressionType::Lz4Hc => 3,
            CompressionType::Lzham => 4,
        }
    }

    /// Human-readable name (diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None  => "none",
            CompressionType::Lzma  => "lzma",
            CompressionType::Lz4   => "lz4",
            CompressionType::Lz4Hc => "lz4hc",
            CompressionType::Lzham => "lzham",
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("No codec for compression code {code}")]
    UnsupportedCompression { code: u32 },
    #[error("Decompressed {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Cannot allocate {size} bytes for decompressed data")]
    Allocation { size: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnsupportedCompression { code } => Error::UnsupportedCompression { code },
            other => Error::CorruptArchive(other.to_string()),
        }
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn compression(&self) -> CompressionType;
    /// Decode `input`, appending at most `expected` bytes to `output`.
    /// Returns the number of bytes appended.
    fn decompress_into(&self, input: &[u8], expected: usize, output: &mut Vec<u8>) -> Result<usize, CodecError>;
}

/// Upper bound on LZ4 block expansion: one extension byte adds at most 255
/// bytes of match length.
pub const LZ4_MAX_RATIO: usize = 255;

/// Largest output `kind` can produce from `compressed` input bytes, when the
/// codec bounds it.
pub fn max_output(kind: CompressionType, compressed: usize) -> Option<usize> {
    match kind {
        CompressionType::None => Some(compressed),
        CompressionType::Lz4 | CompressionType::Lz4Hc => {
            Some(compressed.saturating_mul(LZ4_MAX_RATIO).saturating_add(16))
        }
        CompressionType::Lzma | CompressionType::Lzham => None,
    }
}

/// Grow `output` by `additional` bytes without aborting on allocation failure.
pub fn reserve(output: &mut Vec<u8>, additional: usize) -> Result<(), CodecError> {
    output.try_reserve_exact(additional)
        .map_err(|_| CodecError::Allocation { size: additional })
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn compression(&self) -> CompressionType { CompressionType::None }
    fn decompress_into(&self, input: &[u8], expected: usize, output: &mut Vec<u8>) -> Result<usize, CodecError> {
        if input.len() != expected {
            return Err(CodecError::SizeMismatch { expected, actual: input.len() });
        }
        reserve(output, input.len())?;
        output.extend_from_slice(input);
        Ok(input.len())
    }
}

/// LZ4 block format without a size prefix; also decodes LZ4HC output.
pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn compression(&self) -> CompressionType { CompressionType::Lz4 }
    fn decompress_into(&self, input: &[u8], expected: usize, output: &mut Vec<u8>) -> Result<usize, CodecError> {
        if max_output(CompressionType::Lz4, input.len()).is_some_and(|bound| expected > bound) {
            return Err(CodecError::Decompression(format!(
                "{} LZ4 bytes cannot expand to {expected}", input.len()
            )));
        }
        reserve(output, expected)?;
        let start = output.len();
        output.resize(start + expected, 0);
        let result = lz4_flex::block::decompress_into(input, &mut output[start..]);
        let produced = match result {
            Ok(n) => n,
            Err(e) => {
                output.truncate(start);
                return Err(CodecError::Decompression(e.to_string()));
            }
        };
        output.truncate(start + produced);
        Ok(produced)
    }
}

/// Raw LZMA: five property bytes followed by the range-coded stream, with no
/// stored size.  The expected size is supplied from the archive directory.
/// Output grows only as the decoder produces it.
pub struct LzmaCodec;
impl Codec for LzmaCodec {
    fn compression(&self) -> CompressionType { CompressionType::Lzma }
    fn decompress_into(&self, input: &[u8], expected: usize, output: &mut Vec<u8>) -> Result<usize, CodecError> {
        use lzma_rs::decompress::{Options, UnpackedSize};

        let options = Options {
            unpacked_size: UnpackedSize::UseProvided(Some(expected as u64)),
            ..Default::default()
        };
        let start = output.len();
        lzma_rs::lzma_decompress_with_options(&mut io::Cursor::new(input), output, &options)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(output.len() - start)
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a compression type to a built-in codec.
pub fn get_codec(kind: CompressionType) -> Result<Box<dyn Codec>, CodecError> {
    match kind {
        CompressionType::None  => Ok(Box::new(NoneCodec)),
        CompressionType::Lzma  => Ok(Box::new(LzmaCodec)),
        CompressionType::Lz4   => Ok(Box::new(Lz4Codec)),
        CompressionType::Lz4Hc => Ok(Box::new(Lz4Codec)),
        CompressionType::Lzham => Err(CodecError::UnsupportedCompression { code: kind.code() }),
    }
}

/// Decode `input` and append exactly `expected` bytes to `output`.
pub fn decompress_exact(
    kind: CompressionType,
    input: &[u8],
    expected: usize,
    output: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let codec = get_codec(kind)?;
    let produced = codec.decompress_into(input, expected, output)?;
    if produced != expected {
        return Err(CodecError::SizeMismatch { expected, actual: produced });
    }
    Ok(())
}

/// Decode `input` into a fresh buffer of `expected_size` bytes.
pub fn decompress(kind: CompressionType, input: &[u8], expected_size: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    decompress_exact(kind, input, expected_size, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_from_low_bits() {
        assert_eq!(CompressionType::from_flags(0x42).unwrap(), CompressionType::Lz4);
        assert_eq!(CompressionType::from_flags(0x43).unwrap(), CompressionType::Lz4Hc);
        assert_eq!(CompressionType::from_flags(0x80).unwrap(), CompressionType::None);
        assert!(matches!(
            CompressionType::from_flags(0x3f),
            Err(CodecError::UnsupportedCompression { code: 0x3f })
        ));
    }

    #[test]
    fn lz4_exact_size() {
        let data: Vec<u8> = b"unity ".iter().cycle().take(600).copied().collect();
        let packed = lz4_flex::block::compress(&data);
        assert_eq!(decompress(CompressionType::Lz4Hc, &packed, data.len()).unwrap(), data);
    }

    #[test]
    fn lz4_short_output_is_size_mismatch() {
        let data = vec![7u8; 100];
        let packed = lz4_flex::block::compress(&data);
        let err = decompress(CompressionType::Lz4, &packed, 101).unwrap_err();
        assert!(matches!(err, CodecError::SizeMismatch { expected: 101, actual: 100 }));
        assert!(matches!(Error::from(err), Error::CorruptArchive(_)));
    }

    #[test]
    fn lz4_long_output_fails() {
        let data = vec![7u8; 100];
        let packed = lz4_flex::block::compress(&data);
        assert!(decompress(CompressionType::Lz4, &packed, 50).is_err());
    }

    #[test]
    fn none_requires_matching_length() {
        assert_eq!(decompress(CompressionType::None, b"abc", 3).unwrap(), b"abc");
        assert!(decompress(CompressionType::None, b"abc", 4).is_err());
    }

    #[test]
    fn lzma_garbage_is_corrupt() {
        let err = decompress(CompressionType::Lzma, &[0xff, 0xff], 16).unwrap_err();
        assert!(matches!(Error::from(err), Error::CorruptArchive(_)));
    }

    #[test]
    fn lz4_declared_size_beyond_ratio_fails_before_allocating() {
        let err = decompress(CompressionType::Lz4, &[0u8; 4], u32::MAX as usize).unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
    }

    #[test]
    fn lzma_exact_size() {
        let data: Vec<u8> = b"serialized ".iter().cycle().take(900).copied().collect();
        let mut packed = Vec::new();
        lzma_rs::lzma_compress(&mut io::Cursor::new(&data), &mut packed).unwrap();
        let raw = lzma_raw(&packed);
        assert_eq!(decompress(CompressionType::Lzma, &raw, data.len()).unwrap(), data);
    }

    #[test]
    fn lzma_overlong_declaration_is_size_mismatch() {
        let data = vec![1u8; 64];
        let mut packed = Vec::new();
        lzma_rs::lzma_compress(&mut io::Cursor::new(&data), &mut packed).unwrap();
        let err = decompress(CompressionType::Lzma, &lzma_raw(&packed), u32::MAX as usize).unwrap_err();
        assert!(matches!(Error::from(err), Error::CorruptArchive(_)));
    }

    /// `lzma_compress` writes the `.lzma` layout: properties, an 8-byte
    /// size, then the stream.  Archives omit the size.
    fn lzma_raw(packed: &[u8]) -> Vec<u8> {
        let mut raw = packed[..5].to_vec();
        raw.extend_from_slice(&packed[13..]);
        raw
    }

    #[test]
    fn lzham_is_unsupported() {
        let err = decompress(CompressionType::Lzham, &[], 0).unwrap_err();
        assert!(matches!(Error::from(err), Error::UnsupportedCompression { code: 4 }));
    }
}
