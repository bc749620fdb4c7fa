//! Type-tree schema parsing.
//!
//! Two on-disk encodings exist, selected purely by the serialized file's
//! format version:
//!
//! - **Blob** (format 10, and 12 onwards): a fixed-stride node table followed
//!   by a string table.  Node names are offsets into that table, or, with the
//!   high bit set, into the builtin [`common_strings`](super::common_strings).
//! - **Legacy** (everything else): depth-first records, each followed by its
//!   child count.
//!
//! Both produce the same flat, depth-ordered node list.  Node order is the
//! on-disk field order and is preserved exactly.

use serde::Serialize;

use super::common_strings;
use crate::error::{Error, Result};
use crate::reader::EndianReader;

const STRING_IS_BUILTIN: u32 = 0x8000_0000;

/// Deepest legacy level accepted; levels are stored as `u8`.
const MAX_LEGACY_DEPTH: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTreeNode {
    pub level:     u8,
    pub type_name: String,
    pub name:      String,
    pub byte_size: i32,
    pub is_array:  bool,
    pub version:   i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index:     Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_flag: Option<i32>,
}

pub fn uses_blob_encoding(format_version: u32) -> bool {
    format_version >= 12 || format_version == 10
}

pub fn read(reader: &mut EndianReader<'_>, format_version: u32) -> Result<Vec<TypeTreeNode>> {
    if uses_blob_encoding(format_version) {
        read_blob(reader, format_version)
    } else {
        read_legacy(reader, format_version)
    }
}

// ── Blob ──────────────────────────────────────────────────────────────────────

struct BlobNode {
    version:    u16,
    level:      u8,
    is_array:   bool,
    type_offset: u32,
    name_offset: u32,
    byte_size:  i32,
    index:      i32,
    meta_flag:  i32,
}

fn read_blob(reader: &mut EndianReader<'_>, format_version: u32) -> Result<Vec<TypeTreeNode>> {
    let node_count = reader.read_len()?;
    let string_table_len = reader.read_len()?;
    let raw = reader.read_vec(node_count, |r| {
        let node = BlobNode {
            version:     r.read_u16()?,
            level:       r.read_u8()?,
            is_array:    r.read_bool()?,
            type_offset: r.read_u32()?,
            name_offset: r.read_u32()?,
            byte_size:   r.read_i32()?,
            index:       r.read_i32()?,
            meta_flag:   r.read_i32()?,
        };
        if format_version >= 19 {
            r.read_u64()?; // ref type hash
        }
        Ok(node)
    })?;
    let strings = reader.read_bytes(string_table_len)?;

    raw.into_iter()
        .map(|n| {
            Ok(TypeTreeNode {
                level:     n.level,
                type_name: resolve_string(strings, n.type_offset)?,
                name:      resolve_string(strings, n.name_offset)?,
                byte_size: n.byte_size,
                is_array:  n.is_array,
                version:   n.version as i32,
                index:     Some(n.index),
                meta_flag: Some(n.meta_flag),
            })
        })
        .collect()
}

fn resolve_string(table: &[u8], value: u32) -> Result<String> {
    if value & STRING_IS_BUILTIN != 0 {
        let offset = value & !STRING_IS_BUILTIN;
        return Ok(common_strings::lookup(offset)
            .map(str::to_owned)
            .unwrap_or_else(|| offset.to_string()));
    }
    let start = value as usize;
    let tail = table.get(start..).ok_or_else(|| {
        Error::corrupt(format!("type tree string offset {start} beyond {}-byte table", table.len()))
    })?;
    let len = tail.iter().position(|&b| b == 0)
        .ok_or_else(|| Error::corrupt(format!("unterminated type tree string at {start}")))?;
    Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
}

// ── Legacy ────────────────────────────────────────────────────────────────────

fn read_legacy(reader: &mut EndianReader<'_>, format_version: u32) -> Result<Vec<TypeTreeNode>> {
    let mut nodes = Vec::new();
    // Remaining siblings still to read at each depth.
    let mut pending: Vec<usize> = vec![1];
    while let Some(remaining) = pending.last_mut() {
        if *remaining == 0 {
            pending.pop();
            continue;
        }
        *remaining -= 1;
        let level = u8::try_from(pending.len() - 1)
            .map_err(|_| Error::corrupt(format!("type tree deeper than {MAX_LEGACY_DEPTH} levels")))?;
        nodes.push(read_legacy_node(reader, format_version, level)?);
        pending.push(reader.read_len()?);
    }
    Ok(nodes)
}

fn read_legacy_node(reader: &mut EndianReader<'_>, format_version: u32, level: u8) -> Result<TypeTreeNode> {
    let type_name = reader.read_cstring()?;
    let name = reader.read_cstring()?;
    let byte_size = reader.read_i32()?;
    if format_version == 2 {
        reader.read_i32()?; // variable count
    }
    let index = if format_version != 3 { Some(reader.read_i32()?) } else { None };
    let is_array = reader.read_i32()? != 0;
    let version = reader.read_i32()?;
    let meta_flag = if format_version != 3 { Some(reader.read_i32()?) } else { None };
    Ok(TypeTreeNode { level, type_name, name, byte_size, is_array, version, index, meta_flag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Endian;

    fn legacy_node(out: &mut Vec<u8>, ty: &str, name: &str, children: i32) {
        out.extend_from_slice(ty.as_bytes());
        out.push(0);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(&4i32.to_le_bytes()); // byte size
        out.extend_from_slice(&0i32.to_le_bytes()); // index
        out.extend_from_slice(&0i32.to_le_bytes()); // is array
        out.extend_from_slice(&1i32.to_le_bytes()); // version
        out.extend_from_slice(&0i32.to_le_bytes()); // meta flag
        out.extend_from_slice(&children.to_le_bytes());
    }

    #[test]
    fn legacy_tree_is_depth_first() {
        let mut b = Vec::new();
        legacy_node(&mut b, "Base", "Base", 2);
        legacy_node(&mut b, "string", "m_Name", 1);
        legacy_node(&mut b, "Array", "Array", 0);
        legacy_node(&mut b, "int", "m_Value", 0);
        b.extend_from_slice(&[0xAA]);

        let mut r = EndianReader::new(&b, Endian::Little);
        let nodes = read(&mut r, 9).unwrap();
        let shape: Vec<(u8, &str)> = nodes.iter().map(|n| (n.level, n.name.as_str())).collect();
        assert_eq!(shape, vec![(0, "Base"), (1, "m_Name"), (2, "Array"), (1, "m_Value")]);
        assert_eq!(r.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn legacy_depth_stops_at_u8_range() {
        let chain = |depth: usize| {
            let mut b = Vec::new();
            for i in 0..depth {
                legacy_node(&mut b, "Node", "child", if i + 1 < depth { 1 } else { 0 });
            }
            b
        };

        let deepest = chain(MAX_LEGACY_DEPTH + 1);
        let nodes = read(&mut EndianReader::new(&deepest, Endian::Little), 9).unwrap();
        assert_eq!(nodes.last().map(|n| n.level), Some(u8::MAX));

        let too_deep = chain(MAX_LEGACY_DEPTH + 2);
        let err = read(&mut EndianReader::new(&too_deep, Endian::Little), 9).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));
    }

    #[test]
    fn legacy_version_three_omits_index_and_flags() {
        let mut b = Vec::new();
        b.extend_from_slice(b"int\0x\0");
        b.extend_from_slice(&4i32.to_le_bytes());
        b.extend_from_slice(&1i32.to_le_bytes()); // is array
        b.extend_from_slice(&2i32.to_le_bytes()); // version
        b.extend_from_slice(&0i32.to_le_bytes()); // children
        let mut r = EndianReader::new(&b, Endian::Little);
        let nodes = read(&mut r, 3).unwrap();
        assert_eq!(nodes[0].index, None);
        assert!(nodes[0].is_array);
        assert_eq!(nodes[0].version, 2);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn blob_resolves_local_and_builtin_strings() {
        let strings = b"MyType\0m_Thing\0";
        let mut b = Vec::new();
        b.extend_from_slice(&2i32.to_le_bytes());
        b.extend_from_slice(&(strings.len() as i32).to_le_bytes());
        for (level, ty, name) in [(0u8, 0u32, 7u32), (1, STRING_IS_BUILTIN | 222, STRING_IS_BUILTIN | 427)] {
            b.extend_from_slice(&1u16.to_le_bytes());
            b.push(level);
            b.push(0);
            b.extend_from_slice(&ty.to_le_bytes());
            b.extend_from_slice(&name.to_le_bytes());
            b.extend_from_slice(&4i32.to_le_bytes());
            b.extend_from_slice(&(level as i32).to_le_bytes());
            b.extend_from_slice(&0i32.to_le_bytes());
            b.extend_from_slice(&0u64.to_le_bytes()); // format >= 19
        }
        b.extend_from_slice(strings);

        let mut r = EndianReader::new(&b, Endian::Little);
        let nodes = read(&mut r, 21).unwrap();
        assert_eq!(nodes[0].type_name, "MyType");
        assert_eq!(nodes[0].name, "m_Thing");
        assert_eq!(nodes[1].type_name, "int");
        assert_eq!(nodes[1].name, "m_Name");
        assert_eq!(nodes[1].index, Some(1));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn unknown_builtin_offset_falls_back_to_number() {
        assert_eq!(resolve_string(b"", STRING_IS_BUILTIN | 3).unwrap(), "3");
    }

    #[test]
    fn local_offset_past_table_is_corrupt() {
        assert!(matches!(resolve_string(b"ab\0", 9), Err(Error::CorruptArchive(_))));
    }
}
