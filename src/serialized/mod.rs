//! Serialized-file decoder: header, metadata, type table, object directory.
//!
//! # Layout
//! The fixed header is big-endian.  It is followed (format ≥ 9) or, for older
//! formats, preceded by the metadata block at `file_size - metadata_size`,
//! whose first byte selects the byte order for everything after it.
//!
//! Nearly every metadata field is present only from some format version on;
//! the thresholds are written out inline next to each read.

pub mod common_strings;
pub mod type_tree;

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::class_id::{ClassId, Platform};
use crate::error::{Error, ObjectError, Result};
use crate::objects::{Object, ObjectReader, ObjectRegistry};
use crate::reader::{Endian, EndianReader};
use crate::shared::SharedBytes;
use crate::version::{BuildType, VersionKey, DEFAULT_ENGINE_VERSION};

pub use type_tree::TypeTreeNode;

/// Smallest buffer that can hold the fixed header.
const MIN_HEADER_SIZE: usize = 20;
/// Smallest file that can hold the widened (format ≥ 22) header.
const MIN_WIDE_HEADER_SIZE: u64 = 48;

// ── Header ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedFileHeader {
    pub metadata_size: u32,
    pub file_size:     u64,
    pub version:       u32,
    pub data_offset:   u64,
    pub endian:        Endian,
}

impl SerializedFileHeader {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        reader.endian = Endian::Big;
        let mut metadata_size = reader.read_u32()?;
        let mut file_size = reader.read_u32()? as u64;
        let version = reader.read_u32()?;
        let mut data_offset = reader.read_u32()? as u64;

        let endian_flag = if version >= 9 {
            let flag = reader.read_u8()?;
            reader.skip(3)?; // reserved
            flag
        } else {
            let at = file_size.checked_sub(metadata_size as u64)
                .and_then(|at| usize::try_from(at).ok())
                .ok_or_else(|| Error::corrupt("metadata size exceeds file size"))?;
            reader.seek(at)?;
            reader.read_u8()?
        };

        if version >= 22 {
            metadata_size = reader.read_u32()?;
            file_size = reader.read_i64()? as u64;
            data_offset = reader.read_i64()? as u64;
            reader.read_i64()?; // unknown
        }

        let endian = Endian::from_flag(endian_flag);
        reader.endian = endian;
        Ok(Self { metadata_size, file_size, version, data_offset, endian })
    }
}

/// Speculatively read a header and check it describes exactly `data`.
///
/// Anything that fails this test is treated as an opaque resource stream.
pub fn is_serialized_file(data: &[u8]) -> bool {
    if data.len() < MIN_HEADER_SIZE {
        return false;
    }
    let mut reader = EndianReader::new(data, Endian::Big);
    let mut sniff = || -> Result<(u64, u64)> {
        reader.read_u32()?; // metadata size
        let mut file_size = reader.read_u32()? as u64;
        let version = reader.read_u32()?;
        let mut data_offset = reader.read_u32()? as u64;
        reader.skip(4)?; // endianness + reserved
        if version >= 22 {
            if file_size < MIN_WIDE_HEADER_SIZE {
                return Err(Error::corrupt("short wide header"));
            }
            reader.read_u32()?;
            file_size = reader.read_i64()? as u64;
            data_offset = reader.read_i64()? as u64;
        }
        Ok((file_size, data_offset))
    };
    match sniff() {
        Ok((file_size, data_offset)) => file_size == data.len() as u64 && data_offset <= file_size,
        Err(_) => false,
    }
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedType {
    pub class_id: ClassId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stripped_type: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_type_index: Option<i16>,
    #[serde(serialize_with = "serialize_hash", skip_serializing_if = "Option::is_none")]
    pub script_id: Option<[u8; 16]>,
    #[serde(serialize_with = "serialize_hash", skip_serializing_if = "Option::is_none")]
    pub old_type_hash: Option<[u8; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<TypeTreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_dependencies: Option<Vec<i32>>,
}

fn serialize_hash<S: Serializer>(hash: &Option<[u8; 16]>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match hash {
        Some(h) => s.serialize_str(&hex::encode(h)),
        None    => s.serialize_none(),
    }
}

/// One row of the object directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub path_id:    i64,
    /// Absolute offset within the serialized file (data offset applied).
    pub byte_start: u64,
    pub byte_size:  u32,
    pub type_id:    i32,
    pub class_id:   ClassId,
    /// Index into [`SerializedFile::types`], when the type was found.
    pub type_index: Option<usize>,
}

/// Script type reference (format ≥ 11).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptType {
    pub file_index: i32,
    pub path_id:    i64,
}

/// Another serialized file this one references by file id (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIdentifier {
    #[serde(serialize_with = "serialize_hash", skip_serializing_if = "Option::is_none")]
    pub guid:      Option<[u8; 16]>,
    pub kind:      i32,
    pub path_name: String,
}

// ── SerializedFile ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SerializedFile {
    pub name:              String,
    /// Prefix of the archive this file was loaded from, if any.
    pub bundle_prefix:     Option<String>,
    pub header:            SerializedFileHeader,
    pub engine_version:    String,
    pub version:           VersionKey,
    pub build_type:        BuildType,
    pub platform:          Platform,
    pub type_tree_enabled: bool,
    pub big_id_enabled:    bool,
    pub types:             Vec<SerializedType>,
    pub object_infos:      Vec<ObjectInfo>,
    pub script_types:      Vec<ScriptType>,
    pub externals:         Vec<FileIdentifier>,
    objects:               HashMap<i64, Object>,
    data:                  SharedBytes,
}

impl SerializedFile {
    pub fn parse(name: impl Into<String>, data: SharedBytes, bundle_prefix: Option<String>) -> Result<Self> {
        let name = name.into();
        let mut reader = EndianReader::new(&data, Endian::Big);
        let header = SerializedFileHeader::read(&mut reader)?;
        let format = header.version;

        // Metadata
        let engine_version = if format >= 7 { reader.read_cstring()? } else { DEFAULT_ENGINE_VERSION.to_owned() };
        let platform = if format >= 8 { Platform(reader.read_i32()?) } else { Platform::default() };
        let type_tree_enabled = if format >= 13 { reader.read_bool()? } else { true };

        let types = reader.read_array(|r| read_serialized_type(r, format, type_tree_enabled))?;
        let big_id_enabled = (7..14).contains(&format) && reader.read_i32()? != 0;

        let mut file = Self {
            name,
            bundle_prefix,
            header,
            engine_version: String::new(),
            version: VersionKey::default(),
            build_type: BuildType::None,
            platform,
            type_tree_enabled,
            big_id_enabled,
            types,
            object_infos: Vec::new(),
            script_types: Vec::new(),
            externals: Vec::new(),
            objects: HashMap::new(),
            data: data.clone(),
        };
        file.set_engine_version(&engine_version);
        file.object_infos = file.read_object_infos(&mut reader)?;
        if format >= 11 {
            file.script_types = reader.read_array(|r| {
                let file_index = r.read_i32()?;
                let path_id = if format < 14 {
                    r.read_i32()? as i64
                } else {
                    r.align(4)?;
                    r.read_i64()?
                };
                Ok(ScriptType { file_index, path_id })
            })?;
        }
        file.externals = reader.read_array(|r| {
            if format >= 6 {
                r.read_cstring()?; // always empty
            }
            let (guid, kind) = if format >= 5 {
                (Some(r.read_hash128()?), r.read_i32()?)
            } else {
                (None, 0)
            };
            Ok(FileIdentifier { guid, kind, path_name: r.read_cstring()? })
        })?;

        debug!(
            file = %file.name,
            format,
            version = %file.engine_version,
            platform = file.platform.name(),
            types = file.types.len(),
            objects = file.object_infos.len(),
            "parsed serialized file"
        );
        Ok(file)
    }

    /// Re-derive [`VersionKey`] and [`BuildType`] from an engine version
    /// string.
    pub fn set_engine_version(&mut self, version: &str) {
        let (key, build_type) = VersionKey::parse(version);
        self.engine_version = version.to_owned();
        self.version = key;
        self.build_type = build_type;
    }

    fn read_object_infos(&mut self, reader: &mut EndianReader<'_>) -> Result<Vec<ObjectInfo>> {
        let format = self.header.version;
        let count = reader.read_len()?;
        let mut infos = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let path_id = if self.big_id_enabled {
                reader.read_i64()?
            } else if format < 14 {
                reader.read_i32()? as i64
            } else {
                reader.align(4)?;
                reader.read_i64()?
            };
            let relative_start = if format >= 22 { reader.read_i64()? as u64 } else { reader.read_u32()? as u64 };
            let byte_start = relative_start.checked_add(self.header.data_offset)
                .ok_or_else(|| Error::corrupt(format!("object {path_id} start overflows")))?;
            let byte_size = reader.read_u32()?;
            let type_id = reader.read_i32()?;

            let (class_id, type_index) = if format < 16 {
                let class_id = ClassId(reader.read_u16()? as i32);
                (class_id, self.types.iter().position(|t| t.class_id == class_id))
            } else {
                let index = usize::try_from(type_id).ok().filter(|&i| i < self.types.len());
                match index {
                    Some(i) => (self.types[i].class_id, Some(i)),
                    None    => (ClassId::UNKNOWN, None),
                }
            };

            if format < 11 {
                reader.read_u16()?; // is destroyed
            }
            if (11..17).contains(&format) {
                let script_type_index = reader.read_i16()?;
                if let Some(i) = type_index {
                    self.types[i].script_type_index = Some(script_type_index);
                }
            }
            if format == 15 || format == 16 {
                reader.read_u8()?; // stripped
            }

            infos.push(ObjectInfo { path_id, byte_start, byte_size, type_id, class_id, type_index });
        }
        Ok(infos)
    }

    // ── Object graph ──────────────────────────────────────────────────────────

    /// Decode every object in the directory.
    ///
    /// A failing object is reported and skipped; with `stop_on_error` the
    /// rest of the file is abandoned after the first failure.  Objects
    /// decoded by a previous call are replaced.
    pub fn decode_objects(&mut self, registry: &ObjectRegistry, stop_on_error: bool) -> Vec<ObjectError> {
        let mut errors = Vec::new();
        let mut objects = HashMap::with_capacity(self.object_infos.len());
        for info in &self.object_infos {
            match self.decode_object(info, registry) {
                Ok(object) => {
                    objects.insert(info.path_id, object);
                }
                Err(error) => {
                    warn!(file = %self.name, path_id = info.path_id, class = %info.class_id, %error, "object decode failed");
                    errors.push(ObjectError {
                        file:     self.name.clone(),
                        path_id:  info.path_id,
                        class_id: info.class_id,
                        error,
                    });
                    if stop_on_error {
                        break;
                    }
                }
            }
        }
        self.objects = objects;
        errors
    }

    /// Decode a single directory entry without storing it.
    pub fn decode_object(&self, info: &ObjectInfo, registry: &ObjectRegistry) -> Result<Object> {
        if self.header.version >= 16 && info.type_index.is_none() {
            return Err(Error::UnresolvedType {
                path_id: info.path_id,
                detail:  format!("type index {} not in a table of {}", info.type_id, self.types.len()),
            });
        }
        let mut reader = ObjectReader::new(self, info)?;
        registry.decode(&mut reader)
    }

    pub fn object(&self, path_id: i64) -> Option<&Object> {
        self.objects.get(&path_id)
    }

    /// Decoded objects in directory order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> + '_ {
        self.object_infos.iter().filter_map(move |info| self.objects.get(&info.path_id))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn data(&self) -> &SharedBytes {
        &self.data
    }
}

fn read_serialized_type(reader: &mut EndianReader<'_>, format: u32, type_tree_enabled: bool) -> Result<SerializedType> {
    let class_id = ClassId(reader.read_i32()?);
    let is_stripped_type = if format >= 16 { Some(reader.read_bool()?) } else { None };
    let script_type_index = if format >= 17 { Some(reader.read_i16()?) } else { None };
    let mut script_id = None;
    let mut old_type_hash = None;
    if format >= 13 {
        if (format > 16 && class_id.0 < 0) || (format >= 16 && class_id == ClassId::MONO_BEHAVIOUR) {
            script_id = Some(reader.read_hash128()?);
        }
        old_type_hash = Some(reader.read_hash128()?);
    }

    let mut nodes = None;
    let mut type_dependencies = None;
    if type_tree_enabled {
        nodes = Some(type_tree::read(reader, format)?);
        if format >= 21 {
            type_dependencies = Some(reader.read_array(|r| r.read_i32())?);
        }
    }

    Ok(SerializedType {
        class_id,
        is_stripped_type,
        script_type_index,
        script_id,
        old_type_hash,
        nodes,
        type_dependencies,
    })
}
