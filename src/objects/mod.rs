//! Typed objects decoded from a serialized file's object directory.
//!
//! Decoding dispatches on [`ClassId`] through an [`ObjectRegistry`].  Classes
//! with no registered decoder still produce an [`Object::Base`] record so the
//! object table stays complete.
//!
//! Every decoder reads through an [`ObjectReader`] scoped to the object's own
//! byte window; a layout mismatch fails that object with
//! [`Error::OutOfRange`](crate::Error::OutOfRange) instead of bleeding into its
//! neighbours.

pub mod gate;
pub mod math;
pub mod mesh;
pub mod sprite;
pub mod texture;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::class_id::{ClassId, Platform};
use crate::error::{Error, Result};
use crate::reader::EndianReader;
use crate::serialized::{ObjectInfo, SerializedFile};
use crate::shared::SharedBytes;
use crate::version::{BuildType, VersionKey};

pub use sprite::Sprite;
pub use texture::{Texture, Texture2D};

// ── Decode context ────────────────────────────────────────────────────────────

/// Everything a class decoder may branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectContext {
    /// Serialized-file format version.
    pub format:     u32,
    pub version:    VersionKey,
    pub build_type: BuildType,
    pub platform:   Platform,
    pub class_id:   ClassId,
    pub path_id:    i64,
}

/// Cursor over one object's byte window plus its decode context.
pub struct ObjectReader<'a> {
    reader:  EndianReader<'a>,
    data:    &'a SharedBytes,
    pub ctx: ObjectContext,
}

impl<'a> ObjectReader<'a> {
    pub fn new(file: &'a SerializedFile, info: &ObjectInfo) -> Result<Self> {
        let data = file.data();
        let start = usize::try_from(info.byte_start).map_err(|_| Error::OutOfRange {
            pos: usize::MAX,
            len: info.byte_size as usize,
            end: data.len(),
        })?;
        let end = start.checked_add(info.byte_size as usize).ok_or(Error::OutOfRange {
            pos: start,
            len: info.byte_size as usize,
            end: data.len(),
        })?;
        let reader = EndianReader::with_window(data, start, end, file.header.endian)?;
        Ok(Self {
            reader,
            data,
            ctx: ObjectContext {
                format:     file.header.version,
                version:    file.version,
                build_type: file.build_type,
                platform:   file.platform,
                class_id:   info.class_id,
                path_id:    info.path_id,
            },
        })
    }

    /// Rewind to the first byte of the object.
    pub fn reset(&mut self) -> Result<()> {
        let start = self.reader.window_start();
        self.reader.seek(start)
    }

    /// Leading 32-bit count, then that many elements read with `read`, which
    /// keeps access to the decode context.
    pub fn read_object_array<T, F>(&mut self, mut read: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.reader.read_len()?;
        let mut out = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    /// The serialized file's bytes, for resources stored inline.
    pub fn file_data(&self) -> &'a SharedBytes {
        self.data
    }
}

impl<'a> Deref for ObjectReader<'a> {
    type Target = EndianReader<'a>;
    fn deref(&self) -> &EndianReader<'a> { &self.reader }
}

impl<'a> DerefMut for ObjectReader<'a> {
    fn deref_mut(&mut self) -> &mut EndianReader<'a> { &mut self.reader }
}

// ── Base records ──────────────────────────────────────────────────────────────

/// Attributes every object carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectBase {
    pub class_id: ClassId,
    pub path_id:  i64,
}

impl ObjectBase {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        reader.reset()?;
        if reader.ctx.platform == Platform::NO_TARGET {
            reader.read_u32()?; // object hide flags
        }
        Ok(Self { class_id: reader.ctx.class_id, path_id: reader.ctx.path_id })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedObject {
    pub base: ObjectBase,
    pub name: String,
}

impl NamedObject {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let base = ObjectBase::read(reader)?;
        let name = reader.read_aligned_string()?;
        Ok(Self { base, name })
    }

    pub fn decode(reader: &mut ObjectReader<'_>) -> Result<Object> {
        Ok(Object::Named(Self::read(reader)?))
    }
}

// ── References ────────────────────────────────────────────────────────────────

/// Weak pointer to another object, resolved on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PPtr {
    /// 0 = same file; otherwise a 1-based index into the file's externals.
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let file_id = reader.read_i32()?;
        let path_id = if reader.ctx.format < 14 { reader.read_i32()? as i64 } else { reader.read_i64()? };
        Ok(Self { file_id, path_id })
    }

    pub fn is_null(&self) -> bool {
        self.file_id == 0 && self.path_id == 0
    }

    /// Look the target up in `file`, the file that owns this pointer.
    ///
    /// `Ok(None)` when the target was never decoded (or never existed);
    /// pointers into other files are not followed.
    pub fn resolve<'f>(&self, file: &'f SerializedFile) -> Result<Option<&'f Object>> {
        if self.file_id != 0 {
            return Err(Error::UnsupportedExternalReference { file_id: self.file_id, path_id: self.path_id });
        }
        Ok(file.object(self.path_id))
    }
}

// ── Object ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Class without a registered decoder.
    Base(ObjectBase),
    Named(NamedObject),
    Texture(Texture),
    Texture2D(Texture2D),
    Sprite(Sprite),
}

impl Object {
    pub fn base(&self) -> &ObjectBase {
        match self {
            Object::Base(b)      => b,
            Object::Named(n)     => &n.base,
            Object::Texture(t)   => &t.named.base,
            Object::Texture2D(t) => &t.texture.named.base,
            Object::Sprite(s)    => &s.named.base,
        }
    }

    pub fn class_id(&self) -> ClassId { self.base().class_id }

    pub fn path_id(&self) -> i64 { self.base().path_id }

    pub fn name(&self) -> Option<&str> {
        match self {
            Object::Base(_)      => None,
            Object::Named(n)     => Some(&n.name),
            Object::Texture(t)   => Some(&t.named.name),
            Object::Texture2D(t) => Some(&t.texture.named.name),
            Object::Sprite(s)    => Some(&s.named.name),
        }
    }

    pub fn as_texture2d(&self) -> Option<&Texture2D> {
        match self {
            Object::Texture2D(t) => Some(t),
            _                    => None,
        }
    }

    pub fn as_sprite(&self) -> Option<&Sprite> {
        match self {
            Object::Sprite(s) => Some(s),
            _                 => None,
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

pub type DecodeFn = fn(&mut ObjectReader<'_>) -> Result<Object>;

/// Class id → decoder table.
#[derive(Clone)]
pub struct ObjectRegistry {
    decoders: HashMap<ClassId, DecodeFn>,
}

impl ObjectRegistry {
    /// Registry with no decoders: every object decodes to [`Object::Base`].
    pub fn empty() -> Self {
        Self { decoders: HashMap::new() }
    }

    pub fn register(&mut self, class_id: ClassId, decode: DecodeFn) -> Option<DecodeFn> {
        self.decoders.insert(class_id, decode)
    }

    pub fn is_registered(&self, class_id: ClassId) -> bool {
        self.decoders.contains_key(&class_id)
    }

    pub fn decode(&self, reader: &mut ObjectReader<'_>) -> Result<Object> {
        match self.decoders.get(&reader.ctx.class_id) {
            Some(decode) => decode(reader),
            None         => Ok(Object::Base(ObjectBase::read(reader)?)),
        }
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ClassId::NAMED_OBJECT, NamedObject::decode);
        registry.register(ClassId::TEXTURE, Texture::decode);
        registry.register(ClassId::TEXTURE_2D, Texture2D::decode);
        registry.register(ClassId::SPRITE, Sprite::decode);
        registry
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.decoders.keys().collect();
        classes.sort();
        f.debug_struct("ObjectRegistry").field("classes", &classes).finish()
    }
}
