//! Sprite and its render data.

use super::gate::Present;
use super::math::{read_matrix4x4, read_vector2, read_vector3, read_vector4, Matrix4x4, Rectf, Vector2, Vector3, Vector4};
use super::mesh::{BoneWeights4, SubMesh, VertexData};
use super::texture::Texture2D;
use super::{NamedObject, Object, ObjectReader, PPtr};
use crate::error::Result;
use crate::serialized::SerializedFile;
use crate::version::VersionKey;

// Field presence.
const BORDER:               Present = Present::since(4, 5);
const PIVOT:                Present = Present::SinceOrPatch {
    release: VersionKey::pack(5, 4, 2, 0),
    patch:   VersionKey::pack(5, 4, 1, 3),
};
const IS_POLYGON:           Present = Present::since(5, 3);
const ATLAS_DATA:           Present = Present::since(2017, 0);
const ALPHA_TEXTURE:        Present = Present::since(5, 2);
const SECONDARY_TEXTURES:   Present = Present::since(2019, 0);
const MESH_VERTEX_DATA:     Present = Present::since(5, 6);
const BIND_POSE:            Present = Present::after(2018, 0);
const SOURCE_SKIN:          Present = Present::up_to(2018, 2);
const ATLAS_RECT_OFFSET:    Present = Present::since(5, 6);
const UV_TRANSFORM:         Present = Present::since(4, 5);
const DOWNSCALE_MULTIPLIER: Present = Present::since(2017, 0);
const VERTEX_UV:            Present = Present::up_to(4, 3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpritePackingRotation {
    None,
    FlipHorizontal,
    FlipVertical,
    Rotate180,
    Rotate90,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpritePackingMode {
    Tight,
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteMeshType {
    FullRect,
    Tight,
}

/// Packed sprite settings bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSettings {
    pub raw: u32,
}

impl SpriteSettings {
    pub fn packed(self) -> bool { self.raw & 1 != 0 }

    pub fn packing_mode(self) -> SpritePackingMode {
        if (self.raw >> 1) & 1 == 0 { SpritePackingMode::Tight } else { SpritePackingMode::Rectangle }
    }

    /// `None` for rotation codes the engine does not define.
    pub fn packing_rotation(self) -> Option<SpritePackingRotation> {
        Some(match (self.raw >> 2) & 0xf {
            0 => SpritePackingRotation::None,
            1 => SpritePackingRotation::FlipHorizontal,
            2 => SpritePackingRotation::FlipVertical,
            3 => SpritePackingRotation::Rotate180,
            4 => SpritePackingRotation::Rotate90,
            _ => return None,
        })
    }

    pub fn mesh_type(self) -> SpriteMeshType {
        if (self.raw >> 6) & 1 == 0 { SpriteMeshType::FullRect } else { SpriteMeshType::Tight }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecondarySpriteTexture {
    pub texture: PPtr,
    pub name:    String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteVertex {
    pub pos: Vector3,
    pub uv:  Option<Vector2>,
}

impl SpriteVertex {
    fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let pos = read_vector3(reader)?;
        let uv = if VERTEX_UV.applies(&reader.ctx) { Some(read_vector2(reader)?) } else { None };
        Ok(Self { pos, uv })
    }
}

/// Geometry layout: sub-meshes plus vertex data from 5.6, flat vertices and
/// 16-bit indices before.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteGeometry {
    Mesh {
        sub_meshes:   Vec<SubMesh>,
        index_buffer: Vec<u8>,
        vertex_data:  VertexData,
    },
    Vertices {
        vertices: Vec<SpriteVertex>,
        indices:  Vec<u16>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRenderData {
    pub texture:              PPtr,
    pub alpha_texture:        Option<PPtr>,
    pub secondary_textures:   Vec<SecondarySpriteTexture>,
    pub geometry:             SpriteGeometry,
    pub bind_pose:            Vec<Matrix4x4>,
    pub source_skin:          Vec<BoneWeights4>,
    pub texture_rect:         Rectf,
    pub texture_rect_offset:  Vector2,
    pub atlas_rect_offset:    Option<Vector2>,
    pub settings:             SpriteSettings,
    pub uv_transform:         Option<Vector4>,
    pub downscale_multiplier: Option<f32>,
}

impl SpriteRenderData {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let texture = PPtr::read(reader)?;
        let alpha_texture = if ALPHA_TEXTURE.applies(&reader.ctx) { Some(PPtr::read(reader)?) } else { None };
        let secondary_textures = if SECONDARY_TEXTURES.applies(&reader.ctx) {
            reader.read_object_array(|r| {
                Ok(SecondarySpriteTexture { texture: PPtr::read(r)?, name: r.read_cstring()? })
            })?
        } else {
            Vec::new()
        };

        let geometry = if MESH_VERTEX_DATA.applies(&reader.ctx) {
            let sub_meshes = reader.read_object_array(SubMesh::read)?;
            let index_buffer = reader.read_byte_array()?.to_vec();
            reader.align(4)?;
            let vertex_data = VertexData::read(reader)?;
            SpriteGeometry::Mesh { sub_meshes, index_buffer, vertex_data }
        } else {
            let vertices = reader.read_object_array(SpriteVertex::read)?;
            let indices = reader.read_array(|r| r.read_u16())?;
            reader.align(4)?;
            SpriteGeometry::Vertices { vertices, indices }
        };

        let mut bind_pose = Vec::new();
        let mut source_skin = Vec::new();
        if BIND_POSE.applies(&reader.ctx) {
            bind_pose = reader.read_array(|r| read_matrix4x4(r))?;
            if SOURCE_SKIN.applies(&reader.ctx) {
                source_skin = reader.read_array(|r| BoneWeights4::read(r))?;
            }
        }

        let texture_rect = Rectf::read(reader)?;
        let texture_rect_offset = read_vector2(reader)?;
        let atlas_rect_offset = if ATLAS_RECT_OFFSET.applies(&reader.ctx) { Some(read_vector2(reader)?) } else { None };
        let settings = SpriteSettings { raw: reader.read_u32()? };
        let uv_transform = if UV_TRANSFORM.applies(&reader.ctx) { Some(read_vector4(reader)?) } else { None };
        let downscale_multiplier = if DOWNSCALE_MULTIPLIER.applies(&reader.ctx) { Some(reader.read_f32()?) } else { None };

        Ok(Self {
            texture,
            alpha_texture,
            secondary_textures,
            geometry,
            bind_pose,
            source_skin,
            texture_rect,
            texture_rect_offset,
            atlas_rect_offset,
            settings,
            uv_transform,
            downscale_multiplier,
        })
    }
}

/// Atlas membership, recorded from 2017 on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAtlasData {
    pub render_data_key: ([u8; 16], i64),
    pub atlas_tags:      Vec<String>,
    pub sprite_atlas:    PPtr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub named:           NamedObject,
    pub rect:            Rectf,
    pub offset:          Vector2,
    pub border:          Option<Vector4>,
    pub pixels_to_units: f32,
    pub pivot:           Option<Vector2>,
    pub extrude:         u32,
    pub is_polygon:      Option<bool>,
    pub atlas:           Option<SpriteAtlasData>,
    pub render_data:     SpriteRenderData,
    pub physics_shape:   Vec<Vec<Vector2>>,
}

impl Sprite {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let named = NamedObject::read(reader)?;
        let rect = Rectf::read(reader)?;
        let offset = read_vector2(reader)?;
        let border = if BORDER.applies(&reader.ctx) { Some(read_vector4(reader)?) } else { None };
        let pixels_to_units = reader.read_f32()?;
        let pivot = if PIVOT.applies(&reader.ctx) { Some(read_vector2(reader)?) } else { None };
        let extrude = reader.read_u32()?;
        let is_polygon = if IS_POLYGON.applies(&reader.ctx) {
            let flag = reader.read_bool()?;
            reader.align(4)?;
            Some(flag)
        } else {
            None
        };
        let atlas = if ATLAS_DATA.applies(&reader.ctx) {
            let render_data_key = (reader.read_hash128()?, reader.read_i64()?);
            let atlas_tags = reader.read_array(|r| r.read_aligned_string())?;
            let sprite_atlas = PPtr::read(reader)?;
            Some(SpriteAtlasData { render_data_key, atlas_tags, sprite_atlas })
        } else {
            None
        };
        let render_data = SpriteRenderData::read(reader)?;
        let physics_shape = if ATLAS_DATA.applies(&reader.ctx) {
            reader.read_array(|r| r.read_array(|r| read_vector2(r)))?
        } else {
            Vec::new()
        };
        Ok(Self {
            named,
            rect,
            offset,
            border,
            pixels_to_units,
            pivot,
            extrude,
            is_polygon,
            atlas,
            render_data,
            physics_shape,
        })
    }

    pub fn decode(reader: &mut ObjectReader<'_>) -> Result<Object> {
        Ok(Object::Sprite(Self::read(reader)?))
    }

    pub fn name(&self) -> &str {
        &self.named.name
    }

    /// The texture this sprite samples, looked up in `file` (the file that
    /// owns the sprite).
    pub fn texture<'f>(&self, file: &'f SerializedFile) -> Result<Option<&'f Texture2D>> {
        Ok(self.render_data.texture.resolve(file)?.and_then(Object::as_texture2d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_bitfield() {
        let s = SpriteSettings { raw: 0b0100_1011 };
        assert!(s.packed());
        assert_eq!(s.packing_mode(), SpritePackingMode::Rectangle);
        assert_eq!(s.packing_rotation(), Some(SpritePackingRotation::FlipVertical));
        assert_eq!(s.mesh_type(), SpriteMeshType::Tight);
        assert_eq!(SpriteSettings { raw: 0xf << 2 }.packing_rotation(), None);
    }
}
