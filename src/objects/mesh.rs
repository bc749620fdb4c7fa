//! Mesh sub-structures shared with sprite render data.

use super::gate::Present;
use super::math::{read_vector3, Vector3};
use super::ObjectReader;
use crate::error::Result;
use crate::reader::EndianReader;

// Field presence.
const STREAM_PACKED_STRIDE:   Present = Present::since(4, 0);
const VERTEX_CURRENT_CHANNELS: Present = Present::before(2018, 0);
const VERTEX_CHANNELS:        Present = Present::since(4, 0);
const VERTEX_STREAM_TABLE:    Present = Present::before(5, 0);
const VERTEX_FIXED_STREAMS:   Present = Present::before(4, 0);
const SUBMESH_TRIANGLE_COUNT: Present = Present::before(4, 0);
const SUBMESH_BASE_VERTEX:    Present = Present::since(2017, 3);
const SUBMESH_VERTEX_RANGE:   Present = Present::since(3, 0);

/// Streams stored before 4.0, when the table had a fixed length.
const FIXED_STREAM_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxPrimitiveType {
    Triangles,
    TriangleStrip,
    Quads,
    Lines,
    LineStrip,
    Points,
}

impl GfxPrimitiveType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => GfxPrimitiveType::Triangles,
            1 => GfxPrimitiveType::TriangleStrip,
            2 => GfxPrimitiveType::Quads,
            3 => GfxPrimitiveType::Lines,
            4 => GfxPrimitiveType::LineStrip,
            5 => GfxPrimitiveType::Points,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub center: Vector3,
    pub extent: Vector3,
}

impl Aabb {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        Ok(Self { center: read_vector3(reader)?, extent: read_vector3(reader)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub channel_mask: u32,
    pub offset:       u32,
    pub stride:       u32,
    pub align:        Option<u32>,
    pub divider_op:   Option<u8>,
    pub frequency:    Option<u16>,
}

impl StreamInfo {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let channel_mask = reader.read_u32()?;
        let offset = reader.read_u32()?;
        if STREAM_PACKED_STRIDE.applies(&reader.ctx) {
            Ok(Self {
                channel_mask,
                offset,
                stride:     reader.read_u8()? as u32,
                align:      None,
                divider_op: Some(reader.read_u8()?),
                frequency:  Some(reader.read_u16()?),
            })
        } else {
            Ok(Self {
                channel_mask,
                offset,
                stride:     reader.read_u32()?,
                align:      Some(reader.read_u32()?),
                divider_op: None,
                frequency:  None,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub stream:    u8,
    pub offset:    u8,
    pub format:    u8,
    pub dimension: u8,
}

impl ChannelInfo {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        Ok(Self {
            stream:    reader.read_u8()?,
            offset:    reader.read_u8()?,
            format:    reader.read_u8()?,
            dimension: reader.read_u8()? & 0xf,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneWeights4 {
    pub weight:     [f32; 4],
    pub bone_index: [i32; 4],
}

impl BoneWeights4 {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        let mut weight = [0f32; 4];
        for w in weight.iter_mut() {
            *w = reader.read_f32()?;
        }
        let mut bone_index = [0i32; 4];
        for b in bone_index.iter_mut() {
            *b = reader.read_i32()?;
        }
        Ok(Self { weight, bone_index })
    }
}

/// Vertex buffer description and raw interleaved data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexData {
    pub current_channels: Option<u32>,
    pub vertex_count:     u32,
    pub channels:         Vec<ChannelInfo>,
    /// Stored only before 5.0; later versions derive streams from channels.
    pub streams:          Vec<StreamInfo>,
    pub data:             Vec<u8>,
}

impl VertexData {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let current_channels = if VERTEX_CURRENT_CHANNELS.applies(&reader.ctx) {
            Some(reader.read_u32()?)
        } else {
            None
        };
        let vertex_count = reader.read_u32()?;
        let channels = if VERTEX_CHANNELS.applies(&reader.ctx) {
            reader.read_array(|r| ChannelInfo::read(r))?
        } else {
            Vec::new()
        };
        let streams = if VERTEX_STREAM_TABLE.applies(&reader.ctx) {
            let count = if VERTEX_FIXED_STREAMS.applies(&reader.ctx) {
                FIXED_STREAM_COUNT
            } else {
                reader.read_len()?
            };
            let mut streams = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                streams.push(StreamInfo::read(reader)?);
            }
            streams
        } else {
            Vec::new()
        };
        let data = reader.read_byte_array()?.to_vec();
        reader.align(4)?;
        Ok(Self { current_channels, vertex_count, channels, streams, data })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubMesh {
    pub first_byte:     u32,
    pub index_count:    u32,
    pub topology:       i32,
    pub triangle_count: Option<u32>,
    pub base_vertex:    Option<u32>,
    pub first_vertex:   Option<u32>,
    pub vertex_count:   Option<u32>,
    pub local_aabb:     Option<Aabb>,
}

impl SubMesh {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let first_byte = reader.read_u32()?;
        let index_count = reader.read_u32()?;
        let topology = reader.read_i32()?;
        let triangle_count = if SUBMESH_TRIANGLE_COUNT.applies(&reader.ctx) { Some(reader.read_u32()?) } else { None };
        let base_vertex = if SUBMESH_BASE_VERTEX.applies(&reader.ctx) { Some(reader.read_u32()?) } else { None };
        let (first_vertex, vertex_count, local_aabb) = if SUBMESH_VERTEX_RANGE.applies(&reader.ctx) {
            (Some(reader.read_u32()?), Some(reader.read_u32()?), Some(Aabb::read(reader)?))
        } else {
            (None, None, None)
        };
        Ok(Self { first_byte, index_count, topology, triangle_count, base_vertex, first_vertex, vertex_count, local_aabb })
    }

    pub fn primitive(&self) -> Option<GfxPrimitiveType> {
        GfxPrimitiveType::from_raw(self.topology)
    }
}
