use serde::Serialize;

use crate::error::Result;
use crate::reader::EndianReader;

pub type Vector2 = [f32; 2];
pub type Vector3 = [f32; 3];
pub type Vector4 = [f32; 4];
/// Four rows of four.
pub type Matrix4x4 = [Vector4; 4];

fn read_floats<const N: usize>(reader: &mut EndianReader<'_>) -> Result<[f32; N]> {
    let mut out = [0f32; N];
    for v in out.iter_mut() {
        *v = reader.read_f32()?;
    }
    Ok(out)
}

pub fn read_vector2(reader: &mut EndianReader<'_>) -> Result<Vector2> {
    read_floats(reader)
}

pub fn read_vector3(reader: &mut EndianReader<'_>) -> Result<Vector3> {
    read_floats(reader)
}

pub fn read_vector4(reader: &mut EndianReader<'_>) -> Result<Vector4> {
    read_floats(reader)
}

pub fn read_matrix4x4(reader: &mut EndianReader<'_>) -> Result<Matrix4x4> {
    Ok([read_vector4(reader)?, read_vector4(reader)?, read_vector4(reader)?, read_vector4(reader)?])
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rectf {
    pub x:      f32,
    pub y:      f32,
    pub width:  f32,
    pub height: f32,
}

impl Rectf {
    pub fn read(reader: &mut EndianReader<'_>) -> Result<Self> {
        Ok(Self {
            x:      reader.read_f32()?,
            y:      reader.read_f32()?,
            width:  reader.read_f32()?,
            height: reader.read_f32()?,
        })
    }
}
