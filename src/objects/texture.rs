//! Texture and Texture2D.
//!
//! Only the fields a consumer needs to locate and interpret the pixel payload
//! are kept; the rest are read past so the cursor ends on the image data.

use super::gate::Present;
use super::{NamedObject, Object, ObjectReader};
use crate::error::Result;
use crate::resource::ResourceLocation;
use crate::version::VersionKey;

// Field presence.
const FALLBACK_FORMAT:       Present = Present::since(2017, 3);
const ALPHA_OPTIONAL:        Present = Present::since(2020, 2);
const MIPS_STRIPPED:         Present = Present::since(2020, 0);
const MIP_MAP_FLAG:          Present = Present::before(5, 2);
const IS_READABLE:           Present = Present::since(2, 6);
const IS_PRE_PROCESSED:      Present = Present::since(2020, 0);
const IGNORE_MASTER_LIMIT:   Present = Present::since(2019, 3);
const READ_ALLOWED:          Present = Present::Between(VersionKey::of(3, 0), VersionKey::of(5, 4));
const STREAMING_MIPMAPS:     Present = Present::since(2018, 2);
const WRAP_UVW:              Present = Present::since(2017, 0);
const LIGHTMAP_FORMAT:       Present = Present::since(3, 0);
const COLOR_SPACE:           Present = Present::since(3, 5);
const PLATFORM_BLOB:         Present = Present::since(2020, 2);
const STREAMING_INFO:        Present = Present::after(5, 3);
const STREAMING_OFFSET_WIDE: Present = Present::since(2020, 0);

/// Pixel formats, numbered as the engine numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    Alpha8             = 1,
    ARGB4444           = 2,
    RGB24              = 3,
    RGBA32             = 4,
    ARGB32             = 5,
    RGB565             = 7,
    R16                = 9,
    DXT1               = 10,
    DXT5               = 12,
    RGBA4444           = 13,
    BGRA32             = 14,
    RHalf              = 15,
    RGHalf             = 16,
    RGBAHalf           = 17,
    RFloat             = 18,
    RGFloat            = 19,
    RGBAFloat          = 20,
    YUY2               = 21,
    RGB9e5Float        = 22,
    BC6H               = 24,
    BC7                = 25,
    BC4                = 26,
    BC5                = 27,
    DXT1Crunched       = 28,
    DXT5Crunched       = 29,
    PVRTC_RGB2         = 30,
    PVRTC_RGBA2        = 31,
    PVRTC_RGB4         = 32,
    PVRTC_RGBA4        = 33,
    ETC_RGB4           = 34,
    ATC_RGB4           = 35,
    ATC_RGBA8          = 36,
    EAC_R              = 41,
    EAC_R_SIGNED       = 42,
    EAC_RG             = 43,
    EAC_RG_SIGNED      = 44,
    ETC2_RGB           = 45,
    ETC2_RGBA1         = 46,
    ETC2_RGBA8         = 47,
    ASTC_RGB_4x4       = 48,
    ASTC_RGB_5x5       = 49,
    ASTC_RGB_6x6       = 50,
    ASTC_RGB_8x8       = 51,
    ASTC_RGB_10x10     = 52,
    ASTC_RGB_12x12     = 53,
    ASTC_RGBA_4x4      = 54,
    ASTC_RGBA_5x5      = 55,
    ASTC_RGBA_6x6      = 56,
    ASTC_RGBA_8x8      = 57,
    ASTC_RGBA_10x10    = 58,
    ASTC_RGBA_12x12    = 59,
    ETC_RGB4_3DS       = 60,
    ETC_RGBA8_3DS      = 61,
    RG16               = 62,
    R8                 = 63,
    ETC_RGB4Crunched   = 64,
    ETC2_RGBA8Crunched = 65,
    ASTC_HDR_4x4       = 66,
    ASTC_HDR_5x5       = 67,
    ASTC_HDR_6x6       = 68,
    ASTC_HDR_8x8       = 69,
    ASTC_HDR_10x10     = 70,
    ASTC_HDR_12x12     = 71,
}

impl TextureFormat {
    pub fn from_raw(raw: i32) -> Option<Self> {
        use TextureFormat::*;
        Some(match raw {
            1  => Alpha8,
            2  => ARGB4444,
            3  => RGB24,
            4  => RGBA32,
            5  => ARGB32,
            7  => RGB565,
            9  => R16,
            10 => DXT1,
            12 => DXT5,
            13 => RGBA4444,
            14 => BGRA32,
            15 => RHalf,
            16 => RGHalf,
            17 => RGBAHalf,
            18 => RFloat,
            19 => RGFloat,
            20 => RGBAFloat,
            21 => YUY2,
            22 => RGB9e5Float,
            24 => BC6H,
            25 => BC7,
            26 => BC4,
            27 => BC5,
            28 => DXT1Crunched,
            29 => DXT5Crunched,
            30 => PVRTC_RGB2,
            31 => PVRTC_RGBA2,
            32 => PVRTC_RGB4,
            33 => PVRTC_RGBA4,
            34 => ETC_RGB4,
            35 => ATC_RGB4,
            36 => ATC_RGBA8,
            41 => EAC_R,
            42 => EAC_R_SIGNED,
            43 => EAC_RG,
            44 => EAC_RG_SIGNED,
            45 => ETC2_RGB,
            46 => ETC2_RGBA1,
            47 => ETC2_RGBA8,
            48 => ASTC_RGB_4x4,
            49 => ASTC_RGB_5x5,
            50 => ASTC_RGB_6x6,
            51 => ASTC_RGB_8x8,
            52 => ASTC_RGB_10x10,
            53 => ASTC_RGB_12x12,
            54 => ASTC_RGBA_4x4,
            55 => ASTC_RGBA_5x5,
            56 => ASTC_RGBA_6x6,
            57 => ASTC_RGBA_8x8,
            58 => ASTC_RGBA_10x10,
            59 => ASTC_RGBA_12x12,
            60 => ETC_RGB4_3DS,
            61 => ETC_RGBA8_3DS,
            62 => RG16,
            63 => R8,
            64 => ETC_RGB4Crunched,
            65 => ETC2_RGBA8Crunched,
            66 => ASTC_HDR_4x4,
            67 => ASTC_HDR_5x5,
            68 => ASTC_HDR_6x6,
            69 => ASTC_HDR_8x8,
            70 => ASTC_HDR_10x10,
            71 => ASTC_HDR_12x12,
            _  => return None,
        })
    }
}

// ── Texture ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub named:                     NamedObject,
    pub forced_fallback_format:    Option<i32>,
    pub downscale_fallback:        Option<bool>,
    pub is_alpha_channel_optional: Option<bool>,
}

impl Texture {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let named = NamedObject::read(reader)?;
        let mut texture = Self {
            named,
            forced_fallback_format:    None,
            downscale_fallback:        None,
            is_alpha_channel_optional: None,
        };
        if FALLBACK_FORMAT.applies(&reader.ctx) {
            texture.forced_fallback_format = Some(reader.read_i32()?);
            texture.downscale_fallback = Some(reader.read_bool()?);
            if ALPHA_OPTIONAL.applies(&reader.ctx) {
                texture.is_alpha_channel_optional = Some(reader.read_bool()?);
            }
            reader.align(4)?;
        }
        Ok(texture)
    }

    pub fn decode(reader: &mut ObjectReader<'_>) -> Result<Object> {
        Ok(Object::Texture(Self::read(reader)?))
    }
}

// ── Texture2D ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GLTextureSettings {
    pub filter_mode: i32,
    pub aniso:       i32,
    pub mip_bias:    f32,
    /// U wrap mode; V and W are read past when present.
    pub wrap_mode:   i32,
}

impl GLTextureSettings {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let filter_mode = reader.read_i32()?;
        let aniso = reader.read_i32()?;
        let mip_bias = reader.read_f32()?;
        let wrap_mode = reader.read_i32()?;
        if WRAP_UVW.applies(&reader.ctx) {
            reader.read_i32()?; // wrap v
            reader.read_i32()?; // wrap w
        }
        Ok(Self { filter_mode, aniso, mip_bias, wrap_mode })
    }
}

/// Where a streamed texture's pixels live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingInfo {
    pub offset: u64,
    pub size:   u32,
    pub path:   String,
}

impl StreamingInfo {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let offset = if STREAMING_OFFSET_WIDE.applies(&reader.ctx) {
            reader.read_u64()?
        } else {
            reader.read_u32()? as u64
        };
        let size = reader.read_u32()?;
        let path = reader.read_aligned_string()?;
        Ok(Self { offset, size, path })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    pub texture:          Texture,
    pub width:            i32,
    pub height:           i32,
    /// Raw format number; see [`Texture2D::format`].
    pub texture_format:   i32,
    pub mip_map:          Option<bool>,
    pub mip_count:        Option<i32>,
    pub texture_settings: GLTextureSettings,
    pub stream_data:      Option<StreamingInfo>,
    pub resource:         ResourceLocation,
}

impl Texture2D {
    pub fn read(reader: &mut ObjectReader<'_>) -> Result<Self> {
        let texture = Texture::read(reader)?;
        let width = reader.read_i32()?;
        let height = reader.read_i32()?;
        reader.read_i32()?; // complete image size
        if MIPS_STRIPPED.applies(&reader.ctx) {
            reader.read_i32()?;
        }
        let texture_format = reader.read_i32()?;
        let (mip_map, mip_count) = if MIP_MAP_FLAG.applies(&reader.ctx) {
            (Some(reader.read_bool()?), None)
        } else {
            (None, Some(reader.read_i32()?))
        };
        for gate in [IS_READABLE, IS_PRE_PROCESSED, IGNORE_MASTER_LIMIT, READ_ALLOWED, STREAMING_MIPMAPS] {
            if gate.applies(&reader.ctx) {
                reader.read_bool()?;
            }
        }
        reader.align(4)?;
        if STREAMING_MIPMAPS.applies(&reader.ctx) {
            reader.read_i32()?; // streaming mipmaps priority
        }
        reader.read_i32()?; // image count
        reader.read_i32()?; // texture dimension
        let texture_settings = GLTextureSettings::read(reader)?;
        if LIGHTMAP_FORMAT.applies(&reader.ctx) {
            reader.read_i32()?;
        }
        if COLOR_SPACE.applies(&reader.ctx) {
            reader.read_i32()?;
        }
        if PLATFORM_BLOB.applies(&reader.ctx) {
            reader.read_byte_array()?;
            reader.align(4)?;
        }

        let image_data_size = reader.read_len()?;
        let stream_data = if image_data_size == 0 && STREAMING_INFO.applies(&reader.ctx) {
            Some(StreamingInfo::read(reader)?)
        } else {
            None
        };
        let resource = match &stream_data {
            Some(info) if !info.path.is_empty() => ResourceLocation::external(&info.path, info.offset, info.size),
            _ => ResourceLocation::inline(reader.file_data().clone(), reader.position(), image_data_size),
        };

        Ok(Self { texture, width, height, texture_format, mip_map, mip_count, texture_settings, stream_data, resource })
    }

    pub fn decode(reader: &mut ObjectReader<'_>) -> Result<Object> {
        Ok(Object::Texture2D(Self::read(reader)?))
    }

    pub fn name(&self) -> &str {
        &self.texture.named.name
    }

    pub fn format(&self) -> Option<TextureFormat> {
        TextureFormat::from_raw(self.texture_format)
    }
}
