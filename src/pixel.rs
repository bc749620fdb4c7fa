//! Hand-off to an external pixel decoder.
//!
//! This crate locates and slices compressed texture payloads but never
//! decodes pixels.  A [`PixelCodec`] supplied by the caller does that; the
//! table here only maps an engine [`TextureFormat`] onto the block decoder
//! that understands it.

use tracing::debug;

use crate::error::{Error, Result};
use crate::objects::texture::{Texture2D, TextureFormat};
use crate::resource::ResourceStreams;

/// Block decoders an external codec is expected to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    Dxt1,
    Dxt5,
    Bc4,
    Bc5,
    Bc6,
    Bc7,
    Etc1,
    AtcRgb4,
    AtcRgba8,
    EacR,
    EacRSigned,
    EacRg,
    Etc2,
    Etc2A1,
    Etc2A8,
}

impl DecoderKind {
    pub fn for_format(format: TextureFormat) -> Option<Self> {
        use TextureFormat as F;
        Some(match format {
            F::DXT1                           => DecoderKind::Dxt1,
            F::DXT5                           => DecoderKind::Dxt5,
            F::BC4                            => DecoderKind::Bc4,
            F::BC5                            => DecoderKind::Bc5,
            F::BC6H                           => DecoderKind::Bc6,
            F::BC7                            => DecoderKind::Bc7,
            F::ETC_RGB4 | F::ETC_RGB4_3DS     => DecoderKind::Etc1,
            F::ATC_RGB4                       => DecoderKind::AtcRgb4,
            F::ATC_RGBA8                      => DecoderKind::AtcRgba8,
            F::EAC_R                          => DecoderKind::EacR,
            F::EAC_R_SIGNED                   => DecoderKind::EacRSigned,
            F::EAC_RG                         => DecoderKind::EacRg,
            F::ETC2_RGB                       => DecoderKind::Etc2,
            F::ETC2_RGBA1                     => DecoderKind::Etc2A1,
            F::ETC2_RGBA8 | F::ETC_RGBA8_3DS  => DecoderKind::Etc2A8,
            _                                 => return None,
        })
    }
}

/// External block decoder producing tightly packed RGBA8.
pub trait PixelCodec: Send + Sync {
    fn decode(&self, kind: DecoderKind, data: &[u8], width: u32, height: u32) -> std::result::Result<Vec<u8>, String>;
}

/// Everything a [`PixelCodec`] needs for one texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureRequest<'a> {
    pub name:   &'a str,
    pub kind:   DecoderKind,
    pub data:   &'a [u8],
    pub width:  u32,
    pub height: u32,
}

impl<'a> TextureRequest<'a> {
    /// Resolve the texture's format and payload.
    pub fn new(texture: &'a Texture2D, streams: &ResourceStreams) -> Result<Self> {
        let kind = texture.format()
            .and_then(DecoderKind::for_format)
            .ok_or(Error::UnsupportedTextureFormat(texture.texture_format))?;
        let dims = |v: i32| u32::try_from(v).map_err(|_| Error::corrupt(format!("negative texture dimension {v}")));
        Ok(Self {
            name:   texture.name(),
            kind,
            data:   texture.resource.get_bytes(streams)?,
            width:  dims(texture.width)?,
            height: dims(texture.height)?,
        })
    }

    /// RGBA8 output size.
    pub fn output_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn decode(&self, codec: &dyn PixelCodec) -> Result<Vec<u8>> {
        debug!(texture = self.name, kind = ?self.kind, width = self.width, height = self.height, "decoding texture");
        let rgba = codec.decode(self.kind, self.data, self.width, self.height)
            .map_err(|e| Error::PixelDecode(format!("{}: {e}", self.name)))?;
        if rgba.len() != self.output_len() {
            return Err(Error::PixelDecode(format!(
                "{}: codec returned {} bytes, expected {}",
                self.name,
                rgba.len(),
                self.output_len()
            )));
        }
        Ok(rgba)
    }
}
