pub mod error;
pub mod reader;
pub mod shared;
pub mod version;
pub mod class_id;
pub mod codec;
pub mod header;
pub mod block;
pub mod bundle;
pub mod serialized;
pub mod objects;
pub mod resource;
pub mod pixel;
pub mod manager;

pub use error::{Error, ObjectError, Result};
pub use class_id::{ClassId, Platform};
pub use version::{BuildType, VersionKey};
pub use codec::{CompressionType, get_codec};
pub use bundle::BundleFile;
pub use serialized::{is_serialized_file, SerializedFile};
pub use objects::{Object, ObjectRegistry, PPtr};
pub use resource::{ResourceLocation, ResourceStreams};
pub use pixel::{DecoderKind, PixelCodec, TextureRequest};
pub use manager::{ArchiveSource, AssetManager, LoadOptions, LoadReport};
