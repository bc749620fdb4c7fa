use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine class identifier.  Negative values are valid sentinel classes
/// (script-defined types in the type table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i32);

impl ClassId {
    pub const UNKNOWN:        ClassId = ClassId(-1);
    pub const OBJECT:         ClassId = ClassId(0);
    pub const GAME_OBJECT:    ClassId = ClassId(1);
    pub const COMPONENT:      ClassId = ClassId(2);
    pub const TRANSFORM:      ClassId = ClassId(4);
    pub const MATERIAL:       ClassId = ClassId(21);
    pub const TEXTURE:        ClassId = ClassId(27);
    pub const TEXTURE_2D:     ClassId = ClassId(28);
    pub const MESH:           ClassId = ClassId(43);
    pub const SHADER:         ClassId = ClassId(48);
    pub const TEXT_ASSET:     ClassId = ClassId(49);
    pub const AUDIO_CLIP:     ClassId = ClassId(83);
    pub const MONO_BEHAVIOUR: ClassId = ClassId(114);
    pub const MONO_SCRIPT:    ClassId = ClassId(115);
    pub const FONT:           ClassId = ClassId(128);
    pub const NAMED_OBJECT:   ClassId = ClassId(130);
    pub const ASSET_BUNDLE:   ClassId = ClassId(142);
    pub const SPRITE:         ClassId = ClassId(213);
    pub const SPRITE_ATLAS:   ClassId = ClassId(687078895);

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            ClassId::UNKNOWN        => "UnknownType",
            ClassId::OBJECT         => "Object",
            ClassId::GAME_OBJECT    => "GameObject",
            ClassId::COMPONENT      => "Component",
            ClassId::TRANSFORM      => "Transform",
            ClassId::MATERIAL       => "Material",
            ClassId::TEXTURE        => "Texture",
            ClassId::TEXTURE_2D     => "Texture2D",
            ClassId::MESH           => "Mesh",
            ClassId::SHADER         => "Shader",
            ClassId::TEXT_ASSET     => "TextAsset",
            ClassId::AUDIO_CLIP     => "AudioClip",
            ClassId::MONO_BEHAVIOUR => "MonoBehaviour",
            ClassId::MONO_SCRIPT    => "MonoScript",
            ClassId::FONT           => "Font",
            ClassId::NAMED_OBJECT   => "NamedObject",
            ClassId::ASSET_BUNDLE   => "AssetBundle",
            ClassId::SPRITE         => "Sprite",
            ClassId::SPRITE_ATLAS   => "SpriteAtlas",
            _                       => return None,
        })
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None       => write!(f, "class {}", self.0),
        }
    }
}

/// Target platform recorded in serialized file metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(pub i32);

impl Platform {
    pub const NO_TARGET:             Platform = Platform(-2);
    pub const ANY_PLAYER:            Platform = Platform(-1);
    pub const STANDALONE_OSX:        Platform = Platform(2);
    pub const STANDALONE_WINDOWS:    Platform = Platform(5);
    pub const IOS:                   Platform = Platform(9);
    pub const ANDROID:               Platform = Platform(13);
    pub const STANDALONE_LINUX:      Platform = Platform(17);
    pub const STANDALONE_WINDOWS_64: Platform = Platform(19);
    pub const WEBGL:                 Platform = Platform(20);
    pub const WSA_PLAYER:            Platform = Platform(21);
    pub const STANDALONE_LINUX_64:   Platform = Platform(24);
    pub const PS4:                   Platform = Platform(31);
    pub const XBOX_ONE:              Platform = Platform(33);
    pub const SWITCH:                Platform = Platform(38);
    pub const UNKNOWN_PLATFORM:      Platform = Platform(9999);

    pub fn name(self) -> &'static str {
        match self {
            Platform::NO_TARGET             => "NoTarget",
            Platform::ANY_PLAYER            => "AnyPlayer",
            Platform::STANDALONE_OSX        => "StandaloneOSX",
            Platform::STANDALONE_WINDOWS    => "StandaloneWindows",
            Platform::IOS                   => "iOS",
            Platform::ANDROID               => "Android",
            Platform::STANDALONE_LINUX      => "StandaloneLinux",
            Platform::STANDALONE_WINDOWS_64 => "StandaloneWindows64",
            Platform::WEBGL                 => "WebGL",
            Platform::WSA_PLAYER            => "WSAPlayer",
            Platform::STANDALONE_LINUX_64   => "StandaloneLinux64",
            Platform::PS4                   => "PS4",
            Platform::XBOX_ONE              => "XboxOne",
            Platform::SWITCH                => "Switch",
            _                               => "UnknownPlatform",
        }
    }
}

impl Default for Platform {
    fn default() -> Self { Platform::UNKNOWN_PLATFORM }
}
