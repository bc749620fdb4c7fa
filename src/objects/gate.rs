//! Version predicates for conditionally present fields.
//!
//! Each class decoder lists its optional fields as named [`Present`] constants
//! next to the struct, so the layout for any engine version can be read off
//! the table without tracing the decode body.

use crate::version::{BuildType, VersionKey};

use super::ObjectContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Present {
    /// `version >= key`
    Since(VersionKey),
    /// `version > key`
    After(VersionKey),
    /// `version < key`
    Before(VersionKey),
    /// `version <= key`
    UpTo(VersionKey),
    /// `min <= version <= max`
    Between(VersionKey, VersionKey),
    /// `version >= release`, or `version >= patch` on a patch build.
    SinceOrPatch { release: VersionKey, patch: VersionKey },
}

impl Present {
    pub const fn since(major: u32, minor: u16) -> Self {
        Present::Since(VersionKey::of(major, minor))
    }

    pub const fn after(major: u32, minor: u16) -> Self {
        Present::After(VersionKey::of(major, minor))
    }

    pub const fn before(major: u32, minor: u16) -> Self {
        Present::Before(VersionKey::of(major, minor))
    }

    pub const fn up_to(major: u32, minor: u16) -> Self {
        Present::UpTo(VersionKey::of(major, minor))
    }

    pub fn test(self, version: VersionKey, build_type: BuildType) -> bool {
        match self {
            Present::Since(k)          => version >= k,
            Present::After(k)          => version > k,
            Present::Before(k)         => version < k,
            Present::UpTo(k)           => version <= k,
            Present::Between(min, max) => version >= min && version <= max,
            Present::SinceOrPatch { release, patch } => {
                version >= release || (version >= patch && build_type == BuildType::Patch)
            }
        }
    }

    #[inline]
    pub fn applies(self, ctx: &ObjectContext) -> bool {
        self.test(ctx.version, ctx.build_type)
    }
}
