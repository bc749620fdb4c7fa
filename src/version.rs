//! Packed engine version used to gate conditional field reads.
//!
//! `2019.4.3f1` packs to `(2019 << 32) | (4 << 16) | (3 << 8) | 1`, so every
//! "present since version X" check is a single integer comparison.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct VersionKey(pub u64);

impl VersionKey {
    pub const fn pack(major: u32, minor: u16, build: u8, revision: u8) -> Self {
        VersionKey(
            ((major as u64) << 32) | ((minor as u64) << 16) | ((build as u64) << 8) | revision as u64,
        )
    }

    /// Shorthand for the `major.minor` thresholds most decoders use.
    pub const fn of(major: u32, minor: u16) -> Self {
        Self::pack(major, minor, 0, 0)
    }

    pub const fn unpack(self) -> (u32, u16, u8, u8) {
        (
            (self.0 >> 32) as u32,
            (self.0 >> 16) as u16,
            (self.0 >> 8) as u8,
            self.0 as u8,
        )
    }

    /// Parse an engine version string such as `2019.4.3f1` or `5.6.0p3`.
    ///
    /// Every non-digit is a separator; the first four numeric parts are
    /// packed, missing parts are zero.  Parts wider than their slot are
    /// truncated.
    pub fn parse(version: &str) -> (Self, BuildType) {
        let mut parts = version
            .split(|c: char| !c.is_ascii_digit())
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u64>().unwrap_or(0));
        let mut next = || parts.next().unwrap_or(0);
        let key = VersionKey::pack(next() as u32, next() as u16, next() as u8, next() as u8);
        (key, BuildType::from_version(version))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, build, revision) = self.unpack();
        write!(f, "{major}.{minor}.{build}.{revision}")
    }
}

/// Release channel letter in a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BuildType {
    #[default]
    None,
    Alpha,
    Patch,
}

impl BuildType {
    /// Strip digits and dots; `a` is alpha, `p` is patch, the rest is none.
    pub fn from_version(version: &str) -> Self {
        let code: String = version.chars().filter(|c| !c.is_ascii_digit() && *c != '.').collect();
        match code.as_str() {
            "a" => BuildType::Alpha,
            "p" => BuildType::Patch,
            _   => BuildType::None,
        }
    }
}

/// Version string assumed for serialized files too old to record one.
pub const DEFAULT_ENGINE_VERSION: &str = "2.5.0f5";
