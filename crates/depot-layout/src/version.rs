//! Release / pre-release classification of artifact versions.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT: &str = "SNAPSHOT";

static TIMESTAMPED_SNAPSHOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?<base>.*)-(?<stamp>[0-9]{8}\.[0-9]{6})-(?<build>[0-9]+)$").unwrap());

pub(crate) static TIMESTAMP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8}\.[0-9]{6}-[0-9]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionClass {
    Release,
    PreRelease,
}

impl VersionClass {
    pub fn of(version: &str) -> Self {
        if is_snapshot(version) {
            VersionClass::PreRelease
        } else {
            VersionClass::Release
        }
    }
}

impl std::fmt::Display for VersionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionClass::Release => write!(f, "release"),
            VersionClass::PreRelease => write!(f, "pre-release"),
        }
    }
}

/// `1.0-SNAPSHOT` and timestamped builds like `1.0-20240101.120000-3`.
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(&format!("-{SNAPSHOT}")) || version == SNAPSHOT || TIMESTAMPED_SNAPSHOT.is_match(version)
}

/// The version a directory is named after: timestamped snapshots collapse to
/// `<base>-SNAPSHOT`, every other version is its own base.
pub fn base_version(version: &str) -> Cow<'_, str> {
    match TIMESTAMPED_SNAPSHOT.captures(version) {
        Some(caps) => Cow::Owned(format!("{}-{SNAPSHOT}", &caps["base"])),
        None => Cow::Borrowed(version),
    }
}
