//! Bidirectional mapping between coordinates and repository-relative paths.

mod default;
mod legacy;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ArtifactCoordinate, MetadataRef};

/// File name of repository metadata.
pub const METADATA_FILE: &str = "maven-metadata.xml";

const CHECKSUM_SUFFIXES: &[&str] = &[".sha1", ".md5", ".sha256", ".sha512", ".asc"];
const DOUBLE_EXTENSIONS: &[&str] = &["tar.gz", "tar.bz2"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("{0} is a checksum file")]
    ChecksumFile(String),

    #[error("{0} is a metadata file")]
    MetadataFile(String),

    #[error("{0} is a directory")]
    Directory(String),

    #[error("{path}: expected {expected} path segments, found {found}")]
    SegmentCount {
        path:     String,
        expected: &'static str,
        found:    usize,
    },

    #[error("{path}: {reason}")]
    Malformed { path: String, reason: &'static str },

    #[error("the {0} layout has no repository metadata")]
    Unsupported(RepositoryLayout),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryLayout {
    /// `g/r/o/u/p/name/version/name-version[-classifier].ext`
    #[default]
    Default,
    /// `group/<kind>s/name-version.ext`
    Legacy,
}

impl RepositoryLayout {
    /// Relative path of `coordinate`. Total for well-formed coordinates.
    pub fn to_path(&self, coordinate: &ArtifactCoordinate) -> String {
        match self {
            RepositoryLayout::Default => default::to_path(coordinate),
            RepositoryLayout::Legacy => legacy::to_path(coordinate),
        }
    }

    /// Parse a relative path back into a coordinate.
    ///
    /// A [`LayoutError`] means "not an artifact reference" rather than a
    /// fault: checksum side-files, metadata and directories all fail here.
    pub fn to_coordinate(&self, path: &str) -> Result<ArtifactCoordinate, LayoutError> {
        let path = path.trim_start_matches('/');
        reject_non_artifacts(path)?;
        match self {
            RepositoryLayout::Default => default::to_coordinate(path),
            RepositoryLayout::Legacy => legacy::to_coordinate(path),
        }
    }

    pub fn metadata_path(&self, metadata: &MetadataRef) -> Result<String, LayoutError> {
        match self {
            RepositoryLayout::Default => Ok(default::metadata_path(metadata)),
            RepositoryLayout::Legacy => Err(LayoutError::Unsupported(*self)),
        }
    }

    /// Parse a `maven-metadata.xml` request path.
    pub fn to_metadata_ref(&self, path: &str) -> Result<MetadataRef, LayoutError> {
        match self {
            RepositoryLayout::Default => default::to_metadata_ref(path.trim_start_matches('/')),
            RepositoryLayout::Legacy => Err(LayoutError::Unsupported(*self)),
        }
    }
}

impl fmt::Display for RepositoryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryLayout::Default => write!(f, "default"),
            RepositoryLayout::Legacy => write!(f, "legacy"),
        }
    }
}

fn reject_non_artifacts(path: &str) -> Result<(), LayoutError> {
    if path.is_empty() || path.ends_with('/') {
        return Err(LayoutError::Directory(path.to_string()));
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if CHECKSUM_SUFFIXES.iter().any(|s| file_name.ends_with(s)) {
        return Err(LayoutError::ChecksumFile(path.to_string()));
    }
    if file_name.starts_with("maven-metadata") && file_name.ends_with(".xml") {
        return Err(LayoutError::MetadataFile(path.to_string()));
    }
    Ok(())
}

/// Split `file_name` into stem and extension, honouring double extensions.
fn split_extension<'a>(path: &str, file_name: &'a str) -> Result<(&'a str, &'a str), LayoutError> {
    for ext in DOUBLE_EXTENSIONS {
        if let Some(stem) = file_name.strip_suffix(ext).and_then(|s| s.strip_suffix('.')) {
            return Ok((stem, &file_name[stem.len() + 1..]));
        }
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok((stem, ext)),
        _ => Err(LayoutError::Directory(path.to_string())),
    }
}

fn segments<'a>(path: &'a str) -> Result<Vec<&'a str>, LayoutError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(LayoutError::Malformed {
            path:   path.to_string(),
            reason: "empty or relative path segment",
        });
    }
    Ok(segments)
}
