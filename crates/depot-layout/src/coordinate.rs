use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::{VersionClass, base_version};

/// Kind of a project descriptor.
pub const DESCRIPTOR_KIND: &str = "pom";

/// Identifies one file in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    group:      String,
    name:       String,
    version:    String,
    classifier: Option<String>,
    kind:       String,
}

impl ArtifactCoordinate {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group:      group.into(),
            name:       name.into(),
            version:    version.into(),
            classifier: None,
            kind:       kind.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = (!classifier.is_empty()).then_some(classifier);
        self
    }

    pub fn group(&self) -> &str { &self.group }

    pub fn name(&self) -> &str { &self.name }

    pub fn version(&self) -> &str { &self.version }

    pub fn classifier(&self) -> Option<&str> { self.classifier.as_deref() }

    pub fn kind(&self) -> &str { &self.kind }

    pub fn base_version(&self) -> Cow<'_, str> { base_version(&self.version) }

    pub fn version_class(&self) -> VersionClass { VersionClass::of(&self.version) }

    pub fn is_snapshot(&self) -> bool { self.version_class() == VersionClass::PreRelease }

    pub fn is_descriptor(&self) -> bool { self.kind == DESCRIPTOR_KIND && self.classifier.is_none() }

    /// The project descriptor that describes this artifact.
    pub fn descriptor(&self) -> Self {
        Self {
            group:      self.group.clone(),
            name:       self.name.clone(),
            version:    self.version.clone(),
            classifier: None,
            kind:       DESCRIPTOR_KIND.to_string(),
        }
    }

    /// Apply a relocation; classifier and kind are preserved.
    pub fn relocated(&self, hint: &RelocationHint) -> Self {
        Self {
            group:      hint.group.clone().unwrap_or_else(|| self.group.clone()),
            name:       hint.name.clone().unwrap_or_else(|| self.name.clone()),
            version:    hint.version.clone().unwrap_or_else(|| self.version.clone()),
            classifier: self.classifier.clone(),
            kind:       self.kind.clone(),
        }
    }

    /// The file extension implied by this coordinate's kind.
    pub fn extension(&self) -> &str { extension_for_kind(&self.kind) }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.kind)
    }
}

/// A redirection from one coordinate to another declared in a descriptor.
///
/// Fields left `None` keep the original coordinate's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationHint {
    pub group:   Option<String>,
    pub name:    Option<String>,
    pub version: Option<String>,
}

impl RelocationHint {
    pub fn is_empty(&self) -> bool { self.group.is_none() && self.name.is_none() && self.version.is_none() }
}

/// Project-level (`version == None`) or version-level repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataRef {
    pub group:   String,
    pub name:    String,
    pub version: Option<String>,
}

impl MetadataRef {
    pub fn project(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group:   group.into(),
            name:    name.into(),
            version: None,
        }
    }

    pub fn versioned(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group:   group.into(),
            name:    name.into(),
            version: Some(version.into()),
        }
    }
}

impl fmt::Display for MetadataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

pub fn extension_for_kind(kind: &str) -> &str {
    match kind {
        "maven-plugin" | "ejb" | "ejb-client" | "java-source" | "javadoc" | "test-jar" => "jar",
        "distribution-tgz" => "tar.gz",
        "distribution-bzip2" => "tar.bz2",
        "distribution-zip" => "zip",
        other => other,
    }
}

/// The kind a default-layout file with this extension and classifier has.
pub fn canonical_kind(extension: &str, classifier: Option<&str>) -> String {
    match (extension, classifier) {
        ("jar", Some("sources")) => "java-source",
        ("jar", Some("javadoc")) => "javadoc",
        ("jar", Some("tests")) => "test-jar",
        ("tar.gz", _) => "distribution-tgz",
        ("tar.bz2", _) => "distribution-bzip2",
        (other, _) => other,
    }
    .to_string()
}
