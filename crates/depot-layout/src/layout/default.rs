use crate::coordinate::canonical_kind;
use crate::layout::{LayoutError, METADATA_FILE, segments, split_extension};
use crate::version::{SNAPSHOT, TIMESTAMP_PREFIX, is_snapshot};
use crate::{ArtifactCoordinate, MetadataRef};

pub(super) fn to_path(c: &ArtifactCoordinate) -> String {
    let mut path = group_dir(c.group());
    path.push('/');
    path.push_str(c.name());
    path.push('/');
    path.push_str(&c.base_version());
    path.push('/');
    path.push_str(c.name());
    path.push('-');
    path.push_str(c.version());
    if let Some(classifier) = c.classifier() {
        path.push('-');
        path.push_str(classifier);
    }
    path.push('.');
    path.push_str(c.extension());
    path
}

pub(super) fn to_coordinate(path: &str) -> Result<ArtifactCoordinate, LayoutError> {
    let segments = segments(path)?;
    let [group @ .., name, base, file_name] = segments.as_slice() else {
        return Err(segment_count(path, segments.len()));
    };
    if group.is_empty() {
        return Err(segment_count(path, segments.len()));
    }

    let (stem, extension) = split_extension(path, file_name)?;
    let rest = stem
        .strip_prefix(*name)
        .and_then(|s| s.strip_prefix('-'))
        .ok_or_else(|| malformed(path, "file name does not start with the artifact name"))?;

    let (version, remainder) = split_version(rest, base).ok_or_else(|| {
        malformed(path, "file name does not carry the directory version")
    })?;

    let classifier = match remainder {
        "" => None,
        r => match r.strip_prefix('-') {
            Some(classifier) if !classifier.is_empty() => Some(classifier),
            _ => return Err(malformed(path, "unexpected text after the version")),
        },
    };

    let kind = canonical_kind(extension, classifier);
    let coordinate = ArtifactCoordinate::new(group.join("."), *name, version, kind);
    Ok(match classifier {
        Some(classifier) => coordinate.with_classifier(classifier),
        None => coordinate,
    })
}

pub(super) fn metadata_path(m: &MetadataRef) -> String {
    let mut path = group_dir(&m.group);
    path.push('/');
    path.push_str(&m.name);
    if let Some(version) = &m.version {
        path.push('/');
        path.push_str(version);
    }
    path.push('/');
    path.push_str(METADATA_FILE);
    path
}

pub(super) fn to_metadata_ref(path: &str) -> Result<MetadataRef, LayoutError> {
    let segments = segments(path)?;
    let [dirs @ .., file_name] = segments.as_slice() else {
        return Err(segment_count(path, segments.len()));
    };
    if *file_name != METADATA_FILE {
        return Err(malformed(path, "not a metadata file"));
    }

    match dirs {
        [group @ .., name, version] if !group.is_empty() && looks_like_version(version) => {
            Ok(MetadataRef::versioned(group.join("."), *name, *version))
        }
        [group @ .., name] if !group.is_empty() => Ok(MetadataRef::project(group.join("."), *name)),
        _ => Err(segment_count(path, segments.len())),
    }
}

/// Find `base` (or, for snapshots, a timestamped build of it) at the start
/// of `rest`; returns the version and whatever follows it.
fn split_version<'a>(rest: &'a str, base: &str) -> Option<(String, &'a str)> {
    if let Some(remainder) = rest.strip_prefix(base)
        && (remainder.is_empty() || remainder.starts_with('-'))
    {
        return Some((base.to_string(), remainder));
    }

    let prefix = base.strip_suffix(SNAPSHOT)?;
    let stamped = rest.strip_prefix(prefix)?;
    let stamp = TIMESTAMP_PREFIX.find(stamped)?;
    let remainder = &stamped[stamp.end()..];
    Some((format!("{prefix}{}", stamp.as_str()), remainder))
}

fn looks_like_version(segment: &str) -> bool {
    segment.starts_with(|c: char| c.is_ascii_digit()) || is_snapshot(segment)
}

fn group_dir(group: &str) -> String { group.replace('.', "/") }

fn segment_count(path: &str, found: usize) -> LayoutError {
    LayoutError::SegmentCount {
        path: path.to_string(),
        expected: "at least 4",
        found,
    }
}

fn malformed(path: &str, reason: &'static str) -> LayoutError {
    LayoutError::Malformed {
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use crate::{ArtifactCoordinate, LayoutError, MetadataRef, RepositoryLayout};

    const LAYOUT: RepositoryLayout = RepositoryLayout::Default;

    #[test]
    fn test_to_path() {
        let jar = ArtifactCoordinate::new("org.apache.maven", "maven-core", "3.9.6", "jar");
        assert_eq!(
            LAYOUT.to_path(&jar),
            "org/apache/maven/maven-core/3.9.6/maven-core-3.9.6.jar"
        );

        let sources = ArtifactCoordinate::new("org.example", "lib", "1.0", "java-source").with_classifier("sources");
        assert_eq!(LAYOUT.to_path(&sources), "org/example/lib/1.0/lib-1.0-sources.jar");

        let plugin = ArtifactCoordinate::new("org.example", "p", "1.0", "maven-plugin");
        assert_eq!(LAYOUT.to_path(&plugin), "org/example/p/1.0/p-1.0.jar");
    }

    #[test]
    fn test_timestamped_snapshot_lives_in_base_directory() {
        let c = ArtifactCoordinate::new("org.example", "lib", "1.0-20240101.120000-3", "jar");
        let path = LAYOUT.to_path(&c);
        assert_eq!(path, "org/example/lib/1.0-SNAPSHOT/lib-1.0-20240101.120000-3.jar");
        assert_eq!(LAYOUT.to_coordinate(&path).unwrap(), c);
    }

    #[test]
    fn test_to_coordinate() {
        let c = LAYOUT
            .to_coordinate("/org/example/lib/1.0-SNAPSHOT/lib-1.0-SNAPSHOT-tests.jar")
            .unwrap();
        assert_eq!(c.group(), "org.example");
        assert_eq!(c.name(), "lib");
        assert_eq!(c.version(), "1.0-SNAPSHOT");
        assert_eq!(c.classifier(), Some("tests"));
        assert_eq!(c.kind(), "test-jar");

        let tgz = LAYOUT.to_coordinate("org/example/dist/2.1/dist-2.1-bin.tar.gz").unwrap();
        assert_eq!(tgz.kind(), "distribution-tgz");
        assert_eq!(tgz.classifier(), Some("bin"));
    }

    #[test]
    fn test_to_coordinate_rejects_malformed() {
        assert!(matches!(
            LAYOUT.to_coordinate("lib/1.0/lib-1.0.jar"),
            Err(LayoutError::SegmentCount { .. })
        ));
        assert!(matches!(
            LAYOUT.to_coordinate("org/lib/1.0/other-1.0.jar"),
            Err(LayoutError::Malformed { .. })
        ));
        assert!(matches!(
            LAYOUT.to_coordinate("org/lib/1.0/lib-2.0.jar"),
            Err(LayoutError::Malformed { .. })
        ));
        assert!(matches!(
            LAYOUT.to_coordinate("org/lib/1.0/lib-1.0x.jar"),
            Err(LayoutError::Malformed { .. })
        ));
        assert!(matches!(
            LAYOUT.to_coordinate("org//lib/1.0/lib-1.0.jar"),
            Err(LayoutError::Malformed { .. })
        ));
    }

    #[test]
    fn test_metadata_paths() {
        let project = MetadataRef::project("org.example", "lib");
        let versioned = MetadataRef::versioned("org.example", "lib", "1.0-SNAPSHOT");
        assert_eq!(LAYOUT.metadata_path(&project).unwrap(), "org/example/lib/maven-metadata.xml");
        assert_eq!(
            LAYOUT.metadata_path(&versioned).unwrap(),
            "org/example/lib/1.0-SNAPSHOT/maven-metadata.xml"
        );
        assert_eq!(
            LAYOUT.to_metadata_ref("org/example/lib/maven-metadata.xml").unwrap(),
            project
        );
        assert_eq!(
            LAYOUT
                .to_metadata_ref("org/example/lib/1.0-SNAPSHOT/maven-metadata.xml")
                .unwrap(),
            versioned
        );
        assert!(LAYOUT.to_metadata_ref("lib/maven-metadata.xml").is_err());
    }
}
