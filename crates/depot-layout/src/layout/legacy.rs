use crate::ArtifactCoordinate;
use crate::coordinate::extension_for_kind;
use crate::layout::{LayoutError, segments};

/// Kinds whose legacy file name carries a fixed classifier suffix.
fn implied_classifier(kind: &str) -> Option<&'static str> {
    match kind {
        "java-source" => Some("sources"),
        "javadoc" => Some("javadoc"),
        "test-jar" => Some("tests"),
        "ejb-client" => Some("client"),
        _ => None,
    }
}

pub(super) fn to_path(c: &ArtifactCoordinate) -> String {
    let mut path = format!("{}/{}s/{}-{}", c.group(), c.kind(), c.name(), c.version());
    if let Some(classifier) = implied_classifier(c.kind()).or(c.classifier()) {
        path.push('-');
        path.push_str(classifier);
    }
    path.push('.');
    path.push_str(c.extension());
    path
}

pub(super) fn to_coordinate(path: &str) -> Result<ArtifactCoordinate, LayoutError> {
    let segments = segments(path)?;
    let [group, kind_dir, file_name] = segments.as_slice() else {
        return Err(LayoutError::SegmentCount {
            path:     path.to_string(),
            expected: "exactly 3",
            found:    segments.len(),
        });
    };

    let kind = kind_dir
        .strip_suffix('s')
        .filter(|k| !k.is_empty())
        .ok_or_else(|| malformed(path, "type directory must end in 's'"))?;
    let stem = file_name
        .strip_suffix(extension_for_kind(kind))
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(|| malformed(path, "extension does not match the type directory"))?;

    let classifier = implied_classifier(kind);
    let stem = match classifier {
        Some(classifier) => stem
            .strip_suffix(classifier)
            .and_then(|s| s.strip_suffix('-'))
            .ok_or_else(|| malformed(path, "missing classifier suffix for the type"))?,
        None => stem,
    };

    let (name, version) = split_name_version(stem).ok_or_else(|| malformed(path, "no version in file name"))?;
    let coordinate = ArtifactCoordinate::new(*group, name, version, kind);
    Ok(match classifier {
        Some(classifier) => coordinate.with_classifier(classifier),
        None => coordinate,
    })
}

/// The version starts at the first `-` followed by a digit.
fn split_name_version(stem: &str) -> Option<(&str, &str)> {
    stem.char_indices()
        .zip(stem.chars().skip(1))
        .find(|((_, c), next)| *c == '-' && next.is_ascii_digit())
        .map(|((i, _), _)| (&stem[..i], &stem[i + 1..]))
        .filter(|(name, _)| !name.is_empty())
}

fn malformed(path: &str, reason: &'static str) -> LayoutError {
    LayoutError::Malformed {
        path: path.to_string(),
        reason,
    }
}
