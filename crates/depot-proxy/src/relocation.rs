//! Relocation declarations in project descriptors.

use std::path::Path;

use depot_layout::RelocationHint;
use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

const RELOCATION_PATH: [&[u8]; 3] = [b"project", b"distributionManagement", b"relocation"];

#[derive(Debug, Error)]
pub enum RelocationError {
    #[error("failed to read descriptor {path}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Extract the relocation declared by a descriptor, if any.
///
/// Reads `project/distributionManagement/relocation/{groupId,artifactId,version}`.
/// A relocation element that names none of the three yields `None`.
pub fn parse_relocation(xml: &str) -> Result<Option<RelocationHint>, RelocationError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut hint = RelocationHint::default();
    let mut found = false;

    loop {
        let event = reader.read_event().map_err(|e| RelocationError::Xml {
            position: reader.buffer_position() as u64,
            message:  e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                stack.push(start.local_name().as_ref().to_vec());
                if in_relocation(&stack, 0) {
                    found = true;
                }
            }
            Event::Empty(empty) => {
                stack.push(empty.local_name().as_ref().to_vec());
                if in_relocation(&stack, 0) {
                    found = true;
                }
                stack.pop();
            }
            Event::Text(text) if in_relocation(&stack, 1) => {
                let value = text
                    .unescape()
                    .map_err(|e| RelocationError::Xml {
                        position: reader.buffer_position() as u64,
                        message:  e.to_string(),
                    })?
                    .trim()
                    .to_string();
                if value.is_empty() {
                    continue;
                }
                match stack.last().map(Vec::as_slice) {
                    Some(b"groupId") => hint.group = Some(value),
                    Some(b"artifactId") => hint.name = Some(value),
                    Some(b"version") => hint.version = Some(value),
                    _ => {}
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((found && !hint.is_empty()).then_some(hint))
}

/// Read and parse a descriptor file.
pub fn read_relocation(path: &Path) -> Result<Option<RelocationHint>, RelocationError> {
    let xml = std::fs::read_to_string(path).map_err(|source| RelocationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_relocation(&xml)
}

/// Whether the element stack is exactly `depth` levels below the relocation
/// element.
fn in_relocation(stack: &[Vec<u8>], depth: usize) -> bool {
    stack.len() == RELOCATION_PATH.len() + depth
        && stack
            .iter()
            .zip(RELOCATION_PATH)
            .all(|(element, expected)| element.as_slice() == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_relocation() {
        let xml = r#"<?xml version="1.0"?>
            <project xmlns="http://maven.apache.org/POM/4.0.0">
              <modelVersion>4.0.0</modelVersion>
              <groupId>old</groupId>
              <artifactId>lib</artifactId>
              <version>1.0</version>
              <distributionManagement>
                <relocation>
                  <groupId>org.new</groupId>
                  <artifactId>new-lib</artifactId>
                  <version>2.0</version>
                </relocation>
              </distributionManagement>
            </project>"#;
        let hint = parse_relocation(xml).unwrap().unwrap();
        assert_eq!(hint.group.as_deref(), Some("org.new"));
        assert_eq!(hint.name.as_deref(), Some("new-lib"));
        assert_eq!(hint.version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_partial_relocation_keeps_other_fields() {
        let xml = "<project><distributionManagement><relocation>\
                   <groupId>org.moved</groupId></relocation></distributionManagement></project>";
        let hint = parse_relocation(xml).unwrap().unwrap();
        assert_eq!(hint.group.as_deref(), Some("org.moved"));
        assert_eq!(hint.name, None);
        assert_eq!(hint.version, None);
    }

    #[test]
    fn test_no_relocation() {
        let xml = "<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version></project>";
        assert_eq!(parse_relocation(xml).unwrap(), None);

        let empty = "<project><distributionManagement><relocation/></distributionManagement></project>";
        assert_eq!(parse_relocation(empty).unwrap(), None);
    }

    #[test]
    fn test_nested_ids_are_not_relocation() {
        let xml = "<project><dependencies><dependency><groupId>dep</groupId></dependency></dependencies>\
                   <distributionManagement><site><id>x</id></site></distributionManagement></project>";
        assert_eq!(parse_relocation(xml).unwrap(), None);
    }

    #[test]
    fn test_read_relocation_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib-1.0.pom");
        std::fs::write(
            &path,
            "<project><distributionManagement><relocation><version>1.1</version></relocation>\
             </distributionManagement></project>",
        )
        .unwrap();

        let hint = read_relocation(&path).unwrap().unwrap();
        assert_eq!(hint.version.as_deref(), Some("1.1"));

        assert!(matches!(
            read_relocation(&dir.path().join("missing.pom")),
            Err(RelocationError::Io { .. })
        ));
    }

    #[test]
    fn test_malformed_descriptor() {
        assert!(matches!(
            parse_relocation("<project><distributionManagement></project>"),
            Err(RelocationError::Xml { .. })
        ));
    }
}
