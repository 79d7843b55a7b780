//! Artifact coordinates and repository path layouts.
//!
//! A coordinate (`group:name:version[:classifier]:kind`) names one file. A
//! [`RepositoryLayout`] turns a coordinate into a repository-relative path
//! and back:
//!
//! ```
//! use depot_layout::{ArtifactCoordinate, RepositoryLayout};
//!
//! let jar = ArtifactCoordinate::new("org.example", "lib", "1.0", "jar");
//! let path = RepositoryLayout::Default.to_path(&jar);
//! assert_eq!(path, "org/example/lib/1.0/lib-1.0.jar");
//! assert_eq!(RepositoryLayout::Default.to_coordinate(&path).unwrap(), jar);
//! ```
//!
//! For every canonical coordinate (one whose kind is the kind its extension
//! and classifier imply under that layout) `to_coordinate(to_path(c)) == c`.

pub use self::coordinate::{
    ArtifactCoordinate, DESCRIPTOR_KIND, MetadataRef, RelocationHint, canonical_kind, extension_for_kind,
};
pub use self::layout::{LayoutError, METADATA_FILE, RepositoryLayout};
pub use self::version::{VersionClass, base_version, is_snapshot};

mod coordinate;
mod layout;
mod version;
