//! Atomic filesystem primitives for managed repository trees.
//!
//! - [`atomic_write`] replaces a single file through a temporary sibling.
//! - [`Workspace`] stages a group of files (an artifact and its checksum
//!   side-files) and moves them into place together on commit.
//!
//! Both keep their temporary data on the destination filesystem so the final
//! step is always a rename.

mod atomic_write;
mod error;
mod workspace;

pub use atomic_write::{AtomicWriteOptions, atomic_write};
pub use error::{Error, Result};
pub use workspace::{CommitEntry, CommitMode, CommitOutcome, CommitReport, Workspace};
