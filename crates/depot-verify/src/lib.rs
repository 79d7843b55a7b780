//! Digest computation and checksum side-file handling for proxied artifacts.
//!
//! Every artifact in a managed repository may carry a `.sha1` and an `.md5`
//! side-file. This crate computes those digests incrementally, parses the
//! side-file formats found on real remotes and rewrites side-files
//! atomically. It makes no decision about what a mismatch means; that is the
//! checksum policy's job.

pub use self::checksum::{Verification, digest_file, parse_checksum, side_file_path, verify_file, write_side_file};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{AnyHasher, DigestKind, Hasher, Md5Hasher, Sha1Hasher};

mod checksum;
mod error;
mod hasher;
