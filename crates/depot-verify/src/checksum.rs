use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use depot_fs::{AtomicWriteOptions, atomic_write};

use crate::{DigestKind, Hasher, Result, VerificationError};

const BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of checking one side-file against its main file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No side-file for this digest kind.
    Absent,
    Valid,
    /// The side-file exists but is unparseable or names another digest.
    Invalid { expected: Option<String>, actual: String },
}

/// Path of the `kind` side-file belonging to `main` (`<main>.<ext>`).
pub fn side_file_path(main: &Path, kind: DigestKind) -> PathBuf {
    let mut name = OsString::from(main.as_os_str());
    name.push(".");
    name.push(kind.extension());
    PathBuf::from(name)
}

/// Stream `path` through a hasher of the given kind and return lowercase hex.
pub fn digest_file(path: &Path, kind: DigestKind) -> Result<String> {
    let io_err = |source| VerificationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = kind.hasher();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Extract the digest from the contents of a checksum side-file.
///
/// Accepts the bare digest, `digest  filename`, `filename digest` and the BSD
/// `MD5 (filename) = digest` forms. Returns `None` when no token of the right
/// length and alphabet is present.
pub fn parse_checksum(contents: &str, kind: DigestKind) -> Option<String> {
    contents
        .split(|c: char| c.is_whitespace() || c == '=')
        .find(|token| token.len() == kind.hex_len() && token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(str::to_ascii_lowercase)
}

/// Check the `kind` side-file of `main`, if there is one.
pub fn verify_file(main: &Path, kind: DigestKind) -> Result<Verification> {
    let side = side_file_path(main, kind);
    if !side.is_file() {
        return Ok(Verification::Absent);
    }

    let contents = std::fs::read(&side).map_err(|source| VerificationError::Io {
        path: side.clone(),
        source,
    })?;
    let expected = parse_checksum(&String::from_utf8_lossy(&contents), kind);
    let actual = digest_file(main, kind)?;

    Ok(match expected {
        Some(expected) if expected == actual => Verification::Valid,
        expected => Verification::Invalid { expected, actual },
    })
}

/// Compute the `kind` digest of `main` and (re)write its side-file.
///
/// The written content depends only on the main file's bytes and name, so
/// repeated calls produce identical side-files.
pub fn write_side_file(main: &Path, kind: DigestKind) -> Result<String> {
    let digest = digest_file(main, kind)?;
    let file_name = main
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let side = side_file_path(main, kind);
    let contents = format!("{digest}  {file_name}\n");
    atomic_write(&side, contents.as_bytes(), AtomicWriteOptions::new()).map_err(|source| {
        VerificationError::Write {
            path: side.clone(),
            source,
        }
    })?;
    Ok(digest)
}
