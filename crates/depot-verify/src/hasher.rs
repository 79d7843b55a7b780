use std::fmt;

use digest::Digest;

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

pub struct Sha1Hasher(sha1::Sha1);

impl Hasher for Sha1Hasher {
    fn update(&mut self, data: &[u8]) { Digest::update(&mut self.0, data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Sha1Hasher {
    fn default() -> Self { Self::new() }
}

impl Sha1Hasher {
    pub fn new() -> Self { Self(sha1::Sha1::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha1::Sha1::digest(data).to_vec() }
}

pub struct Md5Hasher(md5::Md5);

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) { Digest::update(&mut self.0, data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Md5Hasher {
    fn default() -> Self { Self::new() }
}

impl Md5Hasher {
    pub fn new() -> Self { Self(md5::Md5::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { md5::Md5::digest(data).to_vec() }
}

/// The digest kinds a managed repository keeps side-files for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    Sha1,
    Md5,
}

impl DigestKind {
    /// Every supported kind, in the order side-files are checked and written.
    pub const ALL: [DigestKind; 2] = [DigestKind::Sha1, DigestKind::Md5];

    /// Side-file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            DigestKind::Sha1 => "sha1",
            DigestKind::Md5 => "md5",
        }
    }

    /// Length of the hex-encoded digest.
    pub fn hex_len(&self) -> usize {
        match self {
            DigestKind::Sha1 => 40,
            DigestKind::Md5 => 32,
        }
    }

    pub fn hasher(&self) -> AnyHasher {
        match self {
            DigestKind::Sha1 => AnyHasher::Sha1(Sha1Hasher::new()),
            DigestKind::Md5 => AnyHasher::Md5(Md5Hasher::new()),
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestKind::Sha1 => write!(f, "SHA-1"),
            DigestKind::Md5 => write!(f, "MD5"),
        }
    }
}

/// A hasher for whichever [`DigestKind`] was picked at runtime.
pub enum AnyHasher {
    Sha1(Sha1Hasher),
    Md5(Md5Hasher),
}

impl Hasher for AnyHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            AnyHasher::Sha1(h) => h.update(data),
            AnyHasher::Md5(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            AnyHasher::Sha1(h) => h.finalize(),
            AnyHasher::Md5(h) => h.finalize(),
        }
    }
}
