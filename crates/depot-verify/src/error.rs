use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("failed to read {path}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write checksum file {path}")]
    Write {
        path:   PathBuf,
        #[source]
        source: depot_fs::Error,
    },
}

pub type Result<T> = std::result::Result<T, VerificationError>;
