use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {path}")]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create staging directory under {path}")]
    Staging {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {from} into place at {to}")]
    Commit {
        from:   PathBuf,
        to:     PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} has no parent directory")]
    NoParent { path: PathBuf },

    #[error("staged path escapes the workspace: {0}")]
    InvalidRelative(String),
}

pub type Result<T> = std::result::Result<T, Error>;
