//! Error types for depot-fetch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to write {path}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, FetchError>;
