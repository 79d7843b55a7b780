use thiserror::Error;

/// Configuration faults detected when registering repositories.
///
/// Per-remote failures during resolution are never reported through this
/// type; they are absorbed by the orchestrator and logged.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("unknown managed repository: {0}")]
    UnknownRepository(String),

    #[error("managed repository {0} is already registered")]
    DuplicateRepository(String),

    #[error("remote {remote} enables unknown {stage} policy {policy:?}")]
    UnknownPolicy {
        remote: String,
        stage:  &'static str,
        policy: String,
    },

    #[error("invalid path pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source:  glob::PatternError,
    },
}

pub type Result<T> = std::result::Result<T, ProxyError>;
