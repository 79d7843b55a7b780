use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] Box<figment::Error>),

    #[error("{0} id must not be empty")]
    EmptyId(&'static str),

    #[error("repository {0} is configured twice")]
    DuplicateRepository(String),

    #[error("repository {repository} lists remote {remote} twice")]
    DuplicateRemote { repository: String, remote: String },

    #[error("remote {remote} has an invalid url {url:?}")]
    InvalidUrl {
        remote: String,
        url:    String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid path pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source:  glob::PatternError,
    },

    #[error("remote {remote} configures unknown policy {policy:?}")]
    UnknownPolicy { remote: String, policy: String },
}
