//! Pre-fetch and post-fetch policies.
//!
//! A policy is a named decision with a closed vocabulary of settings. Each
//! remote repository carries an ordered list of `(policy, setting)` pairs;
//! pre-fetch policies decide whether the remote is contacted at all and
//! post-fetch policies decide whether what it returned is kept.

mod checksum;
mod freshness;
mod negative_cache;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::checksum::ChecksumPolicy;
pub use self::freshness::FreshnessPolicy;
pub use self::negative_cache::NegativeCachePolicy;

use crate::NegativeFetchCache;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{setting:?} is not a valid setting for policy {policy}")]
    Configuration { policy: &'static str, setting: String },

    #[error("digest computation failed")]
    Digest(#[from] depot_verify::VerificationError),
}

/// A named decision unit with a closed set of settings.
pub trait Policy {
    fn id(&self) -> &'static str;

    fn options(&self) -> &'static [&'static str];

    fn default_option(&self) -> &'static str;

    /// Evaluate the policy for one request.
    ///
    /// `local_file` is the managed copy for pre-fetch policies and the freshly
    /// fetched file for post-fetch policies. `Ok(false)` means "denied",
    /// `Err` means the policy could not decide.
    fn evaluate(&self, setting: &str, context: &PolicyContext, local_file: &Path) -> Result<bool, PolicyError>;

    fn validate(&self, setting: &str) -> Result<(), PolicyError> {
        if self.options().contains(&setting) {
            Ok(())
        } else {
            Err(PolicyError::Configuration {
                policy:  self.id(),
                setting: setting.to_string(),
            })
        }
    }

    /// [`Policy::evaluate`] with every error logged and turned into a denial.
    fn apply(&self, setting: &str, context: &PolicyContext, local_file: &Path) -> bool {
        match self.evaluate(setting, context, local_file) {
            Ok(permitted) => permitted,
            Err(e @ PolicyError::Configuration { .. }) => {
                tracing::error!(policy = self.id(), error = %e, "policy misconfigured; denying");
                false
            }
            Err(e) => {
                tracing::warn!(
                    policy = self.id(),
                    file = %local_file.display(),
                    error = %e,
                    source = ?std::error::Error::source(&e),
                    "policy failed; denying"
                );
                false
            }
        }
    }
}

/// Request-scoped values handed to policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyContext {
    values: HashMap<String, String>,
}

impl PolicyContext {
    /// Full remote URL of the transfer.
    pub const URL: &'static str = "url";
    /// Version of the requested artifact, absent for project metadata.
    pub const VERSION: &'static str = "version";
    /// Artifact kind, or `metadata`.
    pub const FILETYPE: &'static str = "filetype";
    /// Id of the remote repository being consulted.
    pub const REMOTE: &'static str = "remote";

    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> { self.values.get(key).map(String::as_str) }
}

/// A policy id paired with the setting a remote selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySetting {
    pub policy:  String,
    pub setting: String,
}

impl PolicySetting {
    pub fn new(policy: impl Into<String>, setting: impl Into<String>) -> Self {
        Self {
            policy:  policy.into(),
            setting: setting.into(),
        }
    }
}

/// Policies consulted before contacting a remote.
#[derive(Debug, Clone)]
pub enum PreFetchPolicy {
    Freshness(FreshnessPolicy),
    NegativeCache(NegativeCachePolicy),
}

impl PreFetchPolicy {
    /// Every pre-fetch policy, with the negative-cache policy consulting `cache`.
    pub fn all(cache: Arc<NegativeFetchCache>) -> [PreFetchPolicy; 3] {
        [
            PreFetchPolicy::Freshness(FreshnessPolicy::releases()),
            PreFetchPolicy::Freshness(FreshnessPolicy::snapshots()),
            PreFetchPolicy::NegativeCache(NegativeCachePolicy::new(cache)),
        ]
    }
}

impl Policy for PreFetchPolicy {
    fn id(&self) -> &'static str {
        match self {
            PreFetchPolicy::Freshness(p) => p.id(),
            PreFetchPolicy::NegativeCache(p) => p.id(),
        }
    }

    fn options(&self) -> &'static [&'static str] {
        match self {
            PreFetchPolicy::Freshness(p) => p.options(),
            PreFetchPolicy::NegativeCache(p) => p.options(),
        }
    }

    fn default_option(&self) -> &'static str {
        match self {
            PreFetchPolicy::Freshness(p) => p.default_option(),
            PreFetchPolicy::NegativeCache(p) => p.default_option(),
        }
    }

    fn evaluate(&self, setting: &str, context: &PolicyContext, local_file: &Path) -> Result<bool, PolicyError> {
        match self {
            PreFetchPolicy::Freshness(p) => p.evaluate(setting, context, local_file),
            PreFetchPolicy::NegativeCache(p) => p.evaluate(setting, context, local_file),
        }
    }
}

/// Policies consulted after a successful transfer.
#[derive(Debug, Clone)]
pub enum PostFetchPolicy {
    Checksum(ChecksumPolicy),
}

impl PostFetchPolicy {
    pub fn all() -> [PostFetchPolicy; 1] { [PostFetchPolicy::Checksum(ChecksumPolicy)] }
}

impl Policy for PostFetchPolicy {
    fn id(&self) -> &'static str {
        match self {
            PostFetchPolicy::Checksum(p) => p.id(),
        }
    }

    fn options(&self) -> &'static [&'static str] {
        match self {
            PostFetchPolicy::Checksum(p) => p.options(),
        }
    }

    fn default_option(&self) -> &'static str {
        match self {
            PostFetchPolicy::Checksum(p) => p.default_option(),
        }
    }

    fn evaluate(&self, setting: &str, context: &PolicyContext, local_file: &Path) -> Result<bool, PolicyError> {
        match self {
            PostFetchPolicy::Checksum(p) => p.evaluate(setting, context, local_file),
        }
    }
}
