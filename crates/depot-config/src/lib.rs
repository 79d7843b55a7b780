//! Repository configuration.
//!
//! A [`DepotConfig`] is read from a TOML file and overridden by `DEPOT_`
//! environment variables, where `__` separates nested keys
//! (`DEPOT_PROXY__DEFAULT_TIMEOUT_SECS=10`).
//!
//! ```toml
//! [proxy]
//! default_timeout_secs = 60
//!
//! [[repositories]]
//! id = "internal"
//! root = "/srv/depot/internal"
//!
//! [[repositories.remotes]]
//! id = "central"
//! url = "https://repo.maven.apache.org/maven2/"
//! priority = 0
//!
//! [repositories.remotes.policies]
//! snapshots = "hourly"
//! checksum = "fail"
//! ```

mod error;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use depot_layout::RepositoryLayout;
use depot_proxy::policy::{ChecksumPolicy, Policy, PostFetchPolicy, PreFetchPolicy};
use depot_proxy::{ManagedRepository, NegativeFetchCache, ProxyOptions, RemoteRepositoryDescriptor};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use url::Url;

pub use error::ConfigError;

const ENV_PREFIX: &str = "DEPOT_";

/// `(id, settings)` for every policy the proxy knows. Used only to warn
/// early; the policies themselves deny unknown settings at request time.
fn policy_options() -> Vec<(&'static str, &'static [&'static str])> {
    let pre = PreFetchPolicy::all(Arc::new(NegativeFetchCache::new()));
    let post = PostFetchPolicy::all();
    pre.iter()
        .map(|p| (p.id(), p.options()))
        .chain(post.iter().map(|p| (p.id(), p.options())))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepotConfig {
    pub proxy:        ProxyConfig,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub default_timeout_secs: u64,
    /// Relative to each repository root.
    pub staging_dir:          PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let defaults = ProxyOptions::default();
        Self {
            default_timeout_secs: defaults.default_timeout.as_secs(),
            staging_dir:          defaults.staging_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub id:                String,
    pub root:              PathBuf,
    #[serde(default)]
    pub layout:            RepositoryLayout,
    #[serde(default)]
    pub blacklist:         Vec<String>,
    #[serde(default = "default_true")]
    pub include_snapshots: bool,
    #[serde(default)]
    pub remotes:           Vec<RemoteConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub id:           String,
    pub url:          String,
    #[serde(default)]
    pub layout:       RepositoryLayout,
    #[serde(default)]
    pub priority:     u32,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub whitelist:    Vec<String>,
    #[serde(default)]
    pub blacklist:    Vec<String>,
    /// Policy id to setting; policies left out use their default.
    #[serde(default)]
    pub policies:     BTreeMap<String, String>,
}

fn default_true() -> bool { true }

impl DepotConfig {
    /// Load `path` (if it exists) merged with `DEPOT_` environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Toml::file(path)).merge(Self::env()))
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    fn env() -> Env { Env::prefixed(ENV_PREFIX).split("__") }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ids, URLs, patterns and policy names.
    ///
    /// Unknown policy *settings* are only warned about: a remote configured
    /// with one is never contacted, which is the documented runtime behaviour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let known = policy_options();
        let mut repository_ids = HashSet::new();
        for repository in &self.repositories {
            if repository.id.is_empty() {
                return Err(ConfigError::EmptyId("repository"));
            }
            if !repository_ids.insert(repository.id.as_str()) {
                return Err(ConfigError::DuplicateRepository(repository.id.clone()));
            }
            check_patterns(&repository.blacklist)?;

            let mut remote_ids = HashSet::new();
            for remote in &repository.remotes {
                if remote.id.is_empty() {
                    return Err(ConfigError::EmptyId("remote"));
                }
                if !remote_ids.insert(remote.id.as_str()) {
                    return Err(ConfigError::DuplicateRemote {
                        repository: repository.id.clone(),
                        remote:     remote.id.clone(),
                    });
                }
                remote.base_url()?;
                check_patterns(&remote.whitelist)?;
                check_patterns(&remote.blacklist)?;

                for (policy, setting) in &remote.policies {
                    let Some((_, options)) = known.iter().find(|(id, _)| *id == policy.as_str()) else {
                        return Err(ConfigError::UnknownPolicy {
                            remote: remote.id.clone(),
                            policy: policy.clone(),
                        });
                    };
                    if !options.contains(&setting.as_str()) {
                        tracing::warn!(
                            repository = %repository.id,
                            remote = %remote.id,
                            %policy,
                            %setting,
                            ?options,
                            "unknown policy setting; this remote will never be contacted"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn proxy_options(&self) -> ProxyOptions {
        ProxyOptions {
            default_timeout: Duration::from_secs(self.proxy.default_timeout_secs),
            staging_dir:     self.proxy.staging_dir.clone(),
        }
    }

    /// Build the proxy's repository types.
    pub fn into_parts(self) -> Result<Vec<(ManagedRepository, Vec<RemoteRepositoryDescriptor>)>, ConfigError> {
        self.repositories
            .into_iter()
            .map(RepositoryConfig::into_parts)
            .collect()
    }
}

impl RepositoryConfig {
    fn into_parts(self) -> Result<(ManagedRepository, Vec<RemoteRepositoryDescriptor>), ConfigError> {
        let remotes = self
            .remotes
            .into_iter()
            .map(RemoteConfig::into_descriptor)
            .collect::<Result<_, _>>()?;
        let managed = ManagedRepository {
            id:                self.id,
            root:              self.root,
            layout:            self.layout,
            blacklist:         self.blacklist,
            include_snapshots: self.include_snapshots,
        };
        Ok((managed, remotes))
    }
}

impl RemoteConfig {
    fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            remote: self.id.clone(),
            url: self.url.clone(),
            source,
        })
    }

    fn into_descriptor(self) -> Result<RemoteRepositoryDescriptor, ConfigError> {
        let mut descriptor = RemoteRepositoryDescriptor::new(self.id.clone(), self.base_url()?)
            .layout(self.layout)
            .priority(self.priority);
        if let Some(secs) = self.timeout_secs {
            descriptor = descriptor.timeout(Duration::from_secs(secs));
        }
        descriptor.whitelist = self.whitelist;
        descriptor.blacklist = self.blacklist;

        for (policy, setting) in self.policies {
            descriptor = if policy == ChecksumPolicy::ID {
                descriptor.post_fetch(policy, setting)
            } else {
                descriptor.pre_fetch(policy, setting)
            };
        }
        Ok(descriptor)
    }
}

fn check_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        glob::Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DepotConfig::from_toml_str("").unwrap();
        assert_eq!(config.proxy.default_timeout_secs, 60);
        assert_eq!(config.proxy.staging_dir, Path::new(".depot/staging"));
        assert!(config.repositories.is_empty());
        assert_eq!(config.proxy_options().default_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_policy_ids_cover_every_policy() {
        let ids: Vec<_> = policy_options().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, ["releases", "snapshots", "cache-failures", "checksum"]);
    }
}
