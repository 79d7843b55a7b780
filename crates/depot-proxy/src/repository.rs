use std::path::PathBuf;
use std::time::Duration;

use depot_layout::RepositoryLayout;
use glob::Pattern;
use url::Url;

use crate::policy::PolicySetting;
use crate::{ProxyError, Result};

/// A locally authoritative repository written to by the orchestrator.
#[derive(Debug, Clone)]
pub struct ManagedRepository {
    pub id:                String,
    pub root:              PathBuf,
    pub layout:            RepositoryLayout,
    /// Glob patterns over request paths that are never proxied.
    pub blacklist:         Vec<String>,
    pub include_snapshots: bool,
}

impl ManagedRepository {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id:                id.into(),
            root:              root.into(),
            layout:            RepositoryLayout::Default,
            blacklist:         Vec::new(),
            include_snapshots: true,
        }
    }

    pub fn layout(mut self, layout: RepositoryLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn blacklist(mut self, pattern: impl Into<String>) -> Self {
        self.blacklist.push(pattern.into());
        self
    }

    pub fn include_snapshots(mut self, include: bool) -> Self {
        self.include_snapshots = include;
        self
    }
}

/// An upstream repository consulted to populate a managed one.
#[derive(Debug, Clone)]
pub struct RemoteRepositoryDescriptor {
    pub id:         String,
    pub base_url:   Url,
    pub layout:     RepositoryLayout,
    /// Lower is tried first; ties keep their configured order.
    pub priority:   u32,
    /// Overrides the orchestrator's transfer timeout.
    pub timeout:    Option<Duration>,
    /// When non-empty, only matching request paths are proxied.
    pub whitelist:  Vec<String>,
    pub blacklist:  Vec<String>,
    pub pre_fetch:  Vec<PolicySetting>,
    pub post_fetch: Vec<PolicySetting>,
}

impl RemoteRepositoryDescriptor {
    pub fn new(id: impl Into<String>, base_url: Url) -> Self {
        Self {
            id: id.into(),
            base_url,
            layout: RepositoryLayout::Default,
            priority: 0,
            timeout: None,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            pre_fetch: Vec::new(),
            post_fetch: Vec::new(),
        }
    }

    pub fn layout(mut self, layout: RepositoryLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn whitelist(mut self, pattern: impl Into<String>) -> Self {
        self.whitelist.push(pattern.into());
        self
    }

    pub fn blacklist(mut self, pattern: impl Into<String>) -> Self {
        self.blacklist.push(pattern.into());
        self
    }

    pub fn pre_fetch(mut self, policy: impl Into<String>, setting: impl Into<String>) -> Self {
        self.pre_fetch.push(PolicySetting::new(policy, setting));
        self
    }

    pub fn post_fetch(mut self, policy: impl Into<String>, setting: impl Into<String>) -> Self {
        self.post_fetch.push(PolicySetting::new(policy, setting));
        self
    }

    /// Absolute URL of a path relative to this remote.
    pub fn url_for(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}

/// Compiled glob patterns matched against request paths.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathFilter {
    patterns: Vec<Pattern>,
}

impl PathFilter {
    pub(crate) fn compile(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| ProxyError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    pub(crate) fn is_empty(&self) -> bool { self.patterns.is_empty() }

    pub(crate) fn matches(&self, path: &str) -> bool { self.patterns.iter().any(|p| p.matches(path)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_handles_slashes() {
        let with_slash = RemoteRepositoryDescriptor::new("a", Url::parse("https://repo.example/maven2/").unwrap());
        let without = RemoteRepositoryDescriptor::new("b", Url::parse("https://repo.example/maven2").unwrap());
        assert_eq!(with_slash.url_for("org/a.jar"), "https://repo.example/maven2/org/a.jar");
        assert_eq!(without.url_for("/org/a.jar"), "https://repo.example/maven2/org/a.jar");
    }

    #[test]
    fn test_path_filter() {
        let filter = PathFilter::compile(&["org/internal/**".to_string(), "**/*-sources.jar".to_string()]).unwrap();
        assert!(filter.matches("org/internal/lib/1.0/lib-1.0.jar"));
        assert!(filter.matches("com/x/1.0/x-1.0-sources.jar"));
        assert!(!filter.matches("com/x/1.0/x-1.0.jar"));
        assert!(PathFilter::compile(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathFilter::compile(&["org/[".to_string()]).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidPattern { ref pattern, .. } if pattern == "org/["));
    }
}
