use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// A URL whose last transfer failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegativeCacheEntry {
    pub url:          String,
    pub last_failure: DateTime<Utc>,
}

/// Remote URLs that failed recently.
///
/// Shared between every in-flight resolution. Entries never expire on their
/// own: they are removed by a later successful fetch of the same URL or by an
/// external janitor calling [`NegativeFetchCache::evict_older_than`].
#[derive(Debug, Default)]
pub struct NegativeFetchCache {
    failures: DashMap<String, DateTime<Utc>>,
}

impl NegativeFetchCache {
    pub fn new() -> Self { Self::default() }

    pub fn has_failed_recently(&self, url: &str) -> bool { self.failures.contains_key(url) }

    /// Record a failure of `url`, overwriting any earlier timestamp.
    pub fn record_failure(&self, url: &str) {
        tracing::debug!(url, "recording failed transfer");
        self.failures.insert(url.to_string(), Utc::now());
    }

    pub fn clear(&self, url: &str) {
        if self.failures.remove(url).is_some() {
            tracing::debug!(url, "cleared failed transfer");
        }
    }

    pub fn last_failure(&self, url: &str) -> Option<DateTime<Utc>> { self.failures.get(url).map(|entry| *entry) }

    /// Snapshot of every entry, sorted by URL.
    pub fn entries(&self) -> Vec<NegativeCacheEntry> {
        let mut entries: Vec<_> = self
            .failures
            .iter()
            .map(|entry| NegativeCacheEntry {
                url:          entry.key().clone(),
                last_failure: *entry.value(),
            })
            .collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        entries
    }

    /// Drop entries whose last failure is older than `age`; returns how many.
    pub fn evict_older_than(&self, age: Duration) -> usize {
        let cutoff = Utc::now() - age;
        let before = self.failures.len();
        self.failures.retain(|_, last_failure| *last_failure >= cutoff);
        before.saturating_sub(self.failures.len())
    }

    pub fn len(&self) -> usize { self.failures.len() }

    pub fn is_empty(&self) -> bool { self.failures.is_empty() }
}
