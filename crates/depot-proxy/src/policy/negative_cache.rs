use std::path::Path;
use std::sync::Arc;

use super::{Policy, PolicyContext, PolicyError};
use crate::NegativeFetchCache;

const IGNORED: &str = "ignored";
const CACHED: &str = "cached";

const OPTIONS: &[&str] = &[IGNORED, CACHED];

/// Skips remotes whose URL failed recently.
#[derive(Debug, Clone)]
pub struct NegativeCachePolicy {
    cache: Arc<NegativeFetchCache>,
}

impl NegativeCachePolicy {
    pub const ID: &'static str = "cache-failures";

    pub fn new(cache: Arc<NegativeFetchCache>) -> Self { Self { cache } }
}

impl Policy for NegativeCachePolicy {
    fn id(&self) -> &'static str { Self::ID }

    fn options(&self) -> &'static [&'static str] { OPTIONS }

    fn default_option(&self) -> &'static str { CACHED }

    fn evaluate(&self, setting: &str, context: &PolicyContext, _local_file: &Path) -> Result<bool, PolicyError> {
        self.validate(setting)?;
        if setting == IGNORED {
            return Ok(true);
        }

        match context.get(PolicyContext::URL) {
            Some(url) if self.cache.has_failed_recently(url) => {
                tracing::debug!(url, "failed recently; skipping");
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_consults_cache() {
        let cache = Arc::new(NegativeFetchCache::new());
        let policy = NegativeCachePolicy::new(Arc::clone(&cache));
        let ctx = PolicyContext::new().with(PolicyContext::URL, "http://down/a.jar");
        let local = Path::new("unused");

        assert!(policy.apply(CACHED, &ctx, local));
        cache.record_failure("http://down/a.jar");
        assert!(!policy.apply(CACHED, &ctx, local));
        assert!(policy.apply(IGNORED, &ctx, local));

        cache.clear("http://down/a.jar");
        assert!(policy.apply(CACHED, &ctx, local));
    }
}
