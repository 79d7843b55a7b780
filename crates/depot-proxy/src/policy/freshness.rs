use std::path::Path;
use std::time::{Duration, SystemTime};

use depot_layout::VersionClass;

use super::{Policy, PolicyContext, PolicyError};

const IGNORED: &str = "ignored";
const DISABLED: &str = "disabled";
const ONCE: &str = "once";
const HOURLY: &str = "hourly";
const DAILY: &str = "daily";

const OPTIONS: &[&str] = &[IGNORED, DISABLED, ONCE, HOURLY, DAILY];

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Age-based update checks for one class of versions.
///
/// The `releases` instance only looks at release versions and the `snapshots`
/// instance only at pre-release versions; a request of the other class is
/// always permitted. Requests without a version (project metadata) are
/// evaluated by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    scope: VersionClass,
}

impl FreshnessPolicy {
    pub const RELEASES: &'static str = "releases";
    pub const SNAPSHOTS: &'static str = "snapshots";

    pub fn new(scope: VersionClass) -> Self { Self { scope } }

    pub fn releases() -> Self { Self::new(VersionClass::Release) }

    pub fn snapshots() -> Self { Self::new(VersionClass::PreRelease) }

    pub fn scope(&self) -> VersionClass { self.scope }

    fn out_of_scope(&self, context: &PolicyContext) -> bool {
        context
            .get(PolicyContext::VERSION)
            .is_some_and(|version| VersionClass::of(version) != self.scope)
    }
}

impl Policy for FreshnessPolicy {
    fn id(&self) -> &'static str {
        match self.scope {
            VersionClass::Release => Self::RELEASES,
            VersionClass::PreRelease => Self::SNAPSHOTS,
        }
    }

    fn options(&self) -> &'static [&'static str] { OPTIONS }

    fn default_option(&self) -> &'static str {
        match self.scope {
            VersionClass::Release => ONCE,
            VersionClass::PreRelease => DAILY,
        }
    }

    fn evaluate(&self, setting: &str, context: &PolicyContext, local_file: &Path) -> Result<bool, PolicyError> {
        self.validate(setting)?;

        if setting == IGNORED || self.out_of_scope(context) {
            return Ok(true);
        }
        if setting == DISABLED {
            tracing::debug!(policy = self.id(), "updates disabled");
            return Ok(false);
        }

        let modified = match std::fs::metadata(local_file).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            // Absent (or unreadable) local copy: fetch.
            Err(_) => return Ok(true),
        };

        let max_age = match setting {
            ONCE => return Ok(false),
            HOURLY => HOUR,
            _ => DAY,
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age > max_age)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn context(version: &str) -> PolicyContext { PolicyContext::new().with(PolicyContext::VERSION, version) }

    fn aged_file(dir: &Path, age: Duration) -> std::path::PathBuf {
        let path = dir.join("a.jar");
        std::fs::write(&path, "x").unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_scope_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let local = aged_file(dir.path(), Duration::ZERO);

        for setting in [IGNORED, DISABLED, ONCE, HOURLY, DAILY] {
            assert!(FreshnessPolicy::releases().apply(setting, &context("1.0-SNAPSHOT"), &local));
            assert!(FreshnessPolicy::releases().apply(setting, &context("1.0-20240101.120000-3"), &local));
            assert!(FreshnessPolicy::snapshots().apply(setting, &context("1.0"), &local));
        }
    }

    #[test]
    fn test_absent_local_permits() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jar");
        let policy = FreshnessPolicy::releases();

        for setting in [IGNORED, ONCE, HOURLY, DAILY] {
            assert!(policy.apply(setting, &context("1.0"), &missing), "{setting}");
        }
        assert!(!policy.apply(DISABLED, &context("1.0"), &missing));
    }

    #[test]
    fn test_existing_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = aged_file(dir.path(), Duration::from_secs(60));
        let policy = FreshnessPolicy::snapshots();
        let ctx = context("2.0-SNAPSHOT");

        assert!(policy.apply(IGNORED, &ctx, &fresh));
        assert!(!policy.apply(DISABLED, &ctx, &fresh));
        assert!(!policy.apply(ONCE, &ctx, &fresh));
        assert!(!policy.apply(HOURLY, &ctx, &fresh));
        assert!(!policy.apply(DAILY, &ctx, &fresh));
    }

    #[test]
    fn test_stale_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let policy = FreshnessPolicy::releases();
        let ctx = context("1.0");

        let two_hours = aged_file(dir.path(), 2 * HOUR);
        assert!(policy.apply(HOURLY, &ctx, &two_hours));
        assert!(!policy.apply(DAILY, &ctx, &two_hours));
        assert!(!policy.apply(ONCE, &ctx, &two_hours));

        let two_days = aged_file(dir.path(), 2 * DAY);
        assert!(policy.apply(DAILY, &ctx, &two_days));
    }

    #[test]
    fn test_unversioned_request_is_in_scope_for_both() {
        let dir = tempfile::tempdir().unwrap();
        let local = aged_file(dir.path(), Duration::ZERO);
        let ctx = PolicyContext::new();

        assert!(!FreshnessPolicy::releases().apply(ONCE, &ctx, &local));
        assert!(!FreshnessPolicy::snapshots().apply(ONCE, &ctx, &local));
    }

    #[test]
    fn test_ids_and_defaults() {
        assert_eq!(FreshnessPolicy::releases().id(), "releases");
        assert_eq!(FreshnessPolicy::releases().default_option(), "once");
        assert_eq!(FreshnessPolicy::snapshots().id(), "snapshots");
        assert_eq!(FreshnessPolicy::snapshots().default_option(), "daily");
    }
}
