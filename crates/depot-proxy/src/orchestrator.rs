use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use depot_fetch::{Fetcher, HttpClient};
use depot_fs::{CommitMode, CommitOutcome, Workspace};
use depot_layout::{ArtifactCoordinate, MetadataRef, is_snapshot};
use depot_verify::DigestKind;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::audit::{AuditAction, AuditEvent, AuditQualifier, AuditSink};
use crate::policy::{Policy, PolicyContext, PolicySetting, PostFetchPolicy, PreFetchPolicy};
use crate::relocation::read_relocation;
use crate::repository::{ManagedRepository, PathFilter, RemoteRepositoryDescriptor};
use crate::{NegativeFetchCache, ProxyError, Result};

const METADATA_FILETYPE: &str = "metadata";

#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// Transfer timeout for remotes that do not set their own.
    ///
    /// Default: 60s
    pub default_timeout: Duration,
    /// Staging directory, relative to each managed repository root.
    ///
    /// Default: `.depot/staging`
    pub staging_dir:     PathBuf,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            staging_dir:     PathBuf::from(".depot").join("staging"),
        }
    }
}

/// Outcome of [`ProxyOrchestrator::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Resolution {
    /// A remote produced valid content, now stored at `path`.
    Fetched { path: PathBuf, remote: String },
    /// No remote produced content; the existing local copy stands.
    Local { path: PathBuf },
    NotFound,
    /// The request path is not an artifact reference; look it up as a plain
    /// file relative to the repository root.
    NotArtifact { path: String },
}

impl Resolution {
    /// Local file to serve, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Fetched { path, .. } | Resolution::Local { path } => Some(path),
            Resolution::NotFound | Resolution::NotArtifact { .. } => None,
        }
    }
}

struct RegisteredRemote {
    descriptor: RemoteRepositoryDescriptor,
    whitelist:  PathFilter,
    blacklist:  PathFilter,
    pre_fetch:  Vec<(PreFetchPolicy, String)>,
    post_fetch: Vec<(PostFetchPolicy, String)>,
}

impl RegisteredRemote {
    fn accepts(&self, relative: &str) -> bool {
        (self.whitelist.is_empty() || self.whitelist.matches(relative)) && !self.blacklist.matches(relative)
    }
}

struct RegisteredRepository {
    managed:   ManagedRepository,
    blacklist: PathFilter,
    remotes:   Vec<RegisteredRemote>,
}

impl RegisteredRepository {
    fn may_proxy(&self, relative: &str, version: Option<&str>) -> bool {
        if self.blacklist.matches(relative) {
            tracing::debug!(repository = %self.managed.id, path = relative, "blacklisted");
            return false;
        }
        if !self.managed.include_snapshots && version.is_some_and(is_snapshot) {
            tracing::debug!(repository = %self.managed.id, path = relative, "snapshots not proxied");
            return false;
        }
        true
    }
}

/// One file to obtain from one remote.
struct Transfer<'a> {
    /// Destination relative to the managed repository root.
    relative:    &'a str,
    /// Path relative to the remote's base URL.
    remote_path: String,
    version:     Option<&'a str>,
    filetype:    &'a str,
}

/// Holds the per-destination lock; unregisters it when nobody else waits.
struct InFlight<'a> {
    locks: &'a DashMap<PathBuf, Arc<Mutex<()>>>,
    path:  PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Resolves requests against managed repositories, proxying missing or
/// stale content from their remotes.
///
/// Remotes are tried strictly in priority order and the first one whose
/// content passes every post-fetch policy wins. Per-remote failures never
/// escape: they are logged, recorded in the negative cache and the next
/// remote is tried. Concurrent requests for the same destination are
/// serialised, and content is staged and renamed into place so readers
/// never observe a partial file.
pub struct ProxyOrchestrator<C: HttpClient> {
    fetcher:        Fetcher<C>,
    negative_cache: Arc<NegativeFetchCache>,
    audit:          Arc<dyn AuditSink>,
    options:        ProxyOptions,
    repositories:   HashMap<String, Arc<RegisteredRepository>>,
    in_flight:      DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl<C: HttpClient> ProxyOrchestrator<C> {
    pub fn new(
        client: C,
        negative_cache: Arc<NegativeFetchCache>,
        audit: Arc<dyn AuditSink>,
        options: ProxyOptions,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(client),
            negative_cache,
            audit,
            options,
            repositories: HashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    pub fn negative_cache(&self) -> &Arc<NegativeFetchCache> { &self.negative_cache }

    pub fn options(&self) -> &ProxyOptions { &self.options }

    pub fn repository_ids(&self) -> impl Iterator<Item = &str> { self.repositories.keys().map(String::as_str) }

    /// Register a managed repository and its remotes.
    ///
    /// Remotes are ordered by priority, keeping the given order among equal
    /// priorities. Policies a remote does not mention run with their default
    /// setting.
    pub fn add_repository(
        &mut self,
        managed: ManagedRepository,
        mut remotes: Vec<RemoteRepositoryDescriptor>,
    ) -> Result<()> {
        if self.repositories.contains_key(&managed.id) {
            return Err(ProxyError::DuplicateRepository(managed.id));
        }

        remotes.sort_by_key(|remote| remote.priority);
        let remotes = remotes
            .into_iter()
            .map(|descriptor| self.register_remote(descriptor))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            repository = %managed.id,
            root = %managed.root.display(),
            layout = %managed.layout,
            remotes = ?remotes.iter().map(|r| r.descriptor.id.as_str()).collect::<Vec<_>>(),
            "registered repository"
        );

        let repository = RegisteredRepository {
            blacklist: PathFilter::compile(&managed.blacklist)?,
            managed,
            remotes,
        };
        self.repositories
            .insert(repository.managed.id.clone(), Arc::new(repository));
        Ok(())
    }

    fn register_remote(&self, descriptor: RemoteRepositoryDescriptor) -> Result<RegisteredRemote> {
        let known_pre = PreFetchPolicy::all(Arc::clone(&self.negative_cache));
        let known_post = PostFetchPolicy::all();

        Ok(RegisteredRemote {
            whitelist: PathFilter::compile(&descriptor.whitelist)?,
            blacklist: PathFilter::compile(&descriptor.blacklist)?,
            pre_fetch: configure(&descriptor.id, "pre-fetch", &known_pre, &descriptor.pre_fetch)?,
            post_fetch: configure(&descriptor.id, "post-fetch", &known_post, &descriptor.post_fetch)?,
            descriptor,
        })
    }

    fn repository(&self, id: &str) -> Result<Arc<RegisteredRepository>> {
        self.repositories
            .get(id)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownRepository(id.to_string()))
    }

    /// Make `request_path` present in the repository if any remote can
    /// supply it.
    ///
    /// Only an unknown repository id is an error; every other failure shows
    /// up as [`Resolution::Local`] or [`Resolution::NotFound`].
    pub async fn resolve(&self, repository_id: &str, request_path: &str) -> Result<Resolution> {
        let repository = self.repository(repository_id)?;
        let request = request_path.trim_start_matches('/');
        let layout = repository.managed.layout;

        let coordinate = match layout.to_coordinate(request) {
            Ok(coordinate) => coordinate,
            Err(reason) => {
                tracing::debug!(repository = repository_id, path = request, %reason, "not an artifact");
                return Ok(Resolution::NotArtifact {
                    path: request.to_string(),
                });
            }
        };

        let coordinate = if coordinate.is_descriptor() {
            coordinate
        } else {
            self.relocate(&repository, coordinate).await
        };

        let relative = layout.to_path(&coordinate);
        let local = repository.managed.root.join(&relative);
        Ok(match self.fetch_artifact(&repository, &relative, &coordinate).await {
            Some(remote) => Resolution::Fetched { path: local, remote },
            None if local.is_file() => Resolution::Local { path: local },
            None => Resolution::NotFound,
        })
    }

    /// Refresh repository metadata from every eligible remote.
    ///
    /// Each remote's copy is stored beside the managed metadata file as
    /// `maven-metadata-<remote>.xml`; merging them is left to the caller.
    /// Returns whether any remote produced content.
    pub async fn fetch_metadata(&self, repository_id: &str, metadata: &MetadataRef) -> Result<bool> {
        let repository = self.repository(repository_id)?;
        let managed_path = match repository.managed.layout.metadata_path(metadata) {
            Ok(path) => path,
            Err(reason) => {
                tracing::debug!(repository = repository_id, %metadata, %reason, "no metadata for this layout");
                return Ok(false);
            }
        };
        if !repository.may_proxy(&managed_path, metadata.version.as_deref()) {
            return Ok(false);
        }

        let mut fetched = false;
        for remote in &repository.remotes {
            let remote_path = match remote.descriptor.layout.metadata_path(metadata) {
                Ok(path) => path,
                Err(reason) => {
                    tracing::debug!(remote = %remote.descriptor.id, %reason, "skipping remote");
                    continue;
                }
            };

            let relative = per_remote_metadata_path(&managed_path, &remote.descriptor.id);
            let _in_flight = self.lock(repository.managed.root.join(&relative)).await;
            let transfer = Transfer {
                relative: &relative,
                remote_path,
                version: metadata.version.as_deref(),
                filetype: METADATA_FILETYPE,
            };
            fetched |= self.try_remote(&repository, remote, &transfer).await;
        }
        Ok(fetched)
    }

    /// Apply the relocation declared by the artifact's descriptor, one hop.
    async fn relocate(&self, repository: &RegisteredRepository, coordinate: ArtifactCoordinate) -> ArtifactCoordinate {
        let descriptor = coordinate.descriptor();
        let relative = repository.managed.layout.to_path(&descriptor);
        self.fetch_artifact(repository, &relative, &descriptor).await;

        let path = repository.managed.root.join(&relative);
        if !path.is_file() {
            return coordinate;
        }

        let descriptor_path = path.clone();
        let read = match tokio::task::spawn_blocking(move || read_relocation(&descriptor_path)).await {
            Ok(read) => read,
            Err(e) => {
                tracing::warn!(descriptor = %path.display(), error = %e, "descriptor read aborted");
                return coordinate;
            }
        };

        match read {
            Ok(Some(hint)) => {
                let relocated = coordinate.relocated(&hint);
                if relocated != coordinate {
                    tracing::info!(from = %coordinate, to = %relocated, "following relocation");
                }
                relocated
            }
            Ok(None) => coordinate,
            Err(e) => {
                tracing::warn!(descriptor = %path.display(), error = %e, "ignoring unreadable descriptor");
                coordinate
            }
        }
    }

    /// Run the remote loop for one artifact; returns the winning remote.
    async fn fetch_artifact(
        &self,
        repository: &RegisteredRepository,
        relative: &str,
        coordinate: &ArtifactCoordinate,
    ) -> Option<String> {
        if !repository.may_proxy(relative, Some(coordinate.version())) {
            return None;
        }

        let _in_flight = self.lock(repository.managed.root.join(relative)).await;
        for remote in &repository.remotes {
            let transfer = Transfer {
                relative,
                remote_path: remote.descriptor.layout.to_path(coordinate),
                version: Some(coordinate.version()),
                filetype: coordinate.kind(),
            };
            if self.try_remote(repository, remote, &transfer).await {
                return Some(remote.descriptor.id.clone());
            }
        }
        None
    }

    async fn lock(&self, path: PathBuf) -> InFlight<'_> {
        let lock = Arc::clone(self.in_flight.entry(path.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        InFlight {
            locks: &self.in_flight,
            path,
            guard: Some(guard),
        }
    }

    async fn try_remote(
        &self,
        repository: &RegisteredRepository,
        remote: &RegisteredRemote,
        transfer: &Transfer<'_>,
    ) -> bool {
        let remote_id = remote.descriptor.id.as_str();
        if !remote.accepts(transfer.relative) {
            tracing::debug!(remote = remote_id, path = transfer.relative, "path filtered out for remote");
            return false;
        }

        let url = remote.descriptor.url_for(&transfer.remote_path);
        let mut context = PolicyContext::new()
            .with(PolicyContext::URL, url.as_str())
            .with(PolicyContext::REMOTE, remote_id)
            .with(PolicyContext::FILETYPE, transfer.filetype);
        if let Some(version) = transfer.version {
            context = context.with(PolicyContext::VERSION, version);
        }

        let local = repository.managed.root.join(transfer.relative);
        for (policy, setting) in &remote.pre_fetch {
            if !policy.apply(setting, &context, &local) {
                tracing::debug!(remote = remote_id, policy = policy.id(), %setting, %url, "remote not eligible");
                return false;
            }
        }

        match self.transfer(repository, remote, transfer, &url, &context).await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(
                    repository = %repository.managed.id,
                    path = transfer.relative,
                    error = %e,
                    "failed to stage proxied content"
                );
                false
            }
        }
    }

    async fn transfer(
        &self,
        repository: &RegisteredRepository,
        remote: &RegisteredRemote,
        transfer: &Transfer<'_>,
        url: &str,
        context: &PolicyContext,
    ) -> depot_fs::Result<bool> {
        let managed = &repository.managed;
        let remote_id = remote.descriptor.id.as_str();
        let timeout = remote.descriptor.timeout.unwrap_or(self.options.default_timeout);
        let existed = managed.root.join(transfer.relative).is_file();

        let mut workspace = Workspace::new(managed.root.join(&self.options.staging_dir))?;
        let staged = workspace.stage(transfer.relative)?;
        let side_files = DigestKind::ALL.map(|kind| format!("{}.{}", transfer.relative, kind.extension()));
        let mut staged_sides = Vec::with_capacity(side_files.len());
        for side in &side_files {
            staged_sides.push(workspace.stage(side)?);
        }

        if let Err(e) = self.fetcher.fetch_within(url, &staged, timeout).await {
            tracing::warn!(remote = remote_id, url, error = %e, "transfer failed");
            self.negative_cache.record_failure(url);
            return Ok(false);
        }

        for (kind, staged_side) in DigestKind::ALL.iter().zip(&staged_sides) {
            let side_url = format!("{url}.{}", kind.extension());
            if let Err(e) = self.fetcher.fetch_within(&side_url, staged_side, timeout).await {
                tracing::debug!(remote = remote_id, url = %side_url, error = %e, "no checksum from remote");
            }
        }
        let fetched_sides: Vec<Option<Vec<u8>>> = staged_sides.iter().map(|p| std::fs::read(p).ok()).collect();

        for (policy, setting) in &remote.post_fetch {
            if !run_post_fetch(policy, setting, context, &staged, timeout).await {
                tracing::warn!(remote = remote_id, url, policy = policy.id(), %setting, "fetched content rejected");
                self.negative_cache.record_failure(url);
                return Ok(false);
            }
        }

        let repaired: Vec<bool> = staged_sides
            .iter()
            .zip(&fetched_sides)
            .map(|(path, before)| path.is_file() && std::fs::read(path).ok() != *before)
            .collect();

        let mode = if existed { CommitMode::Replace } else { CommitMode::Guarded };
        let report = workspace.commit(&managed.root, mode)?;
        self.negative_cache.clear(url);

        if report.outcome(transfer.relative) == Some(CommitOutcome::Skipped) {
            tracing::debug!(remote = remote_id, path = transfer.relative, "another writer stored it first");
            return Ok(true);
        }

        for entry in report.written() {
            let action = match entry.outcome {
                CommitOutcome::Created => AuditAction::Created,
                _ => AuditAction::Modified,
            };
            let qualifier = match side_files.iter().position(|side| *side == entry.relative) {
                Some(index) if repaired[index] => AuditQualifier::Repaired,
                _ => AuditQualifier::Proxied,
            };
            self.audit
                .record(AuditEvent::new(&managed.id, &entry.relative, action).qualified(qualifier));
        }

        // Side-files this transfer did not produce no longer describe the stored file.
        for side in side_files.iter().filter(|side| report.outcome(side).is_none()) {
            let stale = managed.root.join(side);
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => {
                    tracing::debug!(path = %stale.display(), "removed stale checksum");
                    self.audit.record(AuditEvent::new(&managed.id, side, AuditAction::Removed));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %stale.display(), error = %e, "failed to remove stale checksum");
                }
            }
        }

        tracing::info!(repository = %managed.id, remote = remote_id, path = transfer.relative, "proxied");
        Ok(true)
    }
}

/// Pair every known policy with its configured setting, falling back to the
/// policy default. Configured policies come first, in configured order.
fn configure<P: Policy + Clone>(
    remote: &str,
    stage: &'static str,
    known: &[P],
    settings: &[PolicySetting],
) -> Result<Vec<(P, String)>> {
    let mut configured: Vec<(P, String)> = Vec::with_capacity(known.len());
    for PolicySetting { policy, setting } in settings {
        let Some(found) = known.iter().find(|p| p.id() == policy.as_str()) else {
            return Err(ProxyError::UnknownPolicy {
                remote: remote.to_string(),
                stage,
                policy: policy.clone(),
            });
        };
        if let Err(e) = found.validate(setting) {
            tracing::warn!(remote, error = %e, "invalid setting; the policy will deny every request");
        }
        configured.push((found.clone(), setting.clone()));
    }

    for policy in known {
        if !configured.iter().any(|(p, _)| p.id() == policy.id()) {
            configured.push((policy.clone(), policy.default_option().to_string()));
        }
    }
    Ok(configured)
}

/// Evaluate a post-fetch policy off the async runtime, bounded by `timeout`.
async fn run_post_fetch(
    policy: &PostFetchPolicy,
    setting: &str,
    context: &PolicyContext,
    file: &Path,
    timeout: Duration,
) -> bool {
    let id = policy.id();
    let (policy, setting, context, file) = (policy.clone(), setting.to_string(), context.clone(), file.to_path_buf());
    let task = tokio::task::spawn_blocking(move || policy.apply(&setting, &context, &file));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(e)) => {
            tracing::error!(policy = id, error = %e, "post-fetch policy aborted");
            false
        }
        Err(_) => {
            tracing::warn!(policy = id, ?timeout, "post-fetch policy timed out");
            false
        }
    }
}

fn per_remote_metadata_path(managed_path: &str, remote: &str) -> String {
    let stem = managed_path.strip_suffix(".xml").unwrap_or(managed_path);
    format!("{stem}-{remote}.xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ChecksumPolicy, FreshnessPolicy};

    #[test]
    fn test_per_remote_metadata_path() {
        assert_eq!(
            per_remote_metadata_path("org/a/maven-metadata.xml", "central"),
            "org/a/maven-metadata-central.xml"
        );
    }

    #[test]
    fn test_configure_orders_and_defaults() {
        let known = [
            PreFetchPolicy::Freshness(FreshnessPolicy::releases()),
            PreFetchPolicy::Freshness(FreshnessPolicy::snapshots()),
        ];
        let configured = configure("r", "pre-fetch", &known, &[PolicySetting::new("snapshots", "hourly")]).unwrap();
        let pairs: Vec<_> = configured.iter().map(|(p, s)| (p.id(), s.as_str())).collect();
        assert_eq!(pairs, [("snapshots", "hourly"), ("releases", "once")]);
    }

    #[test]
    fn test_configure_rejects_unknown_policy() {
        let known = [PostFetchPolicy::Checksum(ChecksumPolicy)];
        let err = configure("r", "post-fetch", &known, &[PolicySetting::new("releases", "once")]).unwrap_err();
        assert!(matches!(err, ProxyError::UnknownPolicy { ref policy, .. } if policy == "releases"));
    }

    #[test]
    fn test_resolution_path() {
        let local = Resolution::Local {
            path: PathBuf::from("/repo/a.jar"),
        };
        assert_eq!(local.path(), Some(Path::new("/repo/a.jar")));
        assert_eq!(Resolution::NotFound.path(), None);
        assert_eq!(Resolution::NotArtifact { path: "a/".into() }.path(), None);
    }
}
