use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::{Error, Result};

/// How [`Workspace::commit`] treats a destination that already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitMode {
    /// Rename over whatever is at the destination.
    Replace,
    /// Never overwrite: if the destination appeared since staging began, the
    /// staged copy is discarded and the existing file wins.
    NoClobber,
    /// The first staged file guards the rest: it is placed as with
    /// [`CommitMode::NoClobber`]; if it loses, every other entry is skipped,
    /// otherwise they are placed as with [`CommitMode::Replace`].
    Guarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Created,
    Replaced,
    /// The destination already existed under [`CommitMode::NoClobber`].
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitEntry {
    pub relative: String,
    pub path:     PathBuf,
    pub outcome:  CommitOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub entries: Vec<CommitEntry>,
}

impl CommitReport {
    pub fn outcome(&self, relative: &str) -> Option<CommitOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.relative == relative)
            .map(|entry| entry.outcome)
    }

    pub fn written(&self) -> impl Iterator<Item = &CommitEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome != CommitOutcome::Skipped)
    }
}

/// A private staging directory whose files are moved into a destination tree
/// on commit.
///
/// The staging directory must live on the same filesystem as the destination
/// so that every move is a rename. Dropping a workspace without committing
/// removes everything staged in it, which is also what happens when the
/// future driving a transfer is cancelled.
pub struct Workspace {
    dir:    TempDir,
    staged: Vec<String>,
}

impl Workspace {
    pub fn new(staging_root: impl AsRef<Path>) -> Result<Self> {
        let staging_root = staging_root.as_ref();
        let staging_err = |source| Error::Staging {
            path: staging_root.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(staging_root).map_err(staging_err)?;
        let dir = tempfile::Builder::new()
            .prefix("stage-")
            .tempdir_in(staging_root)
            .map_err(staging_err)?;

        Ok(Self {
            dir,
            staged: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path { self.dir.path() }

    /// Reserve `relative` inside the workspace and return its staging path.
    ///
    /// Files are committed in the order they were staged.
    pub fn stage(&mut self, relative: &str) -> Result<PathBuf> {
        let staged = self.dir.path().join(checked_relative(relative)?);
        if let Some(parent) = staged.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if !self.staged.iter().any(|s| s == relative) {
            self.staged.push(relative.to_string());
        }
        Ok(staged)
    }

    /// Move every staged file that still exists into `destination_root`.
    ///
    /// Staged entries that were deleted before commit (for instance by a
    /// validation step) are silently left out of the report.
    pub fn commit(self, destination_root: impl AsRef<Path>, mode: CommitMode) -> Result<CommitReport> {
        let destination_root = destination_root.as_ref();
        let mut report = CommitReport::default();
        let mut guard_lost = false;

        for (index, relative) in self.staged.iter().enumerate() {
            let from = self.dir.path().join(relative);
            if !from.is_file() {
                continue;
            }

            let to = destination_root.join(relative);
            let mode = match mode {
                CommitMode::Guarded if index == 0 => CommitMode::NoClobber,
                CommitMode::Guarded => CommitMode::Replace,
                other => other,
            };
            if guard_lost {
                report.entries.push(CommitEntry {
                    relative: relative.clone(),
                    path:     to,
                    outcome:  CommitOutcome::Skipped,
                });
                continue;
            }

            if let Some(parent) = to.parent() {
                std::fs::create_dir_all(parent).map_err(|source| Error::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }

            let outcome = place(&from, &to, mode).map_err(|source| Error::Commit {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
            guard_lost = index == 0 && outcome == CommitOutcome::Skipped;

            report.entries.push(CommitEntry {
                relative: relative.clone(),
                path: to,
                outcome,
            });
        }

        Ok(report)
    }
}

fn place(from: &Path, to: &Path, mode: CommitMode) -> io::Result<CommitOutcome> {
    match mode {
        CommitMode::Replace => {
            let existed = to.exists();
            std::fs::rename(from, to)?;
            Ok(if existed {
                CommitOutcome::Replaced
            } else {
                CommitOutcome::Created
            })
        }
        CommitMode::NoClobber | CommitMode::Guarded => match std::fs::hard_link(from, to) {
            Ok(()) => {
                std::fs::remove_file(from)?;
                Ok(CommitOutcome::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(CommitOutcome::Skipped),
            Err(e) => Err(e),
        },
    }
}

fn checked_relative(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    let escapes = relative.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::InvalidRelative(relative.to_string()));
    }
    Ok(path)
}
