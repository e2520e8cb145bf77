//! Target VCS backend contract
//!
//! One flat capability trait, implemented once per backend. The driver
//! only ever talks to `dyn VcsBackend`; which concrete system receives
//! the replayed history is decided at the CLI layer. Every operation may
//! fail, and apart from the precondition checks in the driver a failure
//! is a non-fatal signal: the driver logs it and moves on.

mod bzr;
mod git;
mod hg;

pub use bzr::BzrBackend;
pub use git::GitBackend;
pub use hg::HgBackend;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Identity and timestamp of the newest commit on the current branch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    pub id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Operations the replay engine needs from a target version control
/// system.
pub trait VcsBackend {
    /// Whether the workspace already carries this backend's repository
    /// metadata.
    fn is_initialized(&self) -> bool;

    /// Initialize a fresh repository in the workspace and record an
    /// initial commit with the given message.
    fn create_repository(&mut self, initial_message: &str) -> Result<()>;

    /// Remove every tracked and untracked file from the working area,
    /// leaving repository metadata intact.
    fn clean_working_area(&mut self) -> Result<()>;

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()>;

    fn switch_branch(&mut self, name: &str) -> Result<()>;

    /// Stage every change in the working area, including deletions.
    fn stage_all(&mut self) -> Result<()>;

    /// Stage a single path, relative to the workspace root.
    fn stage(&mut self, path: &Path) -> Result<()>;

    /// Commit staged changes, attributed to the given author at the given
    /// historical timestamp.
    fn commit(
        &mut self,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()>;

    /// Merge `branch` into the currently checked out branch and commit
    /// the merge.
    fn merge(
        &mut self,
        branch: &str,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()>;

    fn tag(&mut self, name: &str, author: &str, email: &str, timestamp: DateTime<Utc>)
    -> Result<()>;

    /// Repack or garbage-collect the repository storage.
    fn pack(&mut self) -> Result<()>;

    fn latest_commit_info(&self) -> Result<CommitInfo>;
}

/// Delete everything under `workspace` except the backend's metadata
/// directory. Shared by the concrete adapters.
pub(crate) fn clean_working_files(workspace: &Path, metadata_dir: &str) -> Result<()> {
    for entry in fs::read_dir(workspace)
        .with_context(|| format!("failed to read workspace {}", workspace.display()))?
    {
        let entry = entry?;
        if entry.file_name() == metadata_dir {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
