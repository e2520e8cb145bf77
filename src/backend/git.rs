//! Git adapter, built on libgit2
//!
//! Commits and tags are back-dated by constructing signatures with an
//! explicit `Time` instead of `Signature::now`, so the replayed history
//! carries the original authors and timestamps. The one operation libgit2
//! does not expose is garbage collection, so `pack()` shells out to
//! `git gc`.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{BranchType, IndexAddOption, Repository, RepositoryInitOptions, Signature, Time};

use super::{CommitInfo, VcsBackend, clean_working_files};
use crate::config::PRODUCTION_BRANCH;

pub struct GitBackend {
    workspace: PathBuf,
    repo: Option<Repository>,
}

impl GitBackend {
    /// Open the workspace, attaching to an existing repository when one
    /// is already there.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        let workspace = workspace.as_ref().to_path_buf();
        let repo = Repository::open(&workspace).ok();
        Self { workspace, repo }
    }

    fn repo(&self) -> Result<&Repository> {
        self.repo
            .as_ref()
            .ok_or_else(|| anyhow!("git repository is not initialized"))
    }

    fn signature(name: &str, email: &str, timestamp: DateTime<Utc>) -> Result<Signature<'static>> {
        let time = Time::new(timestamp.timestamp(), 0);
        Signature::new(name, email, &time).context("failed to create signature")
    }
}

impl VcsBackend for GitBackend {
    fn is_initialized(&self) -> bool {
        self.workspace.join(".git").exists()
    }

    fn create_repository(&mut self, initial_message: &str) -> Result<()> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(PRODUCTION_BRANCH);
        let repo = Repository::init_opts(&self.workspace, &opts)
            .with_context(|| format!("failed to init repository in {}", self.workspace.display()))?;
        {
            let sig = Self::signature("revport", "revport@localhost", Utc::now())?;
            let mut index = repo.index()?;
            let tree_id = index.write_tree()?;
            let tree = repo.find_tree(tree_id)?;
            repo.commit(Some("HEAD"), &sig, &sig, initial_message, &tree, &[])?;
        }
        self.repo = Some(repo);
        Ok(())
    }

    fn clean_working_area(&mut self) -> Result<()> {
        clean_working_files(&self.workspace, ".git")
    }

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()> {
        let repo = self.repo()?;
        let base = repo
            .find_branch(base, BranchType::Local)
            .with_context(|| format!("base branch {base} not found"))?;
        let commit = base.get().peel_to_commit()?;
        repo.branch(name, &commit, false)?;
        Ok(())
    }

    fn switch_branch(&mut self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let refname = format!("refs/heads/{name}");
        repo.set_head(&refname)
            .with_context(|| format!("branch {name} not found"))?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        // add_all does not record deletions; update_all does.
        index.update_all(["*"], None)?;
        index.write()?;
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<()> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_path(path)?;
        index.write()?;
        Ok(())
    }

    fn commit(
        &mut self,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent_commit = match repo.head() {
            Ok(head) => {
                let oid = head.target().context("HEAD has no target")?;
                Some(repo.find_commit(oid)?)
            }
            Err(_) => None,
        };
        let parents: Vec<_> = parent_commit.iter().collect();

        let sig = Self::signature(author, email, timestamp)?;
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(())
    }

    fn merge(
        &mut self,
        branch: &str,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()> {
        let repo = self.repo()?;
        let their_ref = repo.find_reference(&format!("refs/heads/{branch}"))?;
        let annotated = repo.reference_to_annotated_commit(&their_ref)?;

        let (analysis, _) = repo.merge_analysis(&[&annotated])?;
        if analysis.is_up_to_date() {
            return Ok(());
        }

        // Even a fast-forwardable promotion gets a real merge commit, so
        // the production branch records each tag-triggered merge.
        repo.merge(&[&annotated], None, None)?;
        let mut index = repo.index()?;
        if index.has_conflicts() {
            repo.cleanup_state()?;
            bail!("merge of {branch} produced conflicts");
        }
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let head_commit = repo.head()?.peel_to_commit()?;
        let their_commit = repo.find_commit(annotated.id())?;
        let sig = Self::signature(author, email, timestamp)?;
        repo.commit(
            Some("HEAD"),
            &sig,
            &sig,
            message,
            &tree,
            &[&head_commit, &their_commit],
        )?;
        repo.cleanup_state()?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        Ok(())
    }

    fn tag(
        &mut self,
        name: &str,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let repo = self.repo()?;
        let target = repo.head()?.peel(git2::ObjectType::Commit)?;
        let sig = Self::signature(author, email, timestamp)?;
        repo.tag(name, &target, &sig, name, false)?;
        Ok(())
    }

    fn pack(&mut self) -> Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workspace)
            .args(["gc", "--quiet"])
            .output()
            .context("failed to run git gc")?;
        if !output.status.success() {
            bail!("git gc failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }

    fn latest_commit_info(&self) -> Result<CommitInfo> {
        let repo = self.repo()?;
        let commit = repo.head()?.peel_to_commit()?;
        let timestamp = DateTime::from_timestamp(commit.time().seconds(), 0)
            .context("commit timestamp out of range")?;
        Ok(CommitInfo {
            id: commit.id().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            timestamp,
        })
    }
}
