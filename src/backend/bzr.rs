//! Bazaar adapter
//!
//! Shim over the `bzr` command line (also works with the `brz` fork if
//! it is installed under that name on PATH as `bzr`). Branches use the
//! colocated layout so the whole repository stays in one workspace
//! directory, matching the other adapters.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};

use super::{CommitInfo, VcsBackend, clean_working_files};

pub struct BzrBackend {
    workspace: PathBuf,
}

impl BzrBackend {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("bzr")
            .current_dir(&self.workspace)
            .args(args)
            .output()
            .with_context(|| format!("failed to spawn bzr {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "bzr {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn author_arg(author: &str, email: &str) -> String {
        if email.is_empty() {
            author.to_string()
        } else {
            format!("{author} <{email}>")
        }
    }

    fn commit_time_arg(timestamp: DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%d %H:%M:%S +0000").to_string()
    }
}

impl VcsBackend for BzrBackend {
    fn is_initialized(&self) -> bool {
        self.workspace.join(".bzr").exists()
    }

    fn create_repository(&mut self, initial_message: &str) -> Result<()> {
        self.run(&["init", "-q"])?;
        self.run(&["commit", "-q", "--unchanged", "-m", initial_message])?;
        Ok(())
    }

    fn clean_working_area(&mut self) -> Result<()> {
        clean_working_files(&self.workspace, ".bzr")
    }

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()> {
        // Colocated branch forked from base; switch restores the branch
        // the caller was on.
        self.run(&["switch", "-q", base]).ok();
        self.run(&["switch", "-q", "-b", name])?;
        self.run(&["switch", "-q", base])?;
        Ok(())
    }

    fn switch_branch(&mut self, name: &str) -> Result<()> {
        self.run(&["switch", "-q", name])?;
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        self.run(&["add", "-q"])?;
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<()> {
        let path = path
            .to_str()
            .ok_or_else(|| anyhow!("non-unicode path {}", path.display()))?;
        self.run(&["add", "-q", path])?;
        Ok(())
    }

    fn commit(
        &mut self,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()> {
        self.run(&[
            "commit",
            "-q",
            "--unchanged",
            "--author",
            &Self::author_arg(author, email),
            "--commit-time",
            &Self::commit_time_arg(timestamp),
            "-m",
            message,
        ])?;
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
        let location = format!("co:{branch}");
        self.run(&["merge", "-q", &location])?;
        self.commit(author, email, timestamp, message)
    }

    fn tag(
        &mut self,
        name: &str,
        _author: &str,
        _email: &str,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        // bzr tags carry no tagger identity.
        self.run(&["tag", name])?;
        Ok(())
    }

    fn pack(&mut self) -> Result<()> {
        self.run(&["pack"])?;
        Ok(())
    }

    fn latest_commit_info(&self) -> Result<CommitInfo> {
        let out = self.run(&["log", "-r-1", "--timezone=utc"])?;
        let mut id = String::new();
        let mut author = String::new();
        let mut timestamp = None;
        for line in out.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("revno:") {
                id = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("committer:") {
                author = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("timestamp:") {
                let parsed = DateTime::parse_from_str(rest.trim(), "%a %Y-%m-%d %H:%M:%S %z")
                    .with_context(|| format!("unparseable bzr timestamp '{}'", rest.trim()))?;
                timestamp = Some(parsed.with_timezone(&Utc));
            }
        }
        let timestamp = timestamp.ok_or_else(|| anyhow!("bzr log reported no timestamp"))?;
        Ok(CommitInfo {
            id,
            author,
            timestamp,
        })
    }
}
