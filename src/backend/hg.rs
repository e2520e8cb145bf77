//! Mercurial adapter
//!
//! A thin shim over the `hg` command line, the same way the original
//! system drove its backends. Commands run with the workspace as the
//! working directory; stdout is captured, a non-zero exit becomes an
//! error with the command's stderr attached.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};

use super::{CommitInfo, VcsBackend, clean_working_files};

pub struct HgBackend {
    workspace: PathBuf,
}

impl HgBackend {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("hg")
            .current_dir(&self.workspace)
            .args(args)
            .output()
            .with_context(|| format!("failed to spawn hg {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "hg {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn user_arg(author: &str, email: &str) -> String {
        if email.is_empty() {
            author.to_string()
        } else {
            format!("{author} <{email}>")
        }
    }

    /// hgdate form: seconds since epoch plus offset, already UTC here.
    fn date_arg(timestamp: DateTime<Utc>) -> String {
        format!("{} 0", timestamp.timestamp())
    }
}

impl VcsBackend for HgBackend {
    fn is_initialized(&self) -> bool {
        self.workspace.join(".hg").exists()
    }

    fn create_repository(&mut self, initial_message: &str) -> Result<()> {
        self.run(&["init"])?;
        self.run(&[
            "commit",
            "--config",
            "ui.allowemptycommit=true",
            "-m",
            initial_message,
        ])?;
        Ok(())
    }

    fn clean_working_area(&mut self) -> Result<()> {
        clean_working_files(&self.workspace, ".hg")
    }

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()> {
        // Named branches come into existence with their first commit;
        // until then the branch is only a working directory marker.
        self.run(&["update", base])?;
        self.run(&["branch", name])?;
        Ok(())
    }

    fn switch_branch(&mut self, name: &str) -> Result<()> {
        if self.run(&["update", name]).is_err() {
            // No commit on that branch yet; mark the working directory.
            self.run(&["branch", "--force", name])?;
        }
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        self.run(&["addremove"])?;
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<()> {
        let path = path
            .to_str()
            .ok_or_else(|| anyhow!("non-unicode path {}", path.display()))?;
        self.run(&["add", path])?;
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
            "--config",
            "ui.allowemptycommit=true",
            "--user",
            &Self::user_arg(author, email),
            "--date",
            &Self::date_arg(timestamp),
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
        self.run(&["merge", "-r", branch])?;
        self.commit(author, email, timestamp, message)
    }

    fn tag(
        &mut self,
        name: &str,
        author: &str,
        email: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.run(&[
            "tag",
            "--user",
            &Self::user_arg(author, email),
            "--date",
            &Self::date_arg(timestamp),
            name,
        ])?;
        Ok(())
    }

    fn pack(&mut self) -> Result<()> {
        // Mercurial maintains its own store; there is no gc equivalent.
        Ok(())
    }

    fn latest_commit_info(&self) -> Result<CommitInfo> {
        let out = self.run(&["log", "-l", "1", "--template", "{node}\\n{author}\\n{date|hgdate}\\n"])?;
        let mut lines = out.lines();
        let id = lines.next().unwrap_or_default().to_string();
        let author = lines.next().unwrap_or_default().to_string();
        let date = lines.next().unwrap_or_default();
        let secs: i64 = date
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("unparseable hg date '{date}'"))?;
        let timestamp =
            DateTime::from_timestamp(secs, 0).ok_or_else(|| anyhow!("hg date out of range"))?;
        Ok(CommitInfo {
            id,
            author,
            timestamp,
        })
    }
}
