//! Common test utilities for integration tests

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, TimeZone, Utc};

use revport::backend::CommitInfo;
use revport::{RawEvent, SourceHistory, VcsBackend};

/// Fixed base instant all test events hang off.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2004, 5, 14, 9, 0, 0).unwrap()
}

/// A check-in event `offset_secs` after the base time.
pub fn raw_add(path: &str, version: u32, author: &str, offset_secs: i64, comment: &str) -> RawEvent {
    RawEvent {
        path: path.to_string(),
        version,
        action: format!("Checked in {path}"),
        author: author.to_string(),
        timestamp: base_time() + Duration::seconds(offset_secs),
        comment: comment.to_string(),
        label: String::new(),
        is_latest: false,
    }
}

/// A label event `offset_secs` after the base time.
pub fn raw_label(author: &str, offset_secs: i64, label: &str) -> RawEvent {
    RawEvent {
        path: "$/project".to_string(),
        version: 0,
        action: format!("Labeled '{label}'"),
        author: author.to_string(),
        timestamp: base_time() + Duration::seconds(offset_secs),
        comment: String::new(),
        label: label.to_string(),
        is_latest: false,
    }
}

/// In-memory source provider scripted with a fixed event list.
///
/// Fetches write a marker file under the workspace and are recorded so
/// tests can assert which request shape (latest vs. explicit version) was
/// used. Paths in `fail_paths` fail every fetch.
pub struct ScriptedSource {
    pub files: Vec<(String, Vec<RawEvent>)>,
    pub fail_paths: HashSet<String>,
    pub fetches: RefCell<Vec<(String, Option<u32>)>>,
}

impl ScriptedSource {
    pub fn new(files: Vec<(String, Vec<RawEvent>)>) -> Self {
        Self {
            files,
            fail_paths: HashSet::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }
}

impl SourceHistory for ScriptedSource {
    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.iter().map(|(p, _)| p.clone()).collect())
    }

    fn events_for_file(&self, path: &str) -> Result<Vec<RawEvent>> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, events)| events.clone())
            .ok_or_else(|| anyhow!("unknown file {path}"))
    }

    fn fetch_content(&self, path: &str, version: Option<u32>, workspace: &Path) -> Result<()> {
        self.fetches.borrow_mut().push((path.to_string(), version));
        if self.fail_paths.contains(path) {
            bail!("scripted fetch failure for {path}");
        }
        let dest = workspace.join(path.trim_start_matches("$/"));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, format!("{path}@{version:?}\n"))?;
        Ok(())
    }
}

/// One operation the driver asked a backend to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    CreateRepository,
    CleanWorkingArea,
    CreateBranch(String),
    SwitchBranch(String),
    StageAll,
    Stage(String),
    Commit {
        author: String,
        timestamp: DateTime<Utc>,
        message: String,
    },
    Merge {
        branch: String,
    },
    Tag(String),
    Pack,
}

/// Backend double that records every operation instead of executing it.
pub struct RecordingBackend {
    pub ops: Vec<Op>,
    pub initialized: bool,
    pub latest: Option<CommitInfo>,
}

impl RecordingBackend {
    /// An uninitialized workspace, as a full migration expects.
    pub fn fresh() -> Self {
        Self {
            ops: Vec::new(),
            initialized: false,
            latest: None,
        }
    }

    /// An already-migrated repository whose newest commit carries the
    /// given timestamp.
    pub fn existing(latest: DateTime<Utc>) -> Self {
        Self {
            ops: Vec::new(),
            initialized: true,
            latest: Some(CommitInfo {
                id: "head".to_string(),
                author: "revport".to_string(),
                timestamp: latest,
            }),
        }
    }

    /// Operations that change repository state (everything except branch
    /// switches, packing and reads).
    pub fn write_ops(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    Op::CreateRepository
                        | Op::CleanWorkingArea
                        | Op::CreateBranch(_)
                        | Op::StageAll
                        | Op::Stage(_)
                        | Op::Commit { .. }
                        | Op::Merge { .. }
                        | Op::Tag(_)
                )
            })
            .count()
    }

    pub fn commit_messages(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Commit { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Tag(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl VcsBackend for RecordingBackend {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn create_repository(&mut self, _initial_message: &str) -> Result<()> {
        self.ops.push(Op::CreateRepository);
        self.initialized = true;
        Ok(())
    }

    fn clean_working_area(&mut self) -> Result<()> {
        self.ops.push(Op::CleanWorkingArea);
        Ok(())
    }

    fn create_branch(&mut self, name: &str, _base: &str) -> Result<()> {
        self.ops.push(Op::CreateBranch(name.to_string()));
        Ok(())
    }

    fn switch_branch(&mut self, name: &str) -> Result<()> {
        self.ops.push(Op::SwitchBranch(name.to_string()));
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        self.ops.push(Op::StageAll);
        Ok(())
    }

    fn stage(&mut self, path: &Path) -> Result<()> {
        self.ops.push(Op::Stage(path.display().to_string()));
        Ok(())
    }

    fn commit(
        &mut self,
        author: &str,
        _email: &str,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<()> {
        self.ops.push(Op::Commit {
            author: author.to_string(),
            timestamp,
            message: message.to_string(),
        });
        self.latest = Some(CommitInfo {
            id: format!("commit-{}", self.ops.len()),
            author: author.to_string(),
            timestamp,
        });
        Ok(())
    }

    fn merge(
        &mut self,
        branch: &str,
        author: &str,
        _email: &str,
        timestamp: DateTime<Utc>,
        _message: &str,
    ) -> Result<()> {
        self.ops.push(Op::Merge {
            branch: branch.to_string(),
        });
        self.latest = Some(CommitInfo {
            id: format!("merge-{}", self.ops.len()),
            author: author.to_string(),
            timestamp,
        });
        Ok(())
    }

    fn tag(
        &mut self,
        name: &str,
        _author: &str,
        _email: &str,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.ops.push(Op::Tag(name.to_string()));
        Ok(())
    }

    fn pack(&mut self) -> Result<()> {
        self.ops.push(Op::Pack);
        Ok(())
    }

    fn latest_commit_info(&self) -> Result<CommitInfo> {
        self.latest
            .clone()
            .ok_or_else(|| anyhow!("repository has no commits"))
    }
}
