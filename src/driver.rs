//! Migration driver
//!
//! The orchestration state machine. A run is one of three modes: analyze
//! (reconstruct the changeset stream and report, no backend writes), full
//! (replay the whole history into a fresh repository) and continuous
//! (replay only what is newer than the target's latest commit).
//!
//! Failure semantics: configuration and workspace precondition faults are
//! fatal and stop the run before any replay. Once replay has started,
//! per-file fetch failures and per-operation backend failures are logged
//! and counted, and the run keeps going with the next changeset.

use std::collections::{BTreeSet, HashMap};
use std::fs;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::actions::TargetAction;
use crate::backend::VcsBackend;
use crate::changeset::{self, COMMENT_WINDOW_SECS};
use crate::config::{MigrationConfig, RunMode};
use crate::error::MigrateError;
use crate::event::{Changeset, RawEvent, VersionEvent};
use crate::normalize;
use crate::source::SourceHistory;
use crate::usermap::{self, UserMap};

/// Identity used for commits the migration itself introduces (the initial
/// commit and the final sync commit), as opposed to replayed history.
const TOOL_AUTHOR: &str = "revport";
const TOOL_EMAIL: &str = "revport@localhost";

/// What an analyze run reports.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Normalized events that survived action translation.
    pub events: usize,
    /// Raw events dropped because their action has no target meaning.
    pub dropped: usize,
    pub changesets: usize,
    pub adds: usize,
    pub tags: usize,
    /// Distinct target-side author names, sorted.
    pub authors: Vec<String>,
}

/// Success and failure counters for one migration run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub changesets_total: usize,
    pub changesets_replayed: usize,
    pub files_fetched: usize,
    pub fetch_failures: usize,
    pub commits: usize,
    pub merges: usize,
    pub tags_applied: usize,
    pub tags_skipped: usize,
    pub backend_failures: usize,
}

/// Drives one run against a source provider and a backend adapter.
///
/// Owns no durable state: the cursor is read from the backend at run
/// start, and the counters are scoped to the run.
pub struct MigrationDriver<'a> {
    config: &'a MigrationConfig,
    source: &'a dyn SourceHistory,
    backend: &'a mut dyn VcsBackend,
}

impl<'a> MigrationDriver<'a> {
    pub fn new(
        config: &'a MigrationConfig,
        source: &'a dyn SourceHistory,
        backend: &'a mut dyn VcsBackend,
    ) -> Self {
        Self {
            config,
            source,
            backend,
        }
    }

    /// Reconstruct the changeset stream and report statistics without
    /// touching the backend.
    pub fn analyze(&self) -> Result<AnalysisReport> {
        let raw = self.collect_raw()?;
        let users = self.build_user_map(&raw)?;
        let events = normalize::normalize(&raw, &users, self.config.time_shift_hours)?;
        let changesets = changeset::build(&events);

        let adds = events
            .iter()
            .filter(|e| e.action == TargetAction::Add)
            .count();
        let tags = events.len() - adds;
        let authors: BTreeSet<String> = events.iter().map(|e| e.author.clone()).collect();
        Ok(AnalysisReport {
            events: events.len(),
            dropped: raw.len() - events.len(),
            changesets: changesets.len(),
            adds,
            tags,
            authors: authors.into_iter().collect(),
        })
    }

    /// Run a full or continuous migration. Analyze mode never gets here.
    pub fn migrate(&mut self) -> Result<RunStats> {
        let changesets = self.prepare()?;
        let mut stats = RunStats {
            changesets_total: changesets.len(),
            ..RunStats::default()
        };
        match self.config.mode {
            RunMode::Full => self.run_full(&changesets, &mut stats)?,
            RunMode::Continuous => self.run_continuous(&changesets, &mut stats)?,
            RunMode::Analyze => bail!("analyze mode performs no migration"),
        }
        info!(
            commits = stats.commits,
            tags = stats.tags_applied,
            fetch_failures = stats.fetch_failures,
            backend_failures = stats.backend_failures,
            "run finished"
        );
        Ok(stats)
    }

    fn run_full(&mut self, changesets: &[Changeset], stats: &mut RunStats) -> Result<()> {
        self.ensure_fresh_workspace()?;

        self.backend.create_repository("repository created by revport")?;
        let model = self.config.branch_model;
        if model.production_branch().is_some() {
            self.backend
                .create_branch(model.commit_branch(), crate::config::PRODUCTION_BRANCH)?;
            self.backend.switch_branch(model.commit_branch())?;
        }

        info!(changesets = changesets.len(), "replaying full history");
        for cs in changesets {
            self.replay(cs, stats);
        }

        self.reconcile(stats);

        if let Err(e) = self.backend.switch_branch(model.primary_branch()) {
            warn!(error = %e, "failed to switch to the primary branch");
            stats.backend_failures += 1;
        }
        if let Err(e) = self.backend.pack() {
            warn!(error = %e, "repository packing failed");
            stats.backend_failures += 1;
        }
        Ok(())
    }

    fn run_continuous(&mut self, changesets: &[Changeset], stats: &mut RunStats) -> Result<()> {
        if !self.backend.is_initialized() {
            return Err(MigrateError::NotInitialized(self.config.workspace.clone()).into());
        }
        self.backend
            .switch_branch(self.config.branch_model.commit_branch())?;

        // If the newest source event is still inside the clustering
        // window, a source-side check-in may be mid-flight; come back on
        // the next scheduled run instead of splitting it.
        if let Some(newest) = changesets.iter().map(|c| c.last().timestamp).max() {
            if (Utc::now() - newest).num_seconds() <= COMMENT_WINDOW_SECS {
                info!("latest source activity is too recent; deferring this run");
                return Ok(());
            }
        }

        let cursor = self.backend.latest_commit_info()?.timestamp;
        info!(%cursor, "resuming after last migrated commit");
        for cs in changesets {
            if cs.anchor().timestamp <= cursor {
                debug!(anchor = %cs.anchor().timestamp, "changeset already migrated");
                continue;
            }
            self.replay(cs, stats);
        }

        if let Err(e) = self.backend.pack() {
            warn!(error = %e, "repository packing failed");
            stats.backend_failures += 1;
        }
        Ok(())
    }

    /// Materialize one changeset: fetch its file contents into the
    /// working area, then commit or tag depending on its last event.
    fn replay(&mut self, cs: &Changeset, stats: &mut RunStats) {
        stats.changesets_replayed += 1;
        for event in cs.events().iter().filter(|e| e.action == TargetAction::Add) {
            // None means "latest"; the two request shapes are not
            // interchangeable against the source system.
            let version = if event.is_latest {
                None
            } else {
                Some(event.version)
            };
            match self
                .source
                .fetch_content(&event.path, version, &self.config.workspace)
            {
                Ok(()) => stats.files_fetched += 1,
                Err(e) => {
                    warn!(path = %event.path, version = event.version, error = %e,
                        "failed to fetch file content");
                    stats.fetch_failures += 1;
                }
            }
        }

        let last = cs.last().clone();
        match last.action {
            TargetAction::Add => {
                if let Err(e) = self.backend.stage_all() {
                    warn!(error = %e, "failed to stage changeset");
                    stats.backend_failures += 1;
                    return;
                }
                match self
                    .backend
                    .commit(&last.author, &last.email, last.timestamp, &last.message)
                {
                    Ok(()) => stats.commits += 1,
                    Err(e) => {
                        warn!(error = %e, "commit failed");
                        stats.backend_failures += 1;
                    }
                }
            }
            TargetAction::Tag => self.apply_tag(&last, stats),
        }
    }

    /// Tag the current state, merging develop into production first when
    /// the branch model has a production branch.
    fn apply_tag(&mut self, event: &VersionEvent, stats: &mut RunStats) {
        let Some(tag_name) = portable_tag(&event.tag) else {
            warn!(tag = %event.tag, "tag contains non-portable characters; skipping");
            stats.tags_skipped += 1;
            return;
        };

        let model = self.config.branch_model;
        if let Some(production) = model.production_branch() {
            let develop = model.commit_branch();
            if let Err(e) = self.backend.switch_branch(production) {
                warn!(error = %e, "failed to switch to {production}");
                stats.backend_failures += 1;
                return;
            }
            let merge_message = format!("merge {develop} for tag {tag_name}");
            match self.backend.merge(
                develop,
                &event.author,
                &event.email,
                event.timestamp,
                &merge_message,
            ) {
                Ok(()) => stats.merges += 1,
                Err(e) => {
                    warn!(error = %e, "merge for tag {tag_name} failed");
                    stats.backend_failures += 1;
                }
            }
            match self
                .backend
                .tag(&tag_name, &event.author, &event.email, event.timestamp)
            {
                Ok(()) => stats.tags_applied += 1,
                Err(e) => {
                    warn!(error = %e, "tag {tag_name} failed");
                    stats.backend_failures += 1;
                }
            }
            if let Err(e) = self.backend.switch_branch(develop) {
                warn!(error = %e, "failed to switch back to {develop}");
                stats.backend_failures += 1;
            }
        } else {
            match self
                .backend
                .tag(&tag_name, &event.author, &event.email, event.timestamp)
            {
                Ok(()) => stats.tags_applied += 1,
                Err(e) => {
                    warn!(error = %e, "tag {tag_name} failed");
                    stats.backend_failures += 1;
                }
            }
        }
    }

    /// Closing sync commit of a full migration: clear the working area and
    /// re-materialize the latest snapshot of every file straight from the
    /// source, so any drift from per-changeset fetches cannot survive.
    fn reconcile(&mut self, stats: &mut RunStats) {
        info!("reconciling working area with the latest source state");
        if let Err(e) = self.backend.clean_working_area() {
            warn!(error = %e, "failed to clean the working area");
            stats.backend_failures += 1;
            return;
        }
        let files = match self.source.list_files() {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "failed to enumerate source files");
                stats.fetch_failures += 1;
                return;
            }
        };
        for path in files {
            if let Err(e) = self
                .source
                .fetch_content(&path, None, &self.config.workspace)
            {
                warn!(path = %path, error = %e, "failed to fetch latest content");
                stats.fetch_failures += 1;
            }
        }
        if let Err(e) = self.backend.stage_all() {
            warn!(error = %e, "failed to stage the sync commit");
            stats.backend_failures += 1;
            return;
        }
        match self.backend.commit(
            TOOL_AUTHOR,
            TOOL_EMAIL,
            Utc::now(),
            "sync to latest source state",
        ) {
            Ok(()) => stats.commits += 1,
            Err(e) => {
                warn!(error = %e, "sync commit failed");
                stats.backend_failures += 1;
            }
        }
    }

    /// Full pipeline up to the ordered changeset stream.
    fn prepare(&self) -> Result<Vec<Changeset>> {
        let raw = self.collect_raw()?;
        let users = self.build_user_map(&raw)?;
        let events = normalize::normalize(&raw, &users, self.config.time_shift_hours)?;
        Ok(changeset::build(&events))
    }

    fn collect_raw(&self) -> Result<Vec<RawEvent>> {
        let mut raw = Vec::new();
        for path in self.source.list_files()? {
            raw.extend(self.source.events_for_file(&path)?);
        }
        if raw.is_empty() {
            return Err(MigrateError::EmptyHistory.into());
        }
        debug!(events = raw.len(), "collected raw history");
        Ok(raw)
    }

    fn build_user_map(&self, raw: &[RawEvent]) -> Result<UserMap> {
        let explicit = match &self.config.user_map {
            Some(path) => usermap::load_user_map(path)?,
            None => HashMap::new(),
        };
        let authors: BTreeSet<&str> = raw.iter().map(|e| e.author.as_str()).collect();
        Ok(UserMap::build(
            explicit,
            authors,
            self.config.email_domain.as_deref(),
        ))
    }

    /// Full migration wants a workspace with neither files nor backend
    /// metadata.
    fn ensure_fresh_workspace(&self) -> Result<()> {
        let workspace = &self.config.workspace;
        if self.backend.is_initialized() {
            return Err(MigrateError::WorkspaceNotEmpty(workspace.clone()).into());
        }
        if !workspace.exists() {
            fs::create_dir_all(workspace)?;
            return Ok(());
        }
        if fs::read_dir(workspace)?.next().is_some() {
            return Err(MigrateError::WorkspaceNotEmpty(workspace.clone()).into());
        }
        Ok(())
    }
}

/// Restrict a tag value to a portable character set. Returns the name to
/// use on the backend, with whitespace collapsed to underscores, or None
/// when the value cannot be represented portably.
fn portable_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() || !trimmed.is_ascii() {
        return None;
    }
    Some(
        trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portable_tag_accepts_plain_ascii() {
        assert_eq!(portable_tag("v1.2"), Some("v1.2".to_string()));
        assert_eq!(portable_tag("release 1"), Some("release_1".to_string()));
        assert_eq!(portable_tag("  v2  "), Some("v2".to_string()));
    }

    #[test]
    fn test_portable_tag_rejects_non_ascii_and_empty() {
        assert_eq!(portable_tag("verze-č.1"), None);
        assert_eq!(portable_tag(""), None);
        assert_eq!(portable_tag("   "), None);
    }
}
