//! Run configuration
//!
//! Everything the CLI layer hands the core: run mode, branch topology,
//! workspace location, timezone correction and identity settings. The
//! struct is validated once with [`MigrationConfig::validate`] before any
//! processing begins; the core never re-validates individual fields after
//! that.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::error::MigrateError;

/// Branch ordinary commits land on in the two-branch models.
pub const DEVELOP_BRANCH: &str = "develop";

/// Branch that receives tag-triggered merges; also the only branch of the
/// single-branch model.
pub const PRODUCTION_BRANCH: &str = "master";

/// How a run drives the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Reconstruct the changeset stream and report statistics; no backend
    /// writes at all.
    Analyze,
    /// Replay the whole history into a fresh repository.
    Full,
    /// Replay only history newer than the target's latest commit.
    Continuous,
}

/// Branch topology for the target repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchModel {
    /// Everything on one branch; tags apply directly.
    Single,
    /// Commits on develop, tags merge develop into production, the
    /// repository is left on develop.
    DevelopPrimary,
    /// Same topology, but the repository is left on production.
    ProductionPrimary,
}

impl BranchModel {
    /// Parse the numeric selector used on the command line.
    pub fn from_selector(selector: &str) -> Result<Self, MigrateError> {
        match selector.trim() {
            "1" => Ok(BranchModel::Single),
            "2" => Ok(BranchModel::DevelopPrimary),
            "3" => Ok(BranchModel::ProductionPrimary),
            other => Err(MigrateError::InvalidBranchModel(other.to_string())),
        }
    }

    /// The branch ordinary changeset commits go to.
    pub fn commit_branch(&self) -> &'static str {
        match self {
            BranchModel::Single => PRODUCTION_BRANCH,
            _ => DEVELOP_BRANCH,
        }
    }

    /// The branch tag-triggered merges target, if the model has one
    /// distinct from the commit branch.
    pub fn production_branch(&self) -> Option<&'static str> {
        match self {
            BranchModel::Single => None,
            _ => Some(PRODUCTION_BRANCH),
        }
    }

    /// The branch the repository is left checked out on when a run ends.
    pub fn primary_branch(&self) -> &'static str {
        match self {
            BranchModel::Single | BranchModel::ProductionPrimary => PRODUCTION_BRANCH,
            BranchModel::DevelopPrimary => DEVELOP_BRANCH,
        }
    }
}

/// Validated settings for one migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub mode: RunMode,
    /// Working directory the backend owns for the duration of the run.
    pub workspace: PathBuf,
    pub branch_model: BranchModel,
    /// Hour offset applied to every source timestamp, in -12..=12.
    pub time_shift_hours: i64,
    /// Domain for synthesized author emails; None leaves them empty.
    pub email_domain: Option<String>,
    /// Optional JSON user map file.
    pub user_map: Option<PathBuf>,
}

impl MigrationConfig {
    /// Check the configuration fault class of the error taxonomy. Called
    /// once, before any processing.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if !(-12..=12).contains(&self.time_shift_hours) {
            return Err(MigrateError::TimeShiftOutOfRange(self.time_shift_hours));
        }
        Ok(())
    }
}
