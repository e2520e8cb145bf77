//! Fatal fault taxonomy for a migration run
//!
//! Only faults that must stop the run live here: configuration errors,
//! workspace precondition failures, and internal consistency failures.
//! Recoverable problems (a file that fails to fetch, a backend command
//! that exits non-zero) are plain `anyhow` errors, logged and counted by
//! the driver without aborting the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// Time shift outside the supported timezone correction range.
    #[error("time shift of {0} hours is outside the supported range -12..=12")]
    TimeShiftOutOfRange(i64),

    /// Branch model selector that is not one of the three known topologies.
    #[error("unknown branch model '{0}' (expected 1, 2 or 3)")]
    InvalidBranchModel(String),

    /// User map file that exists but cannot be parsed.
    #[error("user map {path}: {reason}")]
    MalformedUserMap { path: PathBuf, reason: String },

    /// Full migration requires a workspace with no files and no repository
    /// metadata.
    #[error("workspace {0} is not empty; full migration needs a fresh directory")]
    WorkspaceNotEmpty(PathBuf),

    /// Continuous migration requires an already-initialized repository.
    #[error("workspace {0} has no repository metadata; run a full migration first")]
    NotInitialized(PathBuf),

    /// An event referenced an author the user map never registered. The map
    /// is built from the same event list, so this is an internal
    /// consistency failure rather than a user error.
    #[error("author '{0}' has no user map entry")]
    UnknownAuthor(String),

    /// A raw action string fell through the whole action table. Treating it
    /// as any known action would silently misclassify history, so the run
    /// stops instead.
    #[error("unrecognized source action '{0}'")]
    UnrecognizedAction(String),

    /// The source project produced no version events at all.
    #[error("the source project contains no version events")]
    EmptyHistory,
}
