//! revport - legacy VCS history replay
//!
//! Reconstructs the revision history of a legacy, centralized version
//! control repository and replays it into a modern distributed one as
//! atomic, author-attributed, timestamped commits and tags.
//!
//! # Architecture
//!
//! The pipeline runs strictly left to right:
//!
//! - **Source layer**: the [`source::SourceHistory`] trait supplies raw
//!   per-file version events and file contents.
//! - **Reconstruction layer**: [`normalize`] remaps authors and
//!   timestamps and translates actions; [`changeset`] sorts the events
//!   into a timeline and clusters them into logical changesets.
//! - **Replay layer**: [`driver::MigrationDriver`] walks the changeset
//!   stream and issues operations against a [`backend::VcsBackend`]
//!   adapter (Git, Mercurial or Bazaar).
//!
//! Everything is synchronous and single-threaded on purpose: each commit
//! is the parent of the next, so there is nothing to parallelize.

pub mod actions;
pub mod backend;
pub mod changeset;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod normalize;
pub mod source;
pub mod usermap;

pub use actions::{SourceAction, TargetAction};
pub use backend::{BzrBackend, CommitInfo, GitBackend, HgBackend, VcsBackend};
pub use config::{BranchModel, MigrationConfig, RunMode};
pub use driver::{AnalysisReport, MigrationDriver, RunStats};
pub use error::MigrateError;
pub use event::{Changeset, RawEvent, VersionEvent};
pub use source::{JsonExportSource, SourceHistory};
pub use usermap::{Identity, UserMap};
