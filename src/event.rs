//! History event data model
//!
//! Two event shapes exist on purpose: [`RawEvent`] is what the source
//! history provider hands over, with the author still in source-repository
//! form and the action still free text. [`VersionEvent`] is the normalized
//! form the rest of the pipeline works with. Keeping them separate means
//! nothing downstream ever has to wonder which stage an event is in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::TargetAction;

/// One history record for one file, exactly as the source repository
/// reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Source-repository path of the file.
    pub path: String,
    /// Version number, strictly increasing per file.
    pub version: u32,
    /// Raw action text, e.g. "Checked in $/src/main.c".
    pub action: String,
    /// Source-repository author identity.
    pub author: String,
    /// When the event happened, in the source repository's clock.
    pub timestamp: DateTime<Utc>,
    /// Free-text comment, often empty.
    #[serde(default)]
    pub comment: String,
    /// Label text, empty unless the event is a label operation.
    #[serde(default)]
    pub label: String,
    /// True iff this is the newest version of its file at analysis time.
    #[serde(default)]
    pub is_latest: bool,
}

/// A normalized version event: author remapped, timestamp shifted, action
/// translated to the target vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionEvent {
    pub path: String,
    pub version: u32,
    /// Target-side author name.
    pub author: String,
    /// Target-side author email, possibly empty.
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub tag: String,
    /// "Fetch latest" and "fetch version N" are different request shapes
    /// against the source provider, so this flag survives normalization.
    pub is_latest: bool,
    pub action: TargetAction,
}

/// An ordered, non-empty group of events replayed as one atomic commit.
///
/// Built once by the changeset builder and never modified afterwards; the
/// driver consumes each changeset exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    events: Vec<VersionEvent>,
}

impl Changeset {
    pub(crate) fn new(first: VersionEvent) -> Self {
        Self {
            events: vec![first],
        }
    }

    pub(crate) fn push(&mut self, event: VersionEvent) {
        self.events.push(event);
    }

    /// The first event; carries the changeset-level timestamp used for
    /// cursor comparisons and reporting.
    pub fn anchor(&self) -> &VersionEvent {
        &self.events[0]
    }

    /// The last event; decides the changeset's terminal action (commit or
    /// tag) during replay.
    pub fn last(&self) -> &VersionEvent {
        self.events.last().expect("changeset is never empty")
    }

    pub fn events(&self) -> &[VersionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
