//! Action vocabulary translation
//!
//! The legacy repository reports every history record with a free-text
//! action string ("Checked in $/src/main.c", "Labeled 'v1.2'", ...). This
//! module classifies those strings into a fixed source-side vocabulary and
//! maps that vocabulary onto the two actions the replay engine actually
//! performs on the target side: adding file content and tagging.
//!
//! The classification table is ordered and evaluated first-match-wins, so
//! a more specific prefix must appear before a shorter one that would
//! shadow it.

/// Normalized classification of a raw history record on the source side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceAction {
    Added,
    CheckedIn,
    Created,
    Labeled,
    Renamed,
    Moved,
    Deleted,
    Destroyed,
    Recovered,
    Shared,
    Branched,
    Pinned,
    Unpinned,
    RolledBack,
    Archived,
    Restored,
    /// Catch-all for action text that matches nothing in the table.
    /// Usually means the source system is a newer version with vocabulary
    /// this table has never seen; the normalizer turns it into a fatal
    /// fault rather than guessing.
    Other,
}

/// What the replay engine does with an event on the target side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetAction {
    /// Materialize this file version in the working area and commit it.
    Add,
    /// Apply a tag (possibly after a branch merge, depending on the
    /// branch model).
    Tag,
}

/// Ordered prefix table for classifying raw action text.
///
/// Order matters: "Checked in" must not be shadowed by a shorter prefix,
/// and "Unpinned" sits before nothing that could eat it, but keeping the
/// table in rough specificity order avoids surprises when entries are
/// added.
const ACTION_TABLE: &[(&str, SourceAction)] = &[
    ("Labeled", SourceAction::Labeled),
    ("Checked in", SourceAction::CheckedIn),
    ("Added", SourceAction::Added),
    ("Created", SourceAction::Created),
    ("Renamed", SourceAction::Renamed),
    ("Moved", SourceAction::Moved),
    ("Destroyed", SourceAction::Destroyed),
    ("Deleted", SourceAction::Deleted),
    ("Recovered", SourceAction::Recovered),
    ("Shared", SourceAction::Shared),
    ("Branched", SourceAction::Branched),
    ("Unpinned", SourceAction::Unpinned),
    ("Pinned", SourceAction::Pinned),
    ("Rolled back", SourceAction::RolledBack),
    ("Archived", SourceAction::Archived),
    ("Restored", SourceAction::Restored),
];

/// Classify a raw action string from the source repository.
///
/// Returns [`SourceAction::Other`] when nothing in the table matches;
/// callers must treat that as a reportable anomaly, not as a known action.
pub fn map_source_action(raw: &str) -> SourceAction {
    for (prefix, action) in ACTION_TABLE {
        if raw.starts_with(prefix) {
            return *action;
        }
    }
    SourceAction::Other
}

/// Map a source action onto the target vocabulary.
///
/// `None` means the action has no target-side meaning (deletions, shares,
/// pins and the like leave no trace in the replayed history) and the event
/// is dropped before changeset building.
pub fn target_action(action: SourceAction) -> Option<TargetAction> {
    use SourceAction::*;
    match action {
        Added | CheckedIn | Created | Branched | Recovered | Restored | RolledBack => {
            Some(TargetAction::Add)
        }
        Labeled => Some(TargetAction::Tag),
        Renamed | Moved | Deleted | Destroyed | Shared | Pinned | Unpinned | Archived | Other => {
            None
        }
    }
}
