//! Changeset building
//!
//! The source repository records history per file, so one logical commit
//! ("fixed the parser", touching five files) arrives as five unrelated
//! events. This module reconstructs the logical commits: it sorts the
//! normalized events into a deterministic timeline and clusters adjacent
//! events into changesets using author, comment and elapsed-time
//! heuristics.
//!
//! The sort key is (timestamp, author, message, path). Author and message
//! before path keeps same-author same-comment edits adjacent even when the
//! timestamps of a multi-file check-in differ by a few seconds, and the
//! path component makes the order total for otherwise identical events.
//!
//! Clustering chains from the most recently added member of the growing
//! changeset, not from its first event, so a long check-in of many files
//! stays together as long as consecutive events land within the window.

use std::collections::HashSet;

use crate::actions::TargetAction;
use crate::event::{Changeset, VersionEvent};

/// Window for joining events that share a non-empty comment. A deliberate
/// multi-file check-in can take a while per file.
pub const COMMENT_WINDOW_SECS: i64 = 600;

/// Window for joining events with an empty comment. Routine saves without
/// a comment cluster much more tightly.
pub const QUIET_WINDOW_SECS: i64 = 120;

/// Group normalized events into ordered changesets.
///
/// The output partitions the input exactly: every event lands in exactly
/// one changeset (except repeated tag values, which are dropped), and
/// concatenating the changesets reproduces the sorted event order. An
/// empty input yields an empty output; the zero-event case is reported
/// upstream before this runs.
pub fn build(events: &[VersionEvent]) -> Vec<Changeset> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.author.cmp(&b.author))
            .then_with(|| a.message.cmp(&b.message))
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut out = Vec::new();
    let mut seen_tags: HashSet<String> = HashSet::new();
    let mut current: Option<Changeset> = None;

    for event in sorted {
        if event.action == TargetAction::Tag {
            // A tag is a point-in-time marker, not a per-file operation: a
            // repeated tag value contributes nothing at all.
            if !seen_tags.insert(event.tag.clone()) {
                continue;
            }
            if let Some(done) = current.take() {
                out.push(done);
            }
            current = Some(Changeset::new(event));
            continue;
        }

        match current.as_mut() {
            Some(open) if joins(open.last(), &event) => open.push(event),
            Some(_) => {
                out.push(current.take().expect("checked above"));
                current = Some(Changeset::new(event));
            }
            None => current = Some(Changeset::new(event)),
        }
    }

    if let Some(done) = current {
        out.push(done);
    }
    out
}

/// The grouping predicate: same author, same comment, and close enough in
/// time to the most recent member.
fn joins(last: &VersionEvent, event: &VersionEvent) -> bool {
    if event.author != last.author || event.message != last.message {
        return false;
    }
    let window = if event.message.is_empty() {
        QUIET_WINDOW_SECS
    } else {
        COMMENT_WINDOW_SECS
    };
    (event.timestamp - last.timestamp).num_seconds() <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::TargetAction;
    use chrono::{TimeZone, Utc};

    fn add(path: &str, version: u32, author: &str, offset_secs: i64, message: &str) -> VersionEvent {
        VersionEvent {
            path: path.to_string(),
            version,
            author: author.to_string(),
            email: format!("{}@example.com", author.to_lowercase()),
            timestamp: Utc.with_ymd_and_hms(2004, 5, 14, 9, 0, 0).unwrap()
                + chrono::Duration::seconds(offset_secs),
            message: message.to_string(),
            tag: String::new(),
            is_latest: false,
            action: TargetAction::Add,
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(build(&[]).is_empty());
    }

    #[test]
    fn test_single_event_makes_one_changeset() {
        let out = build(&[add("a.c", 1, "Ann", 0, "")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1);
    }

    #[test]
    fn test_chained_threshold_uses_most_recent_member() {
        // Three events 400 s apart with a shared comment: each consecutive
        // gap is within the 600 s window even though the first and third
        // are 800 s apart, so chaining keeps all three together.
        let out = build(&[
            add("a.c", 1, "Ann", 0, "fix"),
            add("b.c", 1, "Ann", 400, "fix"),
            add("c.c", 1, "Ann", 800, "fix"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3);
    }
}
