//! History normalization
//!
//! A stateless transform over the raw event list: remap authors through
//! the user map, shift timestamps by the configured timezone correction,
//! and translate raw action text into the target action vocabulary.
//! Events whose action has no target meaning are dropped here, before
//! changeset building ever sees them. No reordering happens in this pass;
//! ordering belongs to the changeset builder.

use chrono::Duration;

use crate::actions::{self, SourceAction};
use crate::error::MigrateError;
use crate::event::{RawEvent, VersionEvent};
use crate::usermap::UserMap;

/// Normalize a raw event list.
///
/// # Arguments
/// * `raw` - Events as reported by the source history provider
/// * `users` - The user map built for this run
/// * `time_shift_hours` - Timezone correction, already range-checked by
///   the configuration layer
///
/// # Returns
/// The normalized events, in the input order, minus events with no
/// target-side meaning. Fails with [`MigrateError::UnrecognizedAction`]
/// when a raw action string matches nothing in the action table, and with
/// [`MigrateError::UnknownAuthor`] on a user map miss.
pub fn normalize(
    raw: &[RawEvent],
    users: &UserMap,
    time_shift_hours: i64,
) -> Result<Vec<VersionEvent>, MigrateError> {
    let shift = Duration::hours(time_shift_hours);
    let mut out = Vec::with_capacity(raw.len());
    for event in raw {
        let source = actions::map_source_action(&event.action);
        if source == SourceAction::Other {
            return Err(MigrateError::UnrecognizedAction(event.action.clone()));
        }
        let Some(action) = actions::target_action(source) else {
            continue;
        };
        let identity = users.lookup(&event.author)?;
        out.push(VersionEvent {
            path: event.path.clone(),
            version: event.version,
            author: identity.name.clone(),
            email: identity.email.clone(),
            timestamp: event.timestamp + shift,
            message: event.comment.clone(),
            tag: event.label.clone(),
            is_latest: event.is_latest,
            action,
        });
    }
    Ok(out)
}
