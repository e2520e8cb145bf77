//! Author identity mapping
//!
//! The source repository knows authors by login name only; the target
//! backends want a display name plus an email address. The user map is
//! built once per run from an optional JSON file plus auto-derived entries
//! for every source author the file does not cover, and is read-only from
//! then on.
//!
//! The JSON file maps source logins to identities:
//!
//! ```json
//! {
//!     "JSMITH": { "name": "Jane Smith", "email": "jane@example.com" }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// A target-side author identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Immutable source-login to identity mapping for one migration run.
#[derive(Debug, Default)]
pub struct UserMap {
    entries: HashMap<String, Identity>,
}

/// Load explicit user map entries from a JSON file.
///
/// # Arguments
/// * `path` - Path to the JSON user map file
///
/// # Returns
/// The parsed entries, or [`MigrateError::MalformedUserMap`] if the file
/// cannot be read or parsed.
pub fn load_user_map(path: &Path) -> Result<HashMap<String, Identity>, MigrateError> {
    let content = fs::read_to_string(path).map_err(|e| MigrateError::MalformedUserMap {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| MigrateError::MalformedUserMap {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl UserMap {
    /// Build the complete map for a run.
    ///
    /// Every author in `authors` that has no explicit entry gets one
    /// derived automatically: the identity name is the source login
    /// unchanged, and the email is synthesized from `email_domain` when one
    /// is configured, otherwise left empty.
    ///
    /// # Arguments
    /// * `explicit` - Entries loaded from the user map file, if any
    /// * `authors` - Every source author that appears in the history
    /// * `email_domain` - Optional domain for synthesized addresses
    pub fn build<'a>(
        explicit: HashMap<String, Identity>,
        authors: impl IntoIterator<Item = &'a str>,
        email_domain: Option<&str>,
    ) -> Self {
        let mut entries = explicit;
        for author in authors {
            if entries.contains_key(author) {
                continue;
            }
            let email = match email_domain {
                Some(domain) => format!("{}@{}", mail_local_part(author), domain),
                None => String::new(),
            };
            entries.insert(
                author.to_string(),
                Identity {
                    name: author.to_string(),
                    email,
                },
            );
        }
        Self { entries }
    }

    /// Look up the target identity for a source author.
    ///
    /// Fails with [`MigrateError::UnknownAuthor`] for an author that was
    /// never registered. Since the map is built from the same event list
    /// the normalizer reads, this indicates an internal consistency fault.
    pub fn lookup(&self, author: &str) -> Result<&Identity, MigrateError> {
        self.entries
            .get(author)
            .ok_or_else(|| MigrateError::UnknownAuthor(author.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive the local part of a synthesized email from a source login.
fn mail_local_part(author: &str) -> String {
    author
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
}
