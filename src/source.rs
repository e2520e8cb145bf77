//! Source history provider contract
//!
//! The core never talks to the legacy repository directly; it consumes
//! this trait. The proprietary automation interface of the original
//! system lives behind the same contract in its own integration, out of
//! tree. What ships here is [`JsonExportSource`], a provider backed by a
//! JSON dump of the legacy repository, which is enough to run migrations
//! from an export and to drive the integration tests.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::event::RawEvent;

/// Read access to the legacy repository's history and file contents.
pub trait SourceHistory {
    /// Recursively enumerate every file under the project root. Only leaf
    /// files are returned, never directories.
    fn list_files(&self) -> Result<Vec<String>>;

    /// All recorded version events for one file, oldest first.
    fn events_for_file(&self, path: &str) -> Result<Vec<RawEvent>>;

    /// Write one version of a file into the workspace.
    ///
    /// `version` of `None` requests the latest version. This is a
    /// different request shape from naming the newest version number
    /// explicitly, and the two are not interchangeable against the
    /// original source system; callers must pass `None` when they mean
    /// "latest".
    fn fetch_content(&self, path: &str, version: Option<u32>, workspace: &Path) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ExportVersion {
    version: u32,
    action: String,
    author: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExportFile {
    path: String,
    versions: Vec<ExportVersion>,
}

#[derive(Debug, Deserialize)]
struct Export {
    files: Vec<ExportFile>,
}

/// Provider backed by a JSON export of the legacy repository.
///
/// The export carries, per file, the full version event list plus the
/// content of each version:
///
/// ```json
/// {
///   "files": [
///     {
///       "path": "$/project/src/main.c",
///       "versions": [
///         {
///           "version": 1,
///           "action": "Added main.c",
///           "author": "JSMITH",
///           "timestamp": "2004-05-14T09:00:00Z",
///           "comment": "first cut",
///           "content": "int main() { return 0; }\n"
///         }
///       ]
///     }
///   ]
/// }
/// ```
pub struct JsonExportSource {
    export: Export,
}

impl JsonExportSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read history export {}", path.display()))?;
        let export: Export = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse history export {}", path.display()))?;
        Ok(Self { export })
    }

    fn file(&self, path: &str) -> Result<&ExportFile> {
        self.export
            .files
            .iter()
            .find(|f| f.path == path)
            .ok_or_else(|| anyhow!("file {path} is not in the export"))
    }
}

/// Strip the legacy repository root marker so paths can be joined under
/// the workspace.
pub fn workspace_relative(path: &str) -> &str {
    path.trim_start_matches("$/")
}

impl SourceHistory for JsonExportSource {
    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.export.files.iter().map(|f| f.path.clone()).collect())
    }

    fn events_for_file(&self, path: &str) -> Result<Vec<RawEvent>> {
        let file = self.file(path)?;
        let newest = file.versions.iter().map(|v| v.version).max().unwrap_or(0);
        Ok(file
            .versions
            .iter()
            .map(|v| RawEvent {
                path: file.path.clone(),
                version: v.version,
                action: v.action.clone(),
                author: v.author.clone(),
                timestamp: v.timestamp,
                comment: v.comment.clone(),
                label: v.label.clone(),
                is_latest: v.version == newest,
            })
            .collect())
    }

    fn fetch_content(&self, path: &str, version: Option<u32>, workspace: &Path) -> Result<()> {
        let file = self.file(path)?;
        let found = match version {
            Some(n) => file.versions.iter().find(|v| v.version == n),
            None => file.versions.iter().max_by_key(|v| v.version),
        };
        let found =
            found.ok_or_else(|| anyhow!("file {path} has no version {version:?} in the export"))?;
        let dest = workspace.join(workspace_relative(path));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&dest, &found.content)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(())
    }
}
