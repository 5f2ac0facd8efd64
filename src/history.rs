//! Cross-run streak tracking for top-ranked repositories.
//!
//! The history file is the only state that survives between pipeline runs.
//! It maps repo keys to streak records and carries the id of the most
//! recently processed report. Updates are a mark-and-sweep over a per-key
//! counter state machine: keys present in the current top list are
//! incremented (or freshly inserted at one), keys absent from it are deleted
//! outright. A streak can only grow through uninterrupted presence; any gap
//! resets it completely.

use crate::errors::{Error, Result};
use crate::models::ScoredRepo;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent streak record for a single repository.
///
/// `first_seen_*` is set once when the streak starts and never touched
/// again; `last_seen_*` is overwritten on every appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoHistory {
    pub weeks_in_top: u32,
    pub last_seen_report: String,
    pub last_seen_date: String,
    pub first_seen_report: String,
    pub first_seen_date: String,
}

/// Complete cross-run tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub latest_report: String,
    #[serde(default)]
    pub history: HashMap<String, RepoHistory>,
}

/// Owns the history file path and its serialization.
///
/// Load, update, and save are discrete operations; the caller decides when
/// an updated history is persisted.
pub struct HistoryStore {
    history_path: PathBuf,
}

impl HistoryStore {
    pub fn new(history_path: impl Into<PathBuf>) -> Self {
        Self {
            history_path: history_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.history_path
    }

    // I/O operations

    /// Load persisted history.
    ///
    /// A missing file is the expected bootstrap state and yields an empty
    /// history. A file that exists but cannot be read or parsed is an
    /// error; silently replacing it would erase legitimate streak data.
    pub fn load(&self) -> Result<History> {
        if !self.history_path.exists() {
            log::info!(
                "History file {} does not exist, starting fresh",
                self.history_path.display()
            );
            return Ok(History::default());
        }

        let data = fs::read_to_string(&self.history_path).map_err(|e| {
            Error::file_system_io("failed to read history file", &self.history_path, e)
        })?;

        let history: History = serde_json::from_str(&data).map_err(|e| {
            Error::file_system(
                format!("failed to parse history file: {}", e),
                &self.history_path,
            )
        })?;

        log::info!(
            "Loaded history from {} ({} tracked repos)",
            self.history_path.display(),
            history.history.len()
        );

        Ok(history)
    }

    /// Load the persisted history and fold the current top list into it.
    ///
    /// The caller is responsible for persisting the returned history.
    pub fn update(
        &self,
        current_top: &[ScoredRepo],
        report_id: &str,
        report_date: &str,
    ) -> Result<History> {
        let history = self.load()?;
        let updated = apply_update(history, current_top, report_id, report_date);

        log::info!(
            "Updated history for report {}: {} repos tracked",
            report_id,
            updated.history.len()
        );

        Ok(updated)
    }

    /// Persist the history, creating the parent directory as needed.
    ///
    /// Writes to a temporary file in the same directory and renames it over
    /// the target, so a crash mid-write never corrupts the existing state.
    pub fn save(&self, history: &History) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::file_system_io("failed to create history directory", parent, e)
            })?;
        }

        let data = serde_json::to_string_pretty(history)?;
        let temp_path = temp_write_path(&self.history_path);

        fs::write(&temp_path, &data)
            .map_err(|e| Error::file_system_io("failed to write history file", &temp_path, e))?;
        fs::rename(&temp_path, &self.history_path).map_err(|e| {
            Error::file_system_io("failed to replace history file", &self.history_path, e)
        })?;

        log::info!(
            "Saved history to {} ({} tracked repos)",
            self.history_path.display(),
            history.history.len()
        );

        Ok(())
    }
}

// Pure functions

/// Fold a run's top list into the history (pure).
///
/// Keys present in `current_top` are incremented with their last-seen
/// fields overwritten, or inserted fresh at `weeks_in_top = 1` with
/// first-seen and last-seen both set to the current run. Keys absent from
/// `current_top` are deleted; re-entering later starts a brand-new streak.
pub fn apply_update(
    mut history: History,
    current_top: &[ScoredRepo],
    report_id: &str,
    report_date: &str,
) -> History {
    let current_keys: HashSet<String> = current_top.iter().map(|repo| repo.key()).collect();

    for repo in current_top {
        let key = repo.key();
        match history.history.get_mut(&key) {
            Some(entry) => {
                entry.weeks_in_top += 1;
                entry.last_seen_report = report_id.to_string();
                entry.last_seen_date = report_date.to_string();
            }
            None => {
                history.history.insert(
                    key,
                    RepoHistory {
                        weeks_in_top: 1,
                        last_seen_report: report_id.to_string(),
                        last_seen_date: report_date.to_string(),
                        first_seen_report: report_id.to_string(),
                        first_seen_date: report_date.to_string(),
                    },
                );
            }
        }
    }

    history
        .history
        .retain(|key, _| current_keys.contains(key));
    history.latest_report = report_id.to_string();

    history
}

fn temp_write_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("history.json");
    target.with_file_name(format!("{}.tmp.{}", name, std::process::id()))
}
