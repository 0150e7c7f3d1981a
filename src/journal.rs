use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::data_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    Duplicated,
    Deleted,
    Completed,
}

/// One mutation against the task service, written before the next one is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub event: JournalEvent,
    pub task_gid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_gid: Option<String>,
}

pub fn default_path() -> PathBuf {
    data_dir().join("journal.jsonl")
}

/// Append-only JSONL trail of a sprint close.
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// The most recent entries, oldest first. Unreadable lines are skipped.
    pub fn read_events(&self, limit: Option<usize>) -> Vec<JournalEntry> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut events: Vec<JournalEntry> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        if let Some(limit) = limit {
            let len = events.len();
            if len > limit {
                events = events.split_off(len - limit);
            }
        }

        events
    }
}

pub fn new_entry(
    event: JournalEvent,
    task_gid: &str,
    task_name: Option<&str>,
    duplicate_gid: Option<&str>,
) -> JournalEntry {
    JournalEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        event,
        task_gid: task_gid.to_string(),
        task_name: task_name.map(String::from),
        duplicate_gid: duplicate_gid.map(String::from),
    }
}
