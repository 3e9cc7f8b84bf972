//! Operation history store
//!
//! Records what a user ran and on what: tool id, output filename, size,
//! content hash, timestamp. Persisted as a versioned JSON file so the
//! format can change without silently misreading old data; unknown
//! versions are rejected rather than guessed at.
//!
//! The store is best-effort and single-writer: one instance owns its
//! file. Writes go to a sibling temp file and are renamed into place, so
//! a failed write never corrupts existing history.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// On-disk format version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Default maximum number of retained entries.
pub const DEFAULT_CAP: usize = 200;

/// How many recently-used tools are remembered.
const RECENT_TOOLS_CAP: usize = 12;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed history file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported history format version {0} (supported: {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

/// One recorded operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Tool identifier, e.g. "merge" or "watermark"
    pub tool: String,
    /// Output filename presented to the user
    pub filename: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the output content
    pub sha256: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    #[serde(default)]
    entries: Vec<HistoryEntry>,
    #[serde(default)]
    recent_tools: Vec<String>,
}

impl Default for HistoryFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            entries: Vec::new(),
            recent_tools: Vec::new(),
        }
    }
}

/// File-backed operation history.
pub struct HistoryStore {
    path: PathBuf,
    data: HistoryFile,
    cap: usize,
}

impl HistoryStore {
    /// Open (or start) a history file. A missing or empty file starts
    /// fresh; a file with an unknown version is an error.
    pub fn open(path: impl Into<PathBuf>, cap: usize) -> Result<Self, HistoryError> {
        let path = path.into();

        let data = match fs::read(&path) {
            Ok(raw) if raw.is_empty() => HistoryFile::default(),
            Ok(raw) => {
                let parsed: HistoryFile = serde_json::from_slice(&raw)?;
                if parsed.version != FORMAT_VERSION {
                    return Err(HistoryError::UnsupportedVersion(parsed.version));
                }
                parsed
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HistoryFile::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data,
            cap: cap.max(1),
        })
    }

    /// Record a completed operation. The entry is persisted immediately.
    pub fn record(
        &mut self,
        tool: &str,
        filename: &str,
        output: &[u8],
    ) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            tool: tool.to_string(),
            filename: filename.to_string(),
            size_bytes: output.len() as u64,
            sha256: hex_digest(output),
            timestamp: Utc::now(),
        };

        self.data.entries.push(entry.clone());
        if self.data.entries.len() > self.cap {
            let excess = self.data.entries.len() - self.cap;
            self.data.entries.drain(..excess);
        }

        self.touch_tool(tool);
        self.save()?;
        Ok(entry)
    }

    /// Newest-first slice of the most recent entries.
    pub fn recent(&self, limit: usize) -> Vec<&HistoryEntry> {
        self.data.entries.iter().rev().take(limit).collect()
    }

    /// Most-recently-used tool ids, newest first, deduplicated.
    pub fn recent_tools(&self) -> &[String] {
        &self.data.recent_tools
    }

    pub fn len(&self) -> usize {
        self.data.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.entries.is_empty()
    }

    /// Drop all entries and persist the empty state.
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.data.entries.clear();
        self.data.recent_tools.clear();
        self.save()
    }

    fn touch_tool(&mut self, tool: &str) {
        self.data.recent_tools.retain(|t| t != tool);
        self.data.recent_tools.insert(0, tool.to_string());
        self.data.recent_tools.truncate(RECENT_TOOLS_CAP);
    }

    fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(&self.data)?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
