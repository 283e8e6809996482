//! Leaderboard: entries, submission validation and the stores behind the HTTP endpoint.

pub mod client;
pub mod server;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Rows returned by `GET /api/leaderboard`.
pub const TOP_LIMIT: usize = 10;

const FILENAME: &str = "leaderboard.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated submission, not yet timestamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Invalid data")]
    InvalidData,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt leaderboard file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("leaderboard store lock poisoned")]
    Poisoned,
}

impl NewEntry {
    /// `name` must be a non-empty string and `score` a JSON number that fits an i64.
    pub fn from_json(body: &[u8]) -> Result<Self, SubmissionError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| SubmissionError::InvalidData)?;
        let name = match value.get("name") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(SubmissionError::InvalidData),
        };
        let score = value
            .get("score")
            .and_then(score_from_number)
            .ok_or(SubmissionError::InvalidData)?;
        Ok(Self { name, score })
    }

    pub fn stamp(self, created_at: DateTime<Utc>) -> Entry {
        Entry {
            name: self.name,
            score: self.score,
            created_at,
        }
    }
}

/// Integral JSON numbers only; `42.0` is accepted, `42.5` and `"42"` are not.
fn score_from_number(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

/// Highest score first; ties go to whoever got there first.
pub fn rank(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.created_at.cmp(&b.created_at)));
}

pub trait LeaderboardStore: Send + Sync {
    fn top(&self, limit: usize) -> Result<Vec<Entry>, StoreError>;
    fn insert(&self, entry: NewEntry) -> Result<(), StoreError>;
}

/// In-process store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for MemoryStore {
    fn top(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?.clone();
        rank(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    fn insert(&self, entry: NewEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(entry.stamp(Utc::now()));
        Ok(())
    }
}

/// Whole table kept in one JSON array file, rewritten on every insert.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `$XDG_CONFIG_HOME/stackfall/leaderboard.json`, falling back to `~/.config`.
    pub fn default_path() -> PathBuf {
        default_path_from(|k| std::env::var(k).ok())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Entry>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl LeaderboardStore for JsonFileStore {
    fn top(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_all()?;
        rank(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    fn insert(&self, entry: NewEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_all()?;
        entries.push(entry.stamp(Utc::now()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn default_path_from<F>(mut get_env: F) -> PathBuf
where
    F: FnMut(&str) -> Option<String>,
{
    let base = match get_env("XDG_CONFIG_HOME").filter(|x| !x.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => get_env("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    base.join("stackfall").join(FILENAME)
}

#[cfg(test)]
pub(crate) fn scratch_path(tag: &str) -> PathBuf {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("stackfall-{}-{}-{}", tag, std::process::id(), n))
        .join(FILENAME)
}
