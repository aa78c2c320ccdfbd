//! Download history
//!
//! A flat text file holding one completed series name per line. Appends are
//! idempotent: a name already present as an exact line is never written again.
//! The read-check-append sequence runs under an exclusive advisory lock so two
//! runs sharing one history file cannot both append the same name.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

use crate::errors::{HistoryError, HistoryResult};

/// Append-only record of completed series
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `name` unless it is already present
    ///
    /// Creates the file if absent. Returns `true` when a line was appended.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Io` if the file cannot be locked, read or written
    pub async fn add(&self, name: &str) -> HistoryResult<bool> {
        let path = self.path.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || append_unique(&path, &name))
            .await
            .map_err(|e| HistoryError::Task(e.to_string()))?
    }

    /// Every line of the file in order, blank lines included; empty if the
    /// file does not exist
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Io` if an existing file cannot be read
    pub async fn list(&self) -> HistoryResult<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_lines(&content).map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(HistoryError::Io(e)),
        }
    }

    /// Whether `name` has been recorded
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Io` if an existing file cannot be read
    pub async fn contains(&self, name: &str) -> HistoryResult<bool> {
        Ok(self.list().await?.iter().any(|line| line == name))
    }
}

fn parse_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(|line| line.trim_end_matches('\r'))
}

fn append_unique(path: &Path, name: &str) -> HistoryResult<bool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    let mut lock = RwLock::new(file);
    let mut guard = lock.write()?;

    let mut content = String::new();
    guard.read_to_string(&mut content)?;

    if parse_lines(&content).any(|line| line == name) {
        tracing::debug!("'{}' already recorded in {}", name, path.display());
        return Ok(false);
    }

    let mut record = String::with_capacity(name.len() + 2);
    if !content.is_empty() && !content.ends_with('\n') {
        record.push('\n');
    }
    record.push_str(name);
    record.push('\n');

    guard.write_all(record.as_bytes())?;
    guard.flush()?;

    tracing::info!("Recorded '{}' in {}", name, path.display());
    Ok(true)
}
