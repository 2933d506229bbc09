use anyhow::{Context, Result};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

pub const MAX_ENTRIES: usize = 1000;

/// Past commands, oldest first, mirrored to a newline separated file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<String>,
    index: Option<usize>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            index: None,
        }
    }

    /// Reads the history file, creating it empty if it doesn't exist yet.
    pub fn load(&mut self) -> Result<()> {
        self.index = None;
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.entries.clear();
                fs::write(&self.path, "")
                    .with_context(|| format!("create history file {}", self.path.display()))?;
                return Ok(());
            }
            Err(e) => {
                self.entries.clear();
                return Err(e)
                    .with_context(|| format!("read history file {}", self.path.display()));
            }
        };

        self.entries = contents
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.entries.dedup();
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(0..excess);
        }
        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "history loaded"
        );
        Ok(())
    }

    /// Records a command and rewrites the file.
    ///
    /// Returns `Ok(false)` for empty commands and for repeats of the newest entry. A failed write
    /// still leaves the command in memory.
    pub fn add(&mut self, cmd: &str) -> Result<bool> {
        if cmd.is_empty() || self.entries.last().is_some_and(|last| last == cmd) {
            return Ok(false);
        }
        self.entries.push(cmd.to_string());
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(0..excess);
        }
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> Result<()> {
        fs::write(&self.path, self.entries.join("\n"))
            .with_context(|| format!("write history file {}", self.path.display()))
    }

    /// Steps back one entry, starting from the newest. Stops at the oldest.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next_index = match self.index {
            Some(idx) => idx.saturating_sub(1),
            None => self.entries.len() - 1,
        };
        self.index = Some(next_index);
        Some(&self.entries[next_index])
    }

    /// Steps forward one entry.
    ///
    /// `None` means we weren't navigating. Stepping past the newest entry ends navigation and
    /// yields an empty line.
    pub fn next(&mut self) -> Option<&str> {
        let idx = self.index?;
        if idx + 1 >= self.entries.len() {
            self.index = None;
            return Some("");
        }
        self.index = Some(idx + 1);
        Some(&self.entries[idx + 1])
    }

    pub fn reset_navigation(&mut self) {
        self.index = None;
    }

    pub fn navigation_index(&self) -> Option<usize> {
        self.index
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
