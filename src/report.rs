use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::file::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Fixed (or fixable) automatically.
    #[serde(rename = "log")]
    Fixable,
    /// Needs a human.
    #[serde(rename = "error")]
    Manual,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Fixable => "fixable",
            Severity::Manual => "manual",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub severity: Severity,
    pub normalization: &'static str,
    pub message: String,
}

/// Messages per file, keyed by the path the file had when it was opened.
#[derive(Debug, Default)]
pub struct Reporter {
    entries: BTreeMap<PathBuf, Vec<Entry>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, file: &File, normalization: &'static str, message: impl Into<String>) {
        self.push(file.path(), Severity::Fixable, normalization, message.into());
    }

    pub fn error(&mut self, file: &File, normalization: &'static str, message: impl Into<String>) {
        self.push(file.path(), Severity::Manual, normalization, message.into());
    }

    fn push(&mut self, path: &Path, severity: Severity, normalization: &'static str, message: String) {
        let entries = self.entries.entry(path.to_path_buf()).or_default();
        if entries.iter().any(|entry| entry.message == message) {
            return;
        }
        entries.push(Entry {
            severity,
            normalization,
            message,
        });
    }

    pub fn entries(&self, path: &Path) -> &[Entry] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_entries(&self, path: &Path) -> bool {
        !self.entries(path).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[Entry])> {
        self.entries
            .iter()
            .map(|(path, entries)| (path.as_path(), entries.as_slice()))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn files(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
