use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Serialize)]
pub struct ChangeLogEntry<'a> {
    pub timestamp: &'a str,
    pub path: &'a Path,
    pub action: &'a str,
    pub changes: &'a [String],
}

/// Append one JSON line describing a committed file to `log_path`, keeping
/// only the newest entries.
pub fn record_change(log_path: &Path, path: &Path, action: &str, changes: &[String]) -> Result<()> {
    if let Some(dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
    }
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = ChangeLogEntry {
        timestamp: &timestamp,
        path,
        action,
        changes,
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_path)
        .with_context(|| format!("opening {log_path:?}"))?;
    writeln!(file, "{json}")?;
    truncate_log(log_path)?;
    Ok(())
}

/// Drop the oldest lines so at most `MAX_ENTRIES` remain.
fn truncate_log(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let mut kept = lines[lines.len() - MAX_ENTRIES..].join("\n");
    kept.push('\n');
    fs::write(path, kept).with_context(|| format!("rewriting {path:?}"))?;
    Ok(())
}
