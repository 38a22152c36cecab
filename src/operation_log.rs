use crate::config::Network;
use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name
const OPERATION_LOG_FILE: &str = "config_changes.log";

/// Get the full path to the change log inside `dir`
pub fn log_path(dir: &Path) -> PathBuf {
    dir.join(OPERATION_LOG_FILE)
}

/// Append a structured entry describing an applied configuration change.
pub fn append_log(dir: &Path, operation: &str, network: Network, details: impl AsRef<str>) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let timestamp = Utc::now().to_rfc3339();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(dir))?;

    writeln!(
        file,
        "[{}] network={} operation={}",
        timestamp, network, operation
    )?;

    let body = details.as_ref();
    if body.trim().is_empty() {
        writeln!(file, "  (no additional details)")?;
    } else {
        for line in body.lines() {
            if line.trim().is_empty() {
                writeln!(file)?;
            } else {
                writeln!(file, "  {}", line)?;
            }
        }
    }

    writeln!(file)?;
    Ok(())
}

/// Read the entire log file content
pub fn read_log(dir: &Path) -> Result<String> {
    let path = log_path(dir);
    if path.exists() {
        Ok(fs::read_to_string(&path)?)
    } else {
        Ok(String::new())
    }
}
