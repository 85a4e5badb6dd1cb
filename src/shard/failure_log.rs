//! Append-only JSON Lines log of per-file failures.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One failed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Error message
    pub error: String,
    /// Stable error kind, see [`Error::kind`]
    pub error_kind: String,
    /// Error with its chain of causes
    pub traceback: String,
    /// Input file that failed
    pub file: String,
    /// Output the file was destined for
    pub destination: String,
}

impl FailureRecord {
    pub fn from_error(error: &Error, file: &Path, destination: &Path) -> Self {
        Self {
            error: error.to_string(),
            error_kind: error.kind().to_string(),
            traceback: error.chain(),
            file: file.display().to_string(),
            destination: destination.display().to_string(),
        }
    }
}

/// Failure log file. The file is created on the first record.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
    count: usize,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append one record.
    pub fn record(&mut self, record: &FailureRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        self.count += 1;
        Ok(())
    }
}

/// Load a failure log, skipping lines that are not valid records.
pub fn load_failure_log(path: &Path) -> Result<Vec<FailureRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FailureRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!(
                "Skipping malformed line {} in {}: {}",
                index + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(records)
}
