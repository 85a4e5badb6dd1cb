//! Consolidation of many shard files into fewer, size-bounded files.
//!
//! Inputs are discovered recursively, grouped by first-fit-decreasing
//! packing on their byte size, and each group is written to one
//! `shard_NNNNN` file. Input files are read one at a time. A file that cannot
//! be read or does not match the block schema is logged to the failure log
//! and skipped; the remaining files of its group are still written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

use super::failure_log::{FailureLog, FailureRecord};
use super::jsonl::{read_shard, write_blocks};
use super::pack::pack_first_fit_decreasing;

/// Default byte target per consolidated file (5 GiB).
pub const DEFAULT_TARGET_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Options for shard consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    /// Approximate upper bound on output file size
    pub target_bytes: u64,

    /// Extension of input and output shard files
    pub extension: String,

    /// Failure log path; defaults to `failures.jsonl` in the output directory
    pub failure_log: Option<PathBuf>,
}

impl ConsolidateOptions {
    /// Create new consolidation options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the byte target per output file.
    pub fn with_target_bytes(mut self, bytes: u64) -> Self {
        self.target_bytes = bytes;
        self
    }

    /// Set the shard file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the failure log path.
    pub fn with_failure_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.failure_log = Some(path.into());
        self
    }
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            target_bytes: DEFAULT_TARGET_BYTES,
            extension: "jsonl".to_string(),
            failure_log: None,
        }
    }
}

/// Outcome of a consolidation run.
#[derive(Debug, Clone, Default)]
pub struct ConsolidateSummary {
    /// Input files discovered
    pub inputs: usize,
    /// Input files merged into an output
    pub merged: usize,
    /// Input files that failed
    pub failed: usize,
    /// Blocks written
    pub blocks: u64,
    /// Output files, in index order
    pub outputs: Vec<PathBuf>,
    /// Failure log path
    pub failure_log: PathBuf,
}

/// Result of walking an input directory.
#[derive(Debug, Default)]
pub struct ShardDiscovery {
    /// Shard files found, sorted by path
    pub paths: Vec<PathBuf>,
    /// Entries the walk could not read
    pub errors: Vec<(PathBuf, Error)>,
}

/// Shard files under `dir` with the given extension.
///
/// Unreadable entries and symlink loops do not stop the walk; they are
/// collected in [`ShardDiscovery::errors`].
pub fn discover_shards(dir: &Path, extension: &str) -> ShardDiscovery {
    let mut discovery = ShardDiscovery::default();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                discovery.errors.push((path, e.into()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            discovery.paths.push(entry.into_path());
        }
    }
    discovery.paths.sort();
    discovery
}

/// Name of consolidated file number `index`.
pub fn consolidated_name(index: usize, extension: &str) -> String {
    format!("shard_{:05}.{}", index, extension)
}

/// Merge the shards under `input_dir` into `output_dir`.
pub fn consolidate(
    input_dir: &Path,
    output_dir: &Path,
    options: &ConsolidateOptions,
) -> Result<ConsolidateSummary> {
    if !input_dir.exists() {
        return Err(Error::InputNotFound(input_dir.to_path_buf()));
    }
    if options.target_bytes == 0 {
        return Err(Error::InvalidConfig(
            "target bytes must be greater than zero".to_string(),
        ));
    }
    std::fs::create_dir_all(output_dir)?;

    let log_path = options
        .failure_log
        .clone()
        .unwrap_or_else(|| output_dir.join("failures.jsonl"));
    let mut failures = FailureLog::new(&log_path);
    let mut summary = ConsolidateSummary {
        failure_log: log_path,
        ..Default::default()
    };

    let discovery = discover_shards(input_dir, &options.extension);
    for (path, error) in &discovery.errors {
        record_failure(&mut failures, error, path, output_dir);
        summary.failed += 1;
    }

    let output_root = output_dir.canonicalize()?;
    let mut sized = Vec::new();
    for path in discovery.paths {
        let inside_output = path
            .canonicalize()
            .map(|p| p.starts_with(&output_root))
            .unwrap_or(false);
        if inside_output {
            continue;
        }
        summary.inputs += 1;
        match std::fs::metadata(&path) {
            Ok(meta) => sized.push((path, meta.len())),
            Err(e) => {
                record_failure(&mut failures, &Error::Io(e), &path, output_dir);
                summary.failed += 1;
            }
        }
    }

    let sized_len = sized.len();
    let bins = pack_first_fit_decreasing(sized, options.target_bytes);
    log::info!(
        "Packing {} shard files into {} groups",
        sized_len,
        bins.len()
    );

    for bin in bins {
        let destination = output_dir.join(consolidated_name(summary.outputs.len(), &options.extension));
        let mut writer: Option<BufWriter<File>> = None;

        for path in &bin.items {
            let merged = read_shard(path).and_then(|blocks| {
                let mut buffer = Vec::new();
                write_blocks(&mut buffer, &blocks)?;
                if writer.is_none() {
                    writer = Some(BufWriter::new(File::create(&destination)?));
                }
                if let Some(out) = writer.as_mut() {
                    out.write_all(&buffer)?;
                }
                Ok(blocks.len() as u64)
            });
            match merged {
                Ok(count) => {
                    summary.merged += 1;
                    summary.blocks += count;
                }
                Err(e) => {
                    record_failure(&mut failures, &e, path, &destination);
                    summary.failed += 1;
                }
            }
        }

        if let Some(mut out) = writer {
            out.flush()?;
            log::info!("{} generated", destination.display());
            summary.outputs.push(destination);
        }
    }

    Ok(summary)
}

fn record_failure(failures: &mut FailureLog, error: &Error, file: &Path, destination: &Path) {
    log::error!("Failed to merge {}: {}", file.display(), error);
    let record = FailureRecord::from_error(error, file, destination);
    if let Err(e) = failures.record(&record) {
        log::error!(
            "Failed to write failure log {}: {}",
            failures.path().display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidated_name() {
        assert_eq!(consolidated_name(0, "jsonl"), "shard_00000.jsonl");
        assert_eq!(consolidated_name(123, "jsonl"), "shard_00123.jsonl");
    }

    #[test]
    fn test_default_target() {
        assert_eq!(ConsolidateOptions::default().target_bytes, 5_368_709_120);
    }
}
