//! Multi-document processing.
//!
//! Every document is processed independently. A failing document is counted,
//! logged and recorded in the summary; it never stops the run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::segment::SegmentStats;

use super::{process_file, ConvertOptions, ConverterRegistry, DocumentReport};

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Per-document pipeline options
    pub convert: ConvertOptions,

    /// Process documents on the rayon thread pool
    pub parallel: bool,
}

impl BatchOptions {
    /// Create new batch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-document pipeline options.
    pub fn with_convert_options(mut self, options: ConvertOptions) -> Self {
        self.convert = options;
        self
    }

    /// Process documents one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            convert: ConvertOptions::default(),
            parallel: true,
        }
    }
}

/// One document that could not be processed.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
    pub error_kind: &'static str,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Documents processed successfully
    pub processed: usize,
    /// Documents that failed
    pub failed: usize,
    /// Blocks written across all documents
    pub blocks: u64,
    /// Shard files written across all documents
    pub shards: usize,
    /// Aggregated segmentation statistics
    pub stats: SegmentStats,
    /// Failed documents, in input order
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    fn add(&mut self, input: &Path, outcome: Result<DocumentReport>) {
        match outcome {
            Ok(report) => {
                self.processed += 1;
                self.blocks += report.blocks;
                self.shards += report.shards.len();
                self.stats.merge(&report.stats);
            }
            Err(e) => {
                self.failed += 1;
                self.failures.push(BatchFailure {
                    input: input.to_path_buf(),
                    error: e.to_string(),
                    error_kind: e.kind(),
                });
            }
        }
    }
}

/// Expand a batch input into document paths.
///
/// A `.txt` file is a list of paths, one per line; blank lines are ignored.
/// Any other path is a single document.
pub fn read_input_list(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    let is_list = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if !is_list {
        return Ok(vec![input.to_path_buf()]);
    }

    let content = std::fs::read_to_string(input)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Shard output path for a document: `{output_dir}/{file stem}.{ext}`.
pub fn output_path_for(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", output_stem(input), extension))
}

fn output_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default_file_id".to_string())
}

/// Output paths for a batch, one per input.
///
/// Inputs sharing a file stem get the input position appended
/// (`{stem}-{index}`). A planned path that is still taken is `None`.
pub fn plan_output_paths(
    inputs: &[PathBuf],
    output_dir: &Path,
    extension: &str,
) -> Vec<Option<PathBuf>> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *stem_counts.entry(output_stem(input)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let stem = output_stem(input);
            let name = if stem_counts[&stem] > 1 {
                format!("{}-{}.{}", stem, index, extension)
            } else {
                format!("{}.{}", stem, extension)
            };
            let path = output_dir.join(name);
            taken.insert(path.clone()).then_some(path)
        })
        .collect()
}

/// Process many documents, writing each one's shards into `output_dir`.
///
/// Relative figure URIs resolve against each document's own directory
/// unless an image root is configured.
pub fn run_batch(
    registry: &ConverterRegistry,
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    std::fs::create_dir_all(output_dir)?;
    let outputs = plan_output_paths(inputs, output_dir, &options.convert.shard.extension);

    let process = |(input, output): (&PathBuf, &Option<PathBuf>)| {
        let outcome = match output {
            Some(output) => {
                process_file(registry, input, output, &document_options(input, options))
            }
            None => Err(Error::InvalidConfig(format!(
                "output name for {} collides with another document",
                input.display()
            ))),
        };
        if let Err(e) = &outcome {
            log::error!("Failed to process {}: {}", input.display(), e);
        }
        outcome
    };

    let outcomes: Vec<Result<DocumentReport>> = if options.parallel {
        inputs.par_iter().zip(outputs.par_iter()).map(process).collect()
    } else {
        inputs.iter().zip(outputs.iter()).map(process).collect()
    };

    let mut summary = BatchSummary::default();
    for (input, outcome) in inputs.iter().zip(outcomes) {
        summary.add(input, outcome);
    }
    log::info!(
        "Batch done: {} processed, {} failed, {} blocks in {} shards",
        summary.processed,
        summary.failed,
        summary.blocks,
        summary.shards
    );
    Ok(summary)
}

fn document_options(input: &Path, options: &BatchOptions) -> ConvertOptions {
    let mut convert = options.convert.clone();
    if convert.segment.image_root.is_none() {
        if let Some(parent) = input.parent() {
            convert.segment = convert.segment.with_image_root(parent);
        }
    }
    convert
}
