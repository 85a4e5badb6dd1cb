//! # paperblocks
//!
//! Linearize structured academic papers and segment them into typed,
//! independently storable content blocks.
//!
//! A paper arrives as structured JSON (title, authors, abstract, body
//! paragraphs, figure/table/footnote/section entries and bibliography). It is
//! first flattened into a linear markdown document where structural regions
//! are wrapped in placeholder tags, then split into [`ContentBlock`]s
//! (text, table and figure records) that are written out in bounded-size
//! JSON Lines shards.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paperblocks::{parse_file, render};
//!
//! fn main() -> paperblocks::Result<()> {
//!     let paper = parse_file("2004.14974.json")?;
//!
//!     let options = render::RenderOptions::default();
//!     let markdown = render::to_markdown(&paper, &options)?;
//!     println!("{}", markdown);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Reference resolution**: figures, tables, footnotes and section
//!   cross-references are inlined in first-mention order
//! - **Bibliography**: citations numbered in first-seen order
//! - **Block segmentation**: dense per-document block ids, one payload per block
//! - **Sharding**: fixed-size JSON Lines shards and first-fit-decreasing
//!   consolidation with a failure log
//! - **Parallel processing**: Uses Rayon across documents

pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod render;
pub mod segment;
pub mod shard;

// Re-export commonly used types
pub use convert::batch::{run_batch, BatchOptions, BatchSummary};
pub use convert::{
    paper_to_blocks, process_file, ConvertOptions, ConverterRegistry, DocumentReport,
    PaperConverter,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, SourceFormat};
pub use error::{Error, Result};
pub use model::{
    Author, BibEntry, BlockType, Category, ContentBlock, DocumentIdentity, ImageSize, Paper,
    RefEntry,
};
pub use render::{Delimiters, HeadingDepth, JsonFormat, LinearDocument, RenderOptions};
pub use segment::{SegmentOptions, SegmentResult, SegmentStats};
pub use shard::{consolidate, ConsolidateOptions, ConsolidateSummary, ShardOptions};

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Parse a paper file into its structured form.
///
/// # Example
///
/// ```no_run
/// use paperblocks::parse_file;
///
/// let paper = parse_file("2004.14974.json").unwrap();
/// println!("Paragraphs: {}", paper.latex_parse.body_text.len());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Paper> {
    ConverterRegistry::with_defaults().convert(path.as_ref())
}

/// Parse a paper from JSON bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Paper> {
    Ok(Paper::from_json_slice(data)?)
}

/// Convert a paper file to its linear markdown document.
///
/// # Example
///
/// ```no_run
/// use paperblocks::to_markdown;
///
/// let markdown = to_markdown("2004.14974.json").unwrap();
/// std::fs::write("2004.14974.md", markdown).unwrap();
/// ```
pub fn to_markdown<P: AsRef<Path>>(path: P) -> Result<String> {
    to_markdown_with_options(path, &RenderOptions::default())
}

/// Convert a paper file to markdown with custom options.
pub fn to_markdown_with_options<P: AsRef<Path>>(
    path: P,
    options: &RenderOptions,
) -> Result<String> {
    let paper = parse_file(path)?;
    render::to_markdown(&paper, options)
}

/// Segment a paper file into content blocks.
pub fn to_blocks<P: AsRef<Path>>(path: P) -> Result<Vec<ContentBlock>> {
    Ok(Paperblocks::new().parse(path)?.to_blocks())
}

/// Segment a paper file and serialize the blocks as JSON.
///
/// # Example
///
/// ```no_run
/// use paperblocks::{to_json, JsonFormat};
///
/// let json = to_json("2004.14974.json", JsonFormat::Lines).unwrap();
/// std::fs::write("2004.14974.jsonl", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    render::blocks_to_json(&to_blocks(path)?, format)
}

/// Builder for converting and segmenting papers.
///
/// # Example
///
/// ```no_run
/// use paperblocks::Paperblocks;
///
/// let shards = Paperblocks::new()
///     .with_split_size(500)
///     .with_image_root("./figures")
///     .parse("2004.14974.json")?
///     .write_shards("out/2004.14974.jsonl")?;
/// # Ok::<(), paperblocks::Error>(())
/// ```
pub struct Paperblocks {
    options: ConvertOptions,
    registry: ConverterRegistry,
}

impl Paperblocks {
    /// Create a new builder with the default converters.
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
            registry: ConverterRegistry::with_defaults(),
        }
    }

    /// Register an additional source converter.
    pub fn with_converter(mut self, converter: std::sync::Arc<dyn PaperConverter>) -> Self {
        self.registry.register(converter);
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options.render = options;
        self
    }

    /// Set the heading depth mode.
    pub fn with_heading_depth(mut self, depth: HeadingDepth) -> Self {
        self.options.render = self.options.render.with_heading_depth(depth);
        self
    }

    /// Leave out the footnote and reference appendices.
    pub fn without_appendix(mut self) -> Self {
        self.options.render = self.options.render.with_appendix(false);
        self
    }

    /// Set the date stamped on blocks.
    pub fn with_processed_at(mut self, date: NaiveDate) -> Self {
        self.options.segment = self.options.segment.with_processed_at(date);
        self
    }

    /// Set the directory relative figure URIs are resolved against.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.segment = self.options.segment.with_image_root(root);
        self
    }

    /// Set the number of blocks per shard.
    pub fn with_split_size(mut self, size: usize) -> Self {
        self.options.shard = self.options.shard.with_split_size(size);
        self
    }

    /// Parse a paper file and return a result wrapper.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<PaperResult> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        let identity = DocumentIdentity::from_source(path, &data);
        let paper = self.registry.convert_source(path, &data)?;
        Ok(PaperResult {
            paper,
            identity,
            options: self.options,
        })
    }

    /// Parse a paper from JSON bytes under the given document id.
    pub fn parse_bytes(self, data: &[u8], file_id: impl Into<String>) -> Result<PaperResult> {
        let identity = DocumentIdentity::new(model::content_hash(data), file_id);
        let paper = Paper::from_json_slice(data)?;
        Ok(PaperResult {
            paper,
            identity,
            options: self.options,
        })
    }
}

impl Default for Paperblocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of parsing a paper.
pub struct PaperResult {
    /// The parsed paper
    pub paper: Paper,
    /// Identity stamped on every block
    pub identity: DocumentIdentity,
    options: ConvertOptions,
}

impl PaperResult {
    /// Convert to the linear markdown document.
    pub fn to_markdown(&self) -> Result<String> {
        render::to_markdown(&self.paper, &self.options.render)
    }

    /// Linearize into a paragraph list.
    pub fn linear_document(&self) -> LinearDocument {
        render::to_linear_document(&self.paper, &self.options.render)
    }

    /// Segment into content blocks.
    pub fn to_blocks(&self) -> Vec<ContentBlock> {
        self.to_blocks_with_stats().blocks
    }

    /// Segment into content blocks together with statistics.
    pub fn to_blocks_with_stats(&self) -> SegmentResult {
        paper_to_blocks(&self.paper, &self.identity, &self.options)
    }

    /// Serialize the blocks as JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::blocks_to_json(&self.to_blocks(), format)
    }

    /// Write the blocks as shards named after `output`.
    pub fn write_shards<P: AsRef<Path>>(&self, output: P) -> Result<Vec<PathBuf>> {
        shard::write_shards(self.to_blocks(), output.as_ref(), &self.options.shard)
    }

    /// Get the paper.
    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    /// Get the document identity.
    pub fn identity(&self) -> &DocumentIdentity {
        &self.identity
    }
}
