//! Paper conversion pipeline with a plugin architecture for source formats.
//!
//! A [`PaperConverter`] turns a source file into a [`Paper`]. The
//! [`ConverterRegistry`] dispatches on file extension and falls back to
//! content detection. [`process_file`] runs one document end to end:
//! hash, convert, linearize, segment and shard.
//!
//! # Example
//!
//! ```no_run
//! use paperblocks::convert::{process_file, ConvertOptions, ConverterRegistry};
//! use std::path::Path;
//!
//! fn main() -> paperblocks::Result<()> {
//!     let registry = ConverterRegistry::with_defaults();
//!     let report = process_file(
//!         &registry,
//!         Path::new("2004.14974.json"),
//!         Path::new("out/2004.14974.jsonl"),
//!         &ConvertOptions::default(),
//!     )?;
//!     println!("{} blocks in {} shards", report.blocks, report.shards.len());
//!     Ok(())
//! }
//! ```

pub mod batch;
mod json;

pub use json::JsonPaperConverter;

use crate::detect::{detect_format_from_bytes, SourceFormat};
use crate::error::{Error, Result};
use crate::model::{DocumentIdentity, Paper};
use crate::render::{to_linear_document, RenderOptions};
use crate::segment::{ImageLoader, SegmentOptions, SegmentResult, SegmentStats, Segmenter};
use crate::shard::{write_shards, ShardOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for the conversion pipeline.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Linearization options
    pub render: RenderOptions,

    /// Segmentation options
    pub segment: SegmentOptions,

    /// Shard output options
    pub shard: ShardOptions,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Set segmentation options.
    pub fn with_segment_options(mut self, options: SegmentOptions) -> Self {
        self.segment = options;
        self
    }

    /// Set shard options.
    pub fn with_shard_options(mut self, options: ShardOptions) -> Self {
        self.shard = options;
        self
    }

    /// Segment options using the render delimiters.
    pub fn effective_segment_options(&self) -> SegmentOptions {
        self.segment
            .clone()
            .with_delimiters(self.render.delimiters.clone())
    }
}

/// Trait for paper converters.
///
/// Implement this trait to add support for a new source format.
pub trait PaperConverter: Send + Sync {
    /// Get the supported file extensions for this converter.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["json"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this converter.
    fn name(&self) -> &str;

    /// Convert source bytes into a paper.
    fn convert_bytes(&self, bytes: &[u8]) -> Result<Paper>;

    /// Convert a file at the given path.
    fn convert(&self, path: &Path) -> Result<Paper> {
        let bytes = std::fs::read(path)?;
        self.convert_bytes(&bytes)
    }

    /// Check if this converter supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for paper converters.
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn PaperConverter>>,
    by_name: HashMap<String, Arc<dyn PaperConverter>>,
}

impl ConverterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with default converters (JSON).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonPaperConverter::new()));
        registry
    }

    /// Register a converter for all its supported extensions.
    pub fn register(&mut self, converter: Arc<dyn PaperConverter>) {
        for ext in converter.supported_extensions() {
            self.converters
                .insert(ext.to_lowercase(), converter.clone());
        }
        self.by_name
            .insert(converter.name().to_lowercase(), converter);
    }

    /// Get a converter by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn PaperConverter>> {
        self.converters.get(&ext.to_lowercase()).cloned()
    }

    /// Get a converter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn PaperConverter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.converters.contains_key(&ext.to_lowercase())
    }

    /// Get all supported extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.converters.keys().map(|s| s.as_str()).collect()
    }

    /// Pick a converter for a source: by extension, then by detected content.
    pub fn resolve(&self, path: &Path, head: &[u8]) -> Result<Arc<dyn PaperConverter>> {
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.get_by_extension(ext));
        if let Some(converter) = by_extension {
            return Ok(converter);
        }

        let format = detect_format_from_bytes(head)?;
        self.get_by_format(format)
            .ok_or_else(|| Error::UnsupportedSource(format.to_string()))
    }

    /// Get a converter for a detected source format.
    pub fn get_by_format(&self, format: SourceFormat) -> Option<Arc<dyn PaperConverter>> {
        self.get_by_extension(format.extension())
    }

    /// Convert a file using the appropriate converter.
    pub fn convert(&self, path: &Path) -> Result<Paper> {
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        self.convert_source(path, &bytes)
    }

    /// Convert already-read source bytes. `path` is used for dispatch only.
    pub fn convert_source(&self, path: &Path, bytes: &[u8]) -> Result<Paper> {
        let converter = self.resolve(path, bytes)?;
        log::debug!("Converting {} with {}", path.display(), converter.name());
        converter.convert_bytes(bytes)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Linearize and segment a paper.
pub fn paper_to_blocks(
    paper: &Paper,
    identity: &DocumentIdentity,
    options: &ConvertOptions,
) -> SegmentResult {
    let segment = options.effective_segment_options();
    let loader = segment.file_loader();
    paper_to_blocks_with_loader(paper, identity, &segment, &options.render, &loader)
}

/// Linearize and segment a paper with a custom image loader.
pub fn paper_to_blocks_with_loader(
    paper: &Paper,
    identity: &DocumentIdentity,
    segment: &SegmentOptions,
    render: &RenderOptions,
    loader: &dyn ImageLoader,
) -> SegmentResult {
    let doc = to_linear_document(paper, render);
    Segmenter::new(segment, loader).segment_document(&doc, identity)
}

/// Outcome of processing one document.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    /// Source file
    pub input: PathBuf,
    /// Document identity
    pub identity: DocumentIdentity,
    /// Number of blocks produced
    pub blocks: u64,
    /// Shard files written, in index order
    pub shards: Vec<PathBuf>,
    /// Segmentation statistics
    pub stats: SegmentStats,
}

/// Run the full pipeline for one source file.
///
/// Shards are written next to `output` as `{stem}_{index}.{ext}`.
pub fn process_file(
    registry: &ConverterRegistry,
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<DocumentReport> {
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    let bytes = std::fs::read(input)?;
    let identity = DocumentIdentity::from_source(input, &bytes);
    let paper = registry.convert_source(input, &bytes)?;

    let result = paper_to_blocks(&paper, &identity, options);
    let blocks = result.blocks.len() as u64;
    log::info!(
        "process {} done, {} blocks generated, {} {}",
        input.display(),
        blocks,
        identity.file_hash,
        identity.file_id
    );

    let shards = write_shards(result.blocks, output, &options.shard)?;
    Ok(DocumentReport {
        input: input.to_path_buf(),
        identity,
        blocks,
        shards,
        stats: result.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TexStub;

    impl PaperConverter for TexStub {
        fn supported_extensions(&self) -> &[&str] {
            &["tex"]
        }

        fn name(&self) -> &str {
            "tex-stub"
        }

        fn convert_bytes(&self, _bytes: &[u8]) -> Result<Paper> {
            Ok(Paper {
                title: "from tex".to_string(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.supports("json"));
        assert!(registry.supports("JSON"));
        assert!(!registry.supports("pdf"));
        assert_eq!(registry.get_by_name("json").unwrap().name(), "json");
    }

    #[test]
    fn test_resolve_falls_back_to_detection() {
        let registry = ConverterRegistry::with_defaults();
        let converter = registry
            .resolve(Path::new("source/2004.14974"), b"{\"title\": \"x\"}")
            .unwrap();
        assert_eq!(converter.name(), "json");
    }

    #[test]
    fn test_resolve_unsupported_and_unknown() {
        let registry = ConverterRegistry::with_defaults();
        let unsupported = registry.resolve(Path::new("source/paper"), b"\\documentclass{article}");
        assert!(matches!(unsupported, Err(Error::UnsupportedSource(ref f)) if f == "tex"));

        let unknown = registry.resolve(Path::new("source/paper"), &[0xff, 0x00]);
        assert!(matches!(unknown, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_registered_converter_handles_detected_format() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.register(Arc::new(TexStub));
        let paper = registry
            .convert_source(Path::new("source/paper"), b"\\section{Intro}")
            .unwrap();
        assert_eq!(paper.title, "from tex");
    }

    #[test]
    fn test_effective_segment_options_follow_render() {
        let mut render = RenderOptions::default();
        render.delimiters.section = crate::render::DelimiterPair::new("<s>", "</s>");
        let options = ConvertOptions::new().with_render_options(render);
        assert_eq!(options.effective_segment_options().delimiters.section.open, "<s>");
    }
}
