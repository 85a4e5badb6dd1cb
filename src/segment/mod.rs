//! Block segmentation of linear documents.
//!
//! The linear document is split on the paragraph separator and each
//! paragraph is classified, first match wins:
//!
//! 1. a figure region becomes a caption block followed by one image block
//!    per panel URI;
//! 2. a paragraph that is a whole `<table>...</table>` becomes a table block;
//! 3. a section, bibliography or footnote region becomes a block holding the
//!    region's inner text;
//! 4. anything else is a plain text block.
//!
//! Block ids are assigned in emission order, starting at zero.

mod loader;
mod stats;

pub use loader::{image_dimensions, image_extension, FileImageLoader, ImageLoader, LoadedImage};
pub use stats::SegmentStats;

use std::path::PathBuf;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{processing_stamp, BlockType, ContentBlock, DocumentIdentity, ImageSize};
use crate::render::{Delimiters, FigurePayload, LinearDocument};

/// Options for block segmentation.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Date stamped on every block
    pub processed_at: NaiveDate,

    /// Directory relative figure URIs are resolved against
    pub image_root: Option<PathBuf>,

    /// Placeholder tags; must match the ones used for rendering
    pub delimiters: Delimiters,
}

impl SegmentOptions {
    /// Create new segment options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the processing date.
    pub fn with_processed_at(mut self, date: NaiveDate) -> Self {
        self.processed_at = date;
        self
    }

    /// Set the image root directory.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Set the placeholder tags.
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// File loader honoring the configured image root.
    pub fn file_loader(&self) -> FileImageLoader {
        match &self.image_root {
            Some(root) => FileImageLoader::new().with_root(root),
            None => FileImageLoader::new(),
        }
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            processed_at: chrono::Local::now().date_naive(),
            image_root: None,
            delimiters: Delimiters::default(),
        }
    }
}

/// Blocks of one document together with their statistics.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub blocks: Vec<ContentBlock>,
    pub stats: SegmentStats,
}

/// Segment a linear document with the filesystem image loader.
pub fn segment_document(
    doc: &LinearDocument,
    identity: &DocumentIdentity,
    options: &SegmentOptions,
) -> Vec<ContentBlock> {
    let loader = options.file_loader();
    Segmenter::new(options, &loader).segment_document(doc, identity).blocks
}

/// Segment rendered linear text with the filesystem image loader.
pub fn segment_text(
    text: &str,
    identity: &DocumentIdentity,
    options: &SegmentOptions,
) -> Vec<ContentBlock> {
    let loader = options.file_loader();
    Segmenter::new(options, &loader).segment_text(text, identity).blocks
}

/// Splits a linear document into content blocks.
pub struct Segmenter<'a> {
    options: &'a SegmentOptions,
    loader: &'a dyn ImageLoader,
    table: Regex,
}

impl<'a> Segmenter<'a> {
    pub fn new(options: &'a SegmentOptions, loader: &'a dyn ImageLoader) -> Self {
        Self {
            options,
            loader,
            table: Regex::new(r"(?s)^<table\b.*</table>$").expect("valid regex"),
        }
    }

    /// Segment a linear document.
    pub fn segment_document(
        &self,
        doc: &LinearDocument,
        identity: &DocumentIdentity,
    ) -> SegmentResult {
        self.segment_paragraphs(doc.iter(), identity)
    }

    /// Segment rendered linear text.
    pub fn segment_text(&self, text: &str, identity: &DocumentIdentity) -> SegmentResult {
        self.segment_paragraphs(LinearDocument::paragraphs_of(text), identity)
    }

    fn segment_paragraphs<'p>(
        &self,
        paragraphs: impl Iterator<Item = &'p str>,
        identity: &DocumentIdentity,
    ) -> SegmentResult {
        let mut emitter = BlockEmitter::new(identity, processing_stamp(self.options.processed_at));
        for paragraph in paragraphs {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            self.segment_paragraph(paragraph, &mut emitter);
        }

        log::debug!(
            "{}: {} blocks generated",
            identity.file_id,
            emitter.blocks.len()
        );
        emitter.finish()
    }

    fn segment_paragraph(&self, paragraph: &str, emitter: &mut BlockEmitter<'_>) {
        let delimiters = &self.options.delimiters;

        if let Some(inner) = delimiters.figure.leading_inner(paragraph) {
            match serde_json::from_str::<FigurePayload>(inner) {
                Ok(figure) => self.emit_figure(&figure, emitter),
                Err(e) => {
                    log::warn!("Malformed figure payload, keeping as text: {}", e);
                    emitter.text(paragraph.to_string(), BlockType::Text);
                }
            }
            return;
        }

        if self.table.is_match(paragraph) {
            emitter.text(paragraph.to_string(), BlockType::Table);
            return;
        }

        let regions = [
            (&delimiters.section, BlockType::SectionTitle),
            (&delimiters.references, BlockType::Reference),
            (&delimiters.footnotes, BlockType::Footnote),
        ];
        for (pair, block_type) in regions {
            if let Some(inner) = pair.find_inner(paragraph) {
                emitter.text(inner.to_string(), block_type);
                return;
            }
        }

        emitter.text(paragraph.to_string(), BlockType::Text);
    }

    fn emit_figure(&self, figure: &FigurePayload, emitter: &mut BlockEmitter<'_>) {
        emitter.stats.add_figure();
        emitter.text(figure.caption_line(), BlockType::Text);

        for uri in &figure.uris {
            match self.loader.load(uri) {
                Ok(image) => emitter.image(image.data, image.size),
                Err(e) => {
                    log::warn!("Failed to load image {} for {}: {}", uri, figure.ref_id, e);
                    emitter.stats.add_failed_image();
                    emitter.image(Vec::new(), ImageSize::new(0, 0));
                }
            }
        }
    }
}

/// Assigns dense block ids in emission order.
struct BlockEmitter<'a> {
    identity: &'a DocumentIdentity,
    stamp: String,
    blocks: Vec<ContentBlock>,
    stats: SegmentStats,
}

impl<'a> BlockEmitter<'a> {
    fn new(identity: &'a DocumentIdentity, stamp: String) -> Self {
        Self {
            identity,
            stamp,
            blocks: Vec::new(),
            stats: SegmentStats::new(),
        }
    }

    fn next_id(&self) -> u64 {
        self.blocks.len() as u64
    }

    fn text(&mut self, text: String, block_type: BlockType) {
        let block = ContentBlock::text(self.identity, self.next_id(), &self.stamp, text, block_type);
        self.push(block);
    }

    fn image(&mut self, data: Vec<u8>, size: ImageSize) {
        let block = ContentBlock::image(self.identity, self.next_id(), &self.stamp, data, size);
        self.push(block);
    }

    fn push(&mut self, block: ContentBlock) {
        self.stats.record(&block);
        self.blocks.push(block);
    }

    fn finish(self) -> SegmentResult {
        SegmentResult {
            blocks: self.blocks,
            stats: self.stats,
        }
    }
}
