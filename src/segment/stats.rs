//! Segmentation statistics.

use serde::{Deserialize, Serialize};

use crate::model::{BlockType, Category, ContentBlock};

/// Statistics collected while segmenting one or more documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Total number of blocks emitted
    pub block_count: u64,

    /// Blocks in the text category
    pub text_blocks: u64,

    /// Blocks in the table category
    pub table_blocks: u64,

    /// Blocks in the figure category
    pub image_blocks: u64,

    /// Figure regions found
    pub figure_count: u64,

    /// Section title blocks
    pub section_count: u64,

    /// Footnote appendix blocks
    pub footnote_count: u64,

    /// Bibliography appendix blocks
    pub reference_count: u64,

    /// Images that failed to load
    pub failed_images: u64,

    /// Sum of text lengths, in characters
    pub text_length: u64,
}

impl SegmentStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for an existing block sequence.
    ///
    /// Figure regions and image failures are not recoverable from blocks
    /// alone and stay zero.
    pub fn from_blocks(blocks: &[ContentBlock]) -> Self {
        let mut stats = Self::new();
        for block in blocks {
            stats.record(block);
        }
        stats
    }

    /// Count one emitted block.
    pub fn record(&mut self, block: &ContentBlock) {
        self.block_count += 1;
        match block.category {
            Category::Text => self.text_blocks += 1,
            Category::Table => self.table_blocks += 1,
            Category::Figure => self.image_blocks += 1,
        }
        match block.metadata.block_type {
            BlockType::SectionTitle => self.section_count += 1,
            BlockType::Footnote => self.footnote_count += 1,
            BlockType::Reference => self.reference_count += 1,
            _ => {}
        }
        self.text_length += block.metadata.text_length as u64;
    }

    /// Count a figure region.
    pub fn add_figure(&mut self) {
        self.figure_count += 1;
    }

    /// Count an image that could not be loaded.
    pub fn add_failed_image(&mut self) {
        self.failed_images += 1;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &SegmentStats) {
        self.block_count += other.block_count;
        self.text_blocks += other.text_blocks;
        self.table_blocks += other.table_blocks;
        self.image_blocks += other.image_blocks;
        self.figure_count += other.figure_count;
        self.section_count += other.section_count;
        self.footnote_count += other.footnote_count;
        self.reference_count += other.reference_count;
        self.failed_images += other.failed_images;
        self.text_length += other.text_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentIdentity, ImageSize};

    #[test]
    fn test_record_blocks() {
        let id = DocumentIdentity::new("h", "d");
        let blocks = vec![
            ContentBlock::text(&id, 0, "20240101", "# Intro".into(), BlockType::SectionTitle),
            ContentBlock::text(&id, 1, "20240101", "body".into(), BlockType::Text),
            ContentBlock::text(&id, 2, "20240101", "<table></table>".into(), BlockType::Table),
            ContentBlock::image(&id, 3, "20240101", vec![0], ImageSize::new(1, 1)),
        ];
        let stats = SegmentStats::from_blocks(&blocks);

        assert_eq!(stats.block_count, 4);
        assert_eq!(stats.text_blocks, 2);
        assert_eq!(stats.table_blocks, 1);
        assert_eq!(stats.image_blocks, 1);
        assert_eq!(stats.section_count, 1);
        assert_eq!(stats.text_length, 7 + 4 + 15);
    }

    #[test]
    fn test_merge() {
        let mut a = SegmentStats {
            block_count: 5,
            figure_count: 1,
            ..Default::default()
        };
        let b = SegmentStats {
            block_count: 3,
            failed_images: 2,
            ..Default::default()
        };
        a.merge(&b);

        assert_eq!(a.block_count, 8);
        assert_eq!(a.figure_count, 1);
        assert_eq!(a.failed_images, 2);
    }
}
