//! JSON rendering for content blocks.

use crate::error::Result;
use crate::model::ContentBlock;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
    /// One compact record per line
    Lines,
}

/// Convert blocks to JSON.
pub fn blocks_to_json(blocks: &[ContentBlock], format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(blocks)?,
        JsonFormat::Compact => serde_json::to_string(blocks)?,
        JsonFormat::Lines => {
            let mut out = String::new();
            for block in blocks {
                out.push_str(&serde_json::to_string(block)?);
                out.push('\n');
            }
            out
        }
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockType, DocumentIdentity};

    fn blocks() -> Vec<ContentBlock> {
        let identity = DocumentIdentity::new("hash", "doc");
        vec![
            ContentBlock::text(&identity, 0, "20240101", "Hello".into(), BlockType::Text),
            ContentBlock::text(&identity, 1, "20240101", "World".into(), BlockType::Text),
        ]
    }

    #[test]
    fn test_blocks_to_json_pretty() {
        let json = blocks_to_json(&blocks(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"block_id\": 1"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_blocks_to_json_compact() {
        let json = blocks_to_json(&blocks(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_blocks_to_json_lines() {
        let json = blocks_to_json(&blocks(), JsonFormat::Lines).unwrap();
        assert_eq!(json.lines().count(), 2);
        assert!(json.ends_with('\n'));
    }
}
