//! Output block types.

use chrono::NaiveDate;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage category of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Text, including section titles, footnotes and references
    Text,
    /// Raw HTML table markup
    Table,
    /// Image payload
    Figure,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Text => write!(f, "text"),
            Category::Table => write!(f, "table"),
            Category::Figure => write!(f, "figure"),
        }
    }
}

/// Fine-grained type tag carried in block metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "section title")]
    SectionTitle,
    #[serde(rename = "footnote")]
    Footnote,
    #[serde(rename = "reference")]
    Reference,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "figure")]
    Figure,
}

impl BlockType {
    /// The storage category this type folds into.
    pub fn category(self) -> Category {
        match self {
            BlockType::Table => Category::Table,
            BlockType::Figure => Category::Figure,
            _ => Category::Text,
        }
    }
}

/// Pixel dimensions of an image block; empty for other blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Per-block metadata, stored as a JSON string in the output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text_length: usize,
    #[serde(default)]
    pub image_size: ImageSize,
}

/// Identity shared by every block of one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    /// Hex MD5 of the source bytes
    pub file_hash: String,
    /// Logical document id derived from the file name
    pub file_id: String,
}

impl DocumentIdentity {
    pub fn new(file_hash: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            file_hash: file_hash.into(),
            file_id: file_id.into(),
        }
    }

    /// Identity of a source file: its content hash and its file stem.
    pub fn from_source(path: &Path, data: &[u8]) -> Self {
        let file_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "default_file_id".to_string());
        Self::new(content_hash(data), file_id)
    }
}

/// Hex-encoded MD5 digest of `data`.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Format a processing date the way it is stored in blocks.
pub fn processing_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// One typed, independently storable unit of content.
///
/// Exactly one of `text` and `image` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub file_hash: String,
    pub file_id: String,
    /// Dense, zero-based position of the block within its document
    pub block_id: u64,
    pub text: Option<String>,
    #[serde(default, with = "base64_bytes")]
    pub image: Option<Vec<u8>>,
    pub category: Category,
    pub processed_at: String,
    #[serde(with = "json_string")]
    pub metadata: BlockMetadata,
}

impl ContentBlock {
    /// Build a text-bearing block (text, section title, footnote, reference, table).
    pub fn text(
        identity: &DocumentIdentity,
        block_id: u64,
        processed_at: &str,
        text: String,
        block_type: BlockType,
    ) -> Self {
        let metadata = BlockMetadata {
            block_type,
            text_length: text.chars().count(),
            image_size: ImageSize::default(),
        };
        Self {
            file_hash: identity.file_hash.clone(),
            file_id: identity.file_id.clone(),
            block_id,
            text: Some(text),
            image: None,
            category: block_type.category(),
            processed_at: processed_at.to_string(),
            metadata,
        }
    }

    /// Build an image block.
    pub fn image(
        identity: &DocumentIdentity,
        block_id: u64,
        processed_at: &str,
        data: Vec<u8>,
        size: ImageSize,
    ) -> Self {
        Self {
            file_hash: identity.file_hash.clone(),
            file_id: identity.file_id.clone(),
            block_id,
            text: None,
            image: Some(data),
            category: Category::Figure,
            processed_at: processed_at.to_string(),
            metadata: BlockMetadata {
                block_type: BlockType::Figure,
                text_length: 0,
                image_size: size,
            },
        }
    }

    /// Check that exactly one payload is present.
    pub fn has_single_payload(&self) -> bool {
        self.text.is_some() != self.image.is_some()
    }

    /// Metadata encoded the way it is stored.
    pub fn metadata_json(&self) -> String {
        serde_json::to_string(&self.metadata).unwrap_or_default()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

mod json_string {
    use super::BlockMetadata;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BlockMetadata, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockMetadata, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        serde_json::from_str(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DocumentIdentity {
        DocumentIdentity::new("abc", "2004.14974")
    }

    #[test]
    fn test_content_hash_is_md5_hex() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(content_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_identity_from_source() {
        let id = DocumentIdentity::from_source(Path::new("out/2004.14974.json"), b"abc");
        assert_eq!(id.file_id, "2004.14974");
        assert_eq!(id.file_hash, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_text_block_metadata() {
        let block = ContentBlock::text(&identity(), 3, "20240101", "héllo".into(), BlockType::SectionTitle);
        assert_eq!(block.category, Category::Text);
        assert_eq!(block.metadata.text_length, 5);
        assert!(block.has_single_payload());
        assert_eq!(
            block.metadata_json(),
            r#"{"type":"section title","text_length":5,"image_size":{}}"#
        );
    }

    #[test]
    fn test_record_shape() {
        let block = ContentBlock::image(&identity(), 1, "20240101", vec![1, 2, 3], ImageSize::new(4, 5));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["image"], "AQID");
        assert_eq!(value["text"], serde_json::Value::Null);
        assert_eq!(value["category"], "figure");
        assert_eq!(
            value["metadata"],
            r#"{"type":"figure","text_length":0,"image_size":{"width":4,"height":5}}"#
        );

        let back: ContentBlock = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_processing_stamp() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(processing_stamp(date), "20240307");
    }
}
