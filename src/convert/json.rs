//! Converter for the upstream structured paper JSON.

use crate::error::Result;
use crate::model::Paper;

use super::PaperConverter;

/// Reads papers already converted to the structured JSON contract.
#[derive(Debug, Clone, Default)]
pub struct JsonPaperConverter {
    _private: (),
}

impl JsonPaperConverter {
    /// Create a new JSON paper converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl PaperConverter for JsonPaperConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "json"
    }

    fn convert_bytes(&self, bytes: &[u8]) -> Result<Paper> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        Ok(Paper::from_json_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_json_converter_extensions() {
        let converter = JsonPaperConverter::new();
        assert_eq!(converter.supported_extensions(), &["json"]);
        assert!(converter.supports_extension("JSON"));
        assert!(!converter.supports_extension("tex"));
    }

    #[test]
    fn test_convert_bytes() {
        let converter = JsonPaperConverter::new();
        let paper = converter
            .convert_bytes(b"\xef\xbb\xbf{\"title\": \"T\", \"latex_parse\": {}}")
            .unwrap();
        assert_eq!(paper.title, "T");

        let result = converter.convert_bytes(b"{not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
