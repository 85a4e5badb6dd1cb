//! Error types for paperblocks library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for paperblocks operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting, segmenting or sharding papers.
///
/// Only conditions that abort a single document (or a single shard file)
/// are represented here. Reference-lookup misses and image decode failures
/// degrade the output instead of failing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input path does not exist.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The source content was not recognized.
    #[error("Unknown source format")]
    UnknownFormat,

    /// The source container is recognized but no converter handles it.
    #[error("Unsupported source container: {0}")]
    UnsupportedSource(String),

    /// An image could not be read or decoded.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// A shard file does not match the block schema.
    #[error("Schema mismatch in {}: line {line}: {detail}", .path.display())]
    SchemaMismatch {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    /// An option value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short, stable name of the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::InputNotFound(_) => "input_not_found",
            Error::UnknownFormat => "unknown_format",
            Error::UnsupportedSource(_) => "unsupported_source",
            Error::ImageDecode(_) => "image_decode",
            Error::SchemaMismatch { .. } => "schema_mismatch",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Other(_) => "other",
        }
    }

    /// The error followed by its chain of sources, one per line.
    pub fn chain(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            lines.push(format!("caused by: {}", err));
            source = err.source();
        }
        lines.join("\n")
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::ImageDecode(err.to_string()),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        match err.into_io_error() {
            Some(e) => Error::Io(e),
            None => Error::Other("directory traversal loop detected".into()),
        }
    }
}
