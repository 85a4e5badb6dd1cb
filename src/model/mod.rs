//! Data model types.
//!
//! [`Paper`] is the structured input produced by the upstream converter;
//! [`ContentBlock`] is the flat output record produced by segmentation.

mod block;
mod paper;

pub use block::{
    content_hash, processing_stamp, BlockMetadata, BlockType, Category, ContentBlock,
    DocumentIdentity, ImageSize,
};
pub use paper::{
    Author, BibEntry, BodyParagraph, LatexParse, Paper, PersonName, RefEntry, RefKind, Span,
    SECTION_SEPARATOR,
};
