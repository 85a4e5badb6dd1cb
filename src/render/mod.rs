//! Rendering module for converting papers to a linear markdown document.

mod bibliography;
mod body;
mod json;
mod linear;
mod markdown;
mod options;
mod references;

pub use bibliography::{format_citation, CitationIndex};
pub use body::{linearize_body, BodyLinearizer};
pub use json::{blocks_to_json, JsonFormat};
pub use linear::{sanitize_fragment, LinearDocument, ParagraphKind, PARAGRAPH_SEPARATOR};
pub use markdown::{
    to_linear_document, to_markdown, MarkdownRenderer, FOOTNOTE_HEADING, REFERENCE_HEADING,
};
pub use options::{DelimiterPair, Delimiters, HeadingDepth, RenderOptions};
pub use references::{resolve_references, FigurePayload, Footnote, ReferenceResolver};
