//! Input paper types.
//!
//! These mirror the JSON contract produced by the upstream LaTeX converter:
//! a title, an author list and a `latex_parse` object holding the abstract,
//! the ordered body paragraphs, the reference-entry table and the
//! bibliography table. Every field is optional on the wire; missing or
//! `null` values fall back to empty defaults so that a sparse paper still
//! linearizes.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Separator between levels of a paragraph's section path.
pub const SECTION_SEPARATOR: &str = "::";

/// A structured paper as emitted by the upstream converter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paper {
    /// Upstream paper identifier, if any
    #[serde(default, deserialize_with = "null_as_default")]
    pub paper_id: Option<String>,

    /// Paper title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Author list
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,

    /// Parsed body of the paper
    #[serde(default, deserialize_with = "null_as_default")]
    pub latex_parse: LatexParse,
}

impl Paper {
    /// Parse a paper from its JSON bytes.
    pub fn from_json_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Author names joined for display, skipping blank names.
    pub fn author_line(&self) -> String {
        self.authors
            .iter()
            .map(Author::display_name)
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The parsed content of a paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatexParse {
    /// Abstract paragraphs
    #[serde(rename = "abstract", default, deserialize_with = "null_as_default")]
    pub abstract_text: Vec<BodyParagraph>,

    /// Ordered body paragraphs
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_text: Vec<BodyParagraph>,

    /// Figure, table, footnote and section entries keyed by reference id
    #[serde(default, deserialize_with = "null_as_default")]
    pub ref_entries: BTreeMap<String, RefEntry>,

    /// Bibliography entries keyed by citation id
    #[serde(default, deserialize_with = "null_as_default")]
    pub bib_entries: BTreeMap<String, BibEntry>,
}

/// One paragraph of the abstract or body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyParagraph {
    /// Section path, levels separated by [`SECTION_SEPARATOR`]
    #[serde(default, deserialize_with = "null_as_default")]
    pub section: String,

    /// Paragraph text with inline reference markers
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,

    /// Spans pointing at reference entries
    #[serde(default, deserialize_with = "null_as_default")]
    pub ref_spans: Vec<Span>,

    /// Spans pointing at bibliography entries
    #[serde(default, deserialize_with = "null_as_default")]
    pub cite_spans: Vec<Span>,

    /// Equation spans, kept opaque
    #[serde(default, deserialize_with = "null_as_default")]
    pub eq_spans: Vec<serde_json::Value>,
}

impl BodyParagraph {
    /// Create a paragraph without a section.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create a paragraph under a section path.
    pub fn in_section(section: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Section path levels, trimmed, with empty levels removed.
    pub fn section_levels(&self) -> Vec<&str> {
        self.section
            .trim()
            .split(SECTION_SEPARATOR)
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .collect()
    }
}

/// An inline span inside a paragraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub ref_id: Option<String>,
}

/// The kind of a reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Figure,
    Table,
    Footnote,
    Section,
    Unknown,
}

/// A figure, table, footnote or section entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefEntry {
    /// Caption text (figures, tables) or footnote body
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,

    /// Upstream type tag ("figure", "table", "footnote", "section")
    #[serde(default, deserialize_with = "null_as_default")]
    pub type_str: String,

    /// Display number
    #[serde(default, deserialize_with = "lenient_string")]
    pub num: Option<String>,

    /// Image locations for figures
    #[serde(default, deserialize_with = "null_as_default")]
    pub uris: Vec<String>,

    /// Raw HTML table markup
    #[serde(default, deserialize_with = "null_as_default")]
    pub html: String,

    /// Parent section id, for sections
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent: Option<String>,
}

impl RefEntry {
    /// Classify the entry, using the id prefix first and the type tag second.
    pub fn kind(&self, ref_id: &str) -> RefKind {
        if ref_id.starts_with("FIGREF") {
            return RefKind::Figure;
        }
        if ref_id.starts_with("TABREF") {
            return RefKind::Table;
        }
        if ref_id.starts_with("FOOTREF") {
            return RefKind::Footnote;
        }
        if ref_id.starts_with("SECREF") {
            return RefKind::Section;
        }
        match self.type_str.to_ascii_lowercase().as_str() {
            "figure" => RefKind::Figure,
            "table" => RefKind::Table,
            "footnote" => RefKind::Footnote,
            "section" => RefKind::Section,
            _ => RefKind::Unknown,
        }
    }
}

/// A bibliography entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BibEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ref_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub venue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub volume: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pages: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urls: Vec<String>,
    /// Verbatim citation text, preferred over the structured fields
    #[serde(default, deserialize_with = "lenient_string")]
    pub raw_text: Option<String>,
}

/// An author, either structured or a plain display string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Structured(PersonName),
    Plain(String),
}

impl Author {
    /// Create a plain author.
    pub fn plain(name: impl Into<String>) -> Self {
        Author::Plain(name.into())
    }

    /// Create a structured author from first and last name.
    pub fn named(first: impl Into<String>, last: impl Into<String>) -> Self {
        Author::Structured(PersonName {
            first: first.into(),
            last: last.into(),
            ..Default::default()
        })
    }

    /// Name as "first middle last suffix", blank parts omitted.
    pub fn display_name(&self) -> String {
        match self {
            Author::Plain(name) => name.trim().to_string(),
            Author::Structured(person) => person.display_name(),
        }
    }
}

/// A structured person name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default, deserialize_with = "null_as_default")]
    pub first: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub middle: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suffix: String,
}

impl PersonName {
    fn display_name(&self) -> String {
        std::iter::once(self.first.as_str())
            .chain(self.middle.iter().map(String::as_str))
            .chain([self.last.as_str(), self.suffix.as_str()])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept strings and numbers; map `null`, empty strings and other shapes to `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
