//! The linear document: an ordered list of paragraphs.
//!
//! Paragraphs are joined with [`PARAGRAPH_SEPARATOR`] only when the document
//! is rendered to text. While it is being built the document stays a list,
//! so structural insertions are index operations and paragraph text can never
//! contain the separator.

use regex::Regex;

use super::options::Delimiters;

/// Separator between paragraphs of the rendered linear document.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Whether a paragraph came from source text or was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    /// Source text; reference markers inside it are resolved
    Text,
    /// Generated region (heading, figure, table markup, appendix)
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Paragraph {
    text: String,
    kind: ParagraphKind,
}

/// A paper flattened into ordered paragraphs.
#[derive(Debug, Clone, Default)]
pub struct LinearDocument {
    paragraphs: Vec<Paragraph>,
}

impl LinearDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split rendered text back into paragraphs, dropping blank ones.
    pub fn paragraphs_of(text: &str) -> impl Iterator<Item = &str> {
        text.split(PARAGRAPH_SEPARATOR)
            .filter(|paragraph| !paragraph.trim().is_empty())
    }

    /// Number of paragraphs.
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    /// Check if the document has no paragraphs.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Paragraph text at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(|p| p.text.as_str())
    }

    /// Paragraph kind at `index`.
    pub fn kind(&self, index: usize) -> Option<ParagraphKind> {
        self.paragraphs.get(index).map(|p| p.kind)
    }

    /// Iterate over paragraph texts in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paragraphs.iter().map(|p| p.text.as_str())
    }

    /// Append source text, split at blank lines, with delimiter tags removed.
    pub fn push_text(&mut self, text: &str, delimiters: &Delimiters) {
        for fragment in sanitize_fragment(text, delimiters) {
            self.paragraphs.push(Paragraph {
                text: fragment,
                kind: ParagraphKind::Text,
            });
        }
    }

    /// Append a generated paragraph. Blank paragraphs are dropped.
    pub fn push_structural(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.paragraphs.push(Paragraph {
            text,
            kind: ParagraphKind::Structural,
        });
    }

    /// Insert a paragraph before `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, text: impl Into<String>, kind: ParagraphKind) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        let index = index.min(self.paragraphs.len());
        self.paragraphs.insert(index, Paragraph { text, kind });
    }

    /// Append a paragraph of the given kind.
    pub fn push(&mut self, text: impl Into<String>, kind: ParagraphKind) {
        let index = self.paragraphs.len();
        self.insert(index, text, kind);
    }

    /// Position of the first occurrence of `needle` in a text paragraph,
    /// as (paragraph index, byte offset).
    pub fn find_first(&self, needle: &str) -> Option<(usize, usize)> {
        self.paragraphs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ParagraphKind::Text)
            .find_map(|(index, p)| p.text.find(needle).map(|offset| (index, offset)))
    }

    /// Replace every occurrence of `from` in text paragraphs.
    pub fn replace_all(&mut self, from: &str, to: &str) -> usize {
        let mut count = 0;
        for paragraph in self
            .paragraphs
            .iter_mut()
            .filter(|p| p.kind == ParagraphKind::Text)
        {
            let hits = paragraph.text.matches(from).count();
            if hits > 0 {
                paragraph.text = paragraph.text.replace(from, to);
                count += hits;
            }
        }
        count
    }

    /// Rewrite each text paragraph with `f`.
    pub fn map_text<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for paragraph in self
            .paragraphs
            .iter_mut()
            .filter(|p| p.kind == ParagraphKind::Text)
        {
            paragraph.text = f(&paragraph.text);
        }
    }

    /// Rewrite every paragraph with `f`, structural ones included.
    pub fn map_all<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for paragraph in &mut self.paragraphs {
            paragraph.text = f(&paragraph.text);
        }
    }

    /// Append all paragraphs of `other`.
    pub fn append(&mut self, other: LinearDocument) {
        self.paragraphs.extend(other.paragraphs);
    }

    /// Render to a single text blob.
    pub fn to_text(&self) -> String {
        self.iter().collect::<Vec<_>>().join(PARAGRAPH_SEPARATOR)
    }
}

/// Split source text at blank lines into trimmed, non-empty paragraphs with
/// all delimiter tags removed.
pub fn sanitize_fragment(text: &str, delimiters: &Delimiters) -> Vec<String> {
    let blank_line = Regex::new(r"\n[ \t\r]*\n").expect("valid regex");
    let stripped = delimiters.strip_all(text);
    blank_line
        .split(&stripped)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapse blank-line runs to a single newline and remove delimiter tags,
/// so the text fits inside one paragraph.
pub fn single_paragraph(text: &str, delimiters: &Delimiters) -> String {
    sanitize_fragment(text, delimiters).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_text_splits_blank_lines() {
        let delimiters = Delimiters::default();
        let mut doc = LinearDocument::new();
        doc.push_text("  first\n\nsecond \n \n third  ", &delimiters);
        doc.push_text("   ", &delimiters);

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get(0), Some("first"));
        assert_eq!(doc.get(2), Some("third"));
        assert!(!doc.to_text().contains("\n\n\n"));
    }

    #[test]
    fn test_push_text_removes_delimiters() {
        let delimiters = Delimiters::default();
        let mut doc = LinearDocument::new();
        doc.push_text("fake [SECTION]# Title[/SECTION] heading", &delimiters);
        assert_eq!(doc.get(0), Some("fake # Title heading"));
    }

    #[test]
    fn test_find_and_replace_skip_structural() {
        let delimiters = Delimiters::default();
        let mut doc = LinearDocument::new();
        doc.push_structural("payload mentions FIGREF0 too");
        doc.push_text("intro", &delimiters);
        doc.push_text("see FIGREF0 here and FIGREF0 there", &delimiters);

        assert_eq!(doc.find_first("FIGREF0"), Some((2, 4)));
        assert_eq!(doc.replace_all("FIGREF0", "1"), 2);
        assert_eq!(doc.get(0), Some("payload mentions FIGREF0 too"));
        assert_eq!(doc.get(2), Some("see 1 here and 1 there"));
    }

    #[test]
    fn test_insert_by_index() {
        let delimiters = Delimiters::default();
        let mut doc = LinearDocument::new();
        doc.push_text("a\n\nc", &delimiters);
        doc.insert(1, "b", ParagraphKind::Structural);
        doc.insert(99, "d", ParagraphKind::Structural);
        assert_eq!(doc.to_text(), "a\n\nb\n\nc\n\nd");
        assert_eq!(doc.kind(1), Some(ParagraphKind::Structural));
    }

    #[test]
    fn test_paragraphs_of_drops_blank() {
        let paragraphs: Vec<_> = LinearDocument::paragraphs_of("a\n\n\n\nb\n\n  ").collect();
        assert_eq!(paragraphs, vec!["a", "b"]);
    }

    #[test]
    fn test_single_paragraph() {
        let delimiters = Delimiters::default();
        assert_eq!(single_paragraph("x\n\n\ny\nz", &delimiters), "x\ny\nz");
    }
}
