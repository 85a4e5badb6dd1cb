//! Section and body linearization.

use std::collections::HashMap;

use crate::model::BodyParagraph;

use super::linear::LinearDocument;
use super::options::{HeadingDepth, RenderOptions};

/// Emits section headings and paragraph bodies into a linear document.
///
/// Each distinct title gets exactly one heading, the first time it is seen.
/// Titles are memoized by text, so a title repeated under a different parent
/// is not emitted again.
pub struct BodyLinearizer<'a> {
    options: &'a RenderOptions,
    headings: HashMap<String, usize>,
}

impl<'a> BodyLinearizer<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            headings: HashMap::new(),
        }
    }

    /// Depth assigned to `title`, if a heading was emitted for it.
    pub fn heading_depth(&self, title: &str) -> Option<usize> {
        self.headings.get(title).copied()
    }

    /// Number of headings emitted so far.
    pub fn heading_count(&self) -> usize {
        self.headings.len()
    }

    /// Append `paragraphs` to `doc`.
    pub fn linearize(&mut self, paragraphs: &[BodyParagraph], doc: &mut LinearDocument) {
        for paragraph in paragraphs {
            self.push_paragraph(paragraph, doc);
        }
    }

    /// Append one paragraph, preceded by any headings it introduces.
    pub fn push_paragraph(&mut self, paragraph: &BodyParagraph, doc: &mut LinearDocument) {
        for (level, title) in paragraph.section_levels().into_iter().enumerate() {
            let title = self.options.delimiters.strip_all(title);
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            if title.is_empty() || self.headings.contains_key(&title) {
                continue;
            }

            let depth = match self.options.heading_depth {
                HeadingDepth::Discovery => self.headings.len() + 1,
                HeadingDepth::PathLevel => level + 1,
            };
            let heading = format!("{} {}", "#".repeat(depth), title);
            doc.push_structural(self.options.delimiters.section.wrap(&heading));
            self.headings.insert(title, depth);
        }

        doc.push_text(&paragraph.text, &self.options.delimiters);
    }
}

/// Linearize body paragraphs into a new document.
pub fn linearize_body(paragraphs: &[BodyParagraph], options: &RenderOptions) -> LinearDocument {
    let mut doc = LinearDocument::new();
    BodyLinearizer::new(options).linearize(paragraphs, &mut doc);
    doc
}
