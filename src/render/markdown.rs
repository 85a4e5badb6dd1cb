//! Markdown assembly for papers.

use regex::Regex;

use crate::error::Result;
use crate::model::{BodyParagraph, Paper};

use super::bibliography::CitationIndex;
use super::body::BodyLinearizer;
use super::linear::{single_paragraph, LinearDocument};
use super::references::{resolve_references, Footnote};
use super::RenderOptions;

/// Heading of the generated footnote section.
pub const FOOTNOTE_HEADING: &str = "# FootNote";
/// Heading of the generated bibliography section.
pub const REFERENCE_HEADING: &str = "# Reference";

/// Convert a paper to its linear markdown document.
pub fn to_markdown(paper: &Paper, options: &RenderOptions) -> Result<String> {
    Ok(to_linear_document(paper, options).to_text())
}

/// Convert a paper to a linear document without joining paragraphs.
pub fn to_linear_document(paper: &Paper, options: &RenderOptions) -> LinearDocument {
    MarkdownRenderer::new(options.clone()).render(paper)
}

/// Document assembler.
///
/// Output order is title, author line, abstract, body, then the footnote and
/// bibliography appendix sections.
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render a paper into a linear document.
    pub fn render(&self, paper: &Paper) -> LinearDocument {
        let delimiters = &self.options.delimiters;
        let parse = &paper.latex_parse;
        let mut linearizer = BodyLinearizer::new(&self.options);

        let mut title = paper.title.trim().to_string();
        let mut authors = paper.author_line();
        let abstract_paragraphs = self.clean_abstract(&parse.abstract_text);

        let mut front = LinearDocument::new();
        if title.is_empty() && authors.is_empty() {
            let (recovered_title, recovered_authors, remainder) =
                recover_front_matter(&abstract_paragraphs);
            title = recovered_title;
            authors = recovered_authors;
            front.push_text(&remainder, delimiters);
        } else {
            linearizer.linearize(&abstract_paragraphs, &mut front);
        }

        let mut doc = LinearDocument::new();
        if !title.is_empty() {
            doc.push_text(&format!("**{}**", title), delimiters);
        }
        if !authors.trim().is_empty() {
            doc.push_text(&authors, delimiters);
        }
        doc.append(front);
        linearizer.linearize(&parse.body_text, &mut doc);

        let footnotes = resolve_references(&mut doc, &parse.ref_entries, delimiters);
        if self.options.include_appendix {
            doc.push_structural(FOOTNOTE_HEADING);
            doc.push_structural(delimiters.footnotes.wrap(&footnote_list(&footnotes)));
        }

        let mut citations = CitationIndex::new(&parse.bib_entries);
        doc.map_all(|text| citations.resolve(text));

        let bibliography = citations.finish();
        if self.options.include_appendix {
            let entries = bibliography
                .iter()
                .map(|(index, citation)| {
                    format!("[{}] {}", index, single_paragraph(citation, delimiters))
                })
                .collect::<Vec<_>>()
                .join("\n");
            doc.push_structural(REFERENCE_HEADING);
            doc.push_structural(delimiters.references.wrap(&entries));
        }

        doc
    }

    fn clean_abstract(&self, paragraphs: &[BodyParagraph]) -> Vec<BodyParagraph> {
        paragraphs
            .iter()
            .map(|paragraph| {
                let text = self
                    .options
                    .boilerplate_tokens
                    .iter()
                    .filter(|token| !token.is_empty())
                    .fold(paragraph.text.clone(), |acc, token| acc.replace(token.as_str(), ""));
                BodyParagraph {
                    text: text.trim().to_string(),
                    ..paragraph.clone()
                }
            })
            .collect()
    }
}

fn footnote_list(footnotes: &[Footnote]) -> String {
    footnotes
        .iter()
        .map(|footnote| format!("[{}] {}", footnote.num, footnote.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Take title and authors from the first abstract block: its first line is
/// the title, the remaining lines are the authors. Returns the rest of the
/// abstract as well.
fn recover_front_matter(paragraphs: &[BodyParagraph]) -> (String, String, String) {
    let full = paragraphs
        .iter()
        .map(|paragraph| paragraph.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let blank_line = Regex::new(r"\n[ \t\r]*\n").expect("valid regex");
    let mut blocks = blank_line.splitn(full.trim(), 2);
    let prefix = blocks.next().unwrap_or_default();
    let remainder = blocks.next().unwrap_or_default().to_string();

    let mut lines = prefix.lines().map(str::trim);
    let title = lines.next().unwrap_or_default().to_string();
    let authors = lines.collect::<Vec<_>>().join("\n");
    (title, authors, remainder)
}
