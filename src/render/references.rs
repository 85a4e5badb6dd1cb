//! Reference-marker resolution.
//!
//! The upstream converter leaves bare reference ids (`FIGREF0`, `TABREF2`,
//! `FOOTREF1`, `SECREF3`, ...) in paragraph text, surrounded by single
//! spaces. Each entry of the reference table is resolved against the linear
//! document:
//!
//! - figures are inserted as a delimited JSON payload before the paragraph
//!   that first mentions them, and the marker becomes the figure number;
//! - tables are inserted as caption plus raw HTML, and the marker becomes the
//!   table number;
//! - footnotes become `[^n]` anchors and are collected for the appendix;
//! - sections become a dotted number path built from the parent chain.
//!
//! Entries are processed in the order their markers first appear in the
//! document; entries never mentioned follow in natural id order. Markers
//! whose id has no entry are left untouched.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{RefEntry, RefKind};

use super::linear::{single_paragraph, LinearDocument, ParagraphKind};
use super::options::Delimiters;

/// Payload serialized inside a figure region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigurePayload {
    pub ref_id: String,
    #[serde(default)]
    pub num: Option<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub uris: Vec<String>,
}

impl FigurePayload {
    /// Caption text for the figure's caption block.
    pub fn caption_line(&self) -> String {
        match self.num.as_deref() {
            Some(num) => format!("Figure {}: {}", num, self.caption),
            None => format!("Figure: {}", self.caption),
        }
    }
}

/// A footnote collected during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    /// Display number (the ref id when the entry has none)
    pub num: String,
    /// Footnote body
    pub text: String,
}

/// Sort key giving `FIGREF2 < FIGREF10`.
pub(crate) fn natural_key(id: &str) -> (String, u64, String) {
    let digits_at = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    let (prefix, digits) = id.split_at(digits_at);
    let number = digits.parse::<u64>().unwrap_or(0);
    (prefix.to_string(), number, id.to_string())
}

fn marker(ref_id: &str) -> String {
    format!(" {} ", ref_id)
}

/// Resolves every reference entry against a linear document.
pub struct ReferenceResolver<'a> {
    entries: &'a BTreeMap<String, RefEntry>,
    delimiters: &'a Delimiters,
    footnotes: Vec<Footnote>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(entries: &'a BTreeMap<String, RefEntry>, delimiters: &'a Delimiters) -> Self {
        Self {
            entries,
            delimiters,
            footnotes: Vec::new(),
        }
    }

    /// Entry ids in resolution order.
    pub fn resolution_order(&self, doc: &LinearDocument) -> Vec<&'a str> {
        let entries: &'a BTreeMap<String, RefEntry> = self.entries;
        let mut located = Vec::new();
        let mut unlocated = Vec::new();
        for id in entries.keys() {
            match doc.find_first(&marker(id)) {
                Some(position) => located.push((position, id.as_str())),
                None => unlocated.push(id.as_str()),
            }
        }
        located.sort();
        unlocated.sort_by_key(|id| natural_key(id));
        located
            .into_iter()
            .map(|(_, id)| id)
            .chain(unlocated)
            .collect()
    }

    /// Resolve all entries and return the collected footnotes in natural
    /// number order.
    pub fn resolve(mut self, doc: &mut LinearDocument) -> Vec<Footnote> {
        let entries: &'a BTreeMap<String, RefEntry> = self.entries;
        for id in self.resolution_order(doc) {
            let Some(entry) = entries.get(id) else {
                continue;
            };
            match entry.kind(id) {
                RefKind::Figure => self.resolve_figure(doc, id, entry),
                RefKind::Table => self.resolve_table(doc, id, entry),
                RefKind::Footnote => self.resolve_footnote(doc, id, entry),
                RefKind::Section => self.resolve_section(doc, id, entry),
                RefKind::Unknown => {
                    log::debug!("Leaving reference {} unresolved: unknown type", id);
                }
            }
        }

        let mut footnotes = self.footnotes;
        footnotes.sort_by_key(|footnote| natural_key(&footnote.num));
        footnotes
    }

    fn resolve_figure(&self, doc: &mut LinearDocument, id: &str, entry: &RefEntry) {
        let payload = FigurePayload {
            ref_id: id.to_string(),
            num: entry.num.clone(),
            caption: single_paragraph(&entry.text, self.delimiters).replace('\n', " "),
            uris: entry.uris.clone(),
        };
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to encode figure {}: {}", id, e);
                return;
            }
        };

        let region = self.delimiters.figure.wrap(&json);
        let index = self.insertion_index(doc, id);
        doc.insert(index, region, ParagraphKind::Structural);
        self.replace_with_number(doc, id, entry.num.as_deref());
    }

    fn resolve_table(&self, doc: &mut LinearDocument, id: &str, entry: &RefEntry) {
        let index = self.insertion_index(doc, id);
        let html = single_paragraph(&entry.html, self.delimiters);
        let caption = single_paragraph(&entry.text, self.delimiters);

        // Insert HTML first so the caption lands in front of it.
        doc.insert(index, html, ParagraphKind::Structural);
        doc.insert(index, caption, ParagraphKind::Text);
        self.replace_with_number(doc, id, entry.num.as_deref());
    }

    fn resolve_footnote(&mut self, doc: &mut LinearDocument, id: &str, entry: &RefEntry) {
        let num = entry.num.clone().unwrap_or_else(|| id.to_string());
        doc.replace_all(&marker(id), &format!("[^{}]", num));
        self.footnotes.push(Footnote {
            num,
            text: single_paragraph(&entry.text, self.delimiters),
        });
    }

    fn resolve_section(&self, doc: &mut LinearDocument, id: &str, entry: &RefEntry) {
        let path = self.section_path(id, entry);
        if path.is_none() {
            log::debug!("Section {} has an incomplete number chain", id);
        }
        self.replace_with_number(doc, id, path.as_deref());
    }

    /// Dotted section number, most significant first. `None` when any
    /// ancestor is missing, has no number, or the chain loops.
    fn section_path(&self, id: &str, entry: &RefEntry) -> Option<String> {
        let mut numbers = vec![entry.num.clone()?];
        let mut visited = HashSet::from([id]);
        let mut parent = entry.parent.as_deref();

        while let Some(parent_id) = parent {
            if !visited.insert(parent_id) {
                return None;
            }
            let ancestor = self.entries.get(parent_id)?;
            numbers.push(ancestor.num.clone()?);
            parent = ancestor.parent.as_deref();
        }

        numbers.reverse();
        Some(numbers.join("."))
    }

    fn insertion_index(&self, doc: &LinearDocument, id: &str) -> usize {
        doc.find_first(&marker(id))
            .map(|(index, _)| index)
            .unwrap_or_else(|| doc.len())
    }

    fn replace_with_number(&self, doc: &mut LinearDocument, id: &str, number: Option<&str>) {
        let replacement = match number {
            Some(number) => format!(" {} ", number),
            None => " ".to_string(),
        };
        doc.replace_all(&marker(id), &replacement);
    }
}

/// Resolve all reference entries in `doc`, returning the footnotes.
pub fn resolve_references(
    doc: &mut LinearDocument,
    entries: &BTreeMap<String, RefEntry>,
    delimiters: &Delimiters,
) -> Vec<Footnote> {
    ReferenceResolver::new(entries, delimiters).resolve(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(type_str: &str, num: Option<&str>) -> RefEntry {
        RefEntry {
            type_str: type_str.to_string(),
            num: num.map(str::to_string),
            ..Default::default()
        }
    }

    fn doc(text: &str) -> LinearDocument {
        let mut doc = LinearDocument::new();
        doc.push_text(text, &Delimiters::default());
        doc
    }

    #[test]
    fn test_natural_key() {
        let mut ids = vec!["FIGREF10", "FIGREF2", "BIBREF1", "x"];
        ids.sort_by_key(|id| natural_key(id));
        assert_eq!(ids, vec!["BIBREF1", "FIGREF2", "FIGREF10", "x"]);
    }

    #[test]
    fn test_figure_inserted_before_first_mention() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "FIGREF0".to_string(),
            RefEntry {
                text: "A plot".to_string(),
                uris: vec!["a.png".to_string()],
                ..entry("figure", Some("1"))
            },
        );
        let mut doc = doc("intro\n\nsee FIGREF0 here\n\nand FIGREF0 again");
        let footnotes = resolve_references(&mut doc, &entries, &Delimiters::default());

        assert!(footnotes.is_empty());
        assert_eq!(doc.len(), 4);
        assert!(doc.get(1).unwrap().starts_with("[BEGIN_FIGURE]{"));
        assert_eq!(doc.get(2), Some("see 1 here"));
        assert_eq!(doc.get(3), Some("and 1 again"));

        let inner = Delimiters::default().figure.find_inner(doc.get(1).unwrap()).unwrap().to_string();
        let payload: FigurePayload = serde_json::from_str(&inner).unwrap();
        assert_eq!(payload.caption_line(), "Figure 1: A plot");
        assert_eq!(payload.uris, vec!["a.png"]);
    }

    #[test]
    fn test_unmentioned_figure_appended() {
        let mut entries = BTreeMap::new();
        entries.insert("FIGREF3".to_string(), entry("figure", Some("4")));
        let mut doc = doc("no mention");
        resolve_references(&mut doc, &entries, &Delimiters::default());
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.kind(1), Some(ParagraphKind::Structural));
    }

    #[test]
    fn test_table_inserts_caption_and_html() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "TABREF0".to_string(),
            RefEntry {
                text: "Results".to_string(),
                html: "<table><tr><td>1</td></tr></table>".to_string(),
                ..entry("table", Some("2"))
            },
        );
        let mut doc = doc("a\n\nTable TABREF0 shows");
        resolve_references(&mut doc, &entries, &Delimiters::default());
        let paragraphs: Vec<_> = doc.iter().collect();
        assert_eq!(
            paragraphs,
            vec!["a", "Results", "<table><tr><td>1</td></tr></table>", "Table 2 shows"]
        );
    }

    #[test]
    fn test_footnotes_collected_in_order() {
        let mut entries = BTreeMap::new();
        entries.insert("FOOTREF0".to_string(), RefEntry { text: "first".into(), ..entry("footnote", Some("10")) });
        entries.insert("FOOTREF1".to_string(), RefEntry { text: "second".into(), ..entry("footnote", Some("2")) });
        let mut doc = doc("x FOOTREF0 y FOOTREF1 z");
        let footnotes = resolve_references(&mut doc, &entries, &Delimiters::default());

        assert_eq!(doc.get(0), Some("x[^10]y[^2]z"));
        let nums: Vec<_> = footnotes.iter().map(|f| f.num.as_str()).collect();
        assert_eq!(nums, vec!["2", "10"]);
    }

    #[test]
    fn test_section_path() {
        let mut entries = BTreeMap::new();
        entries.insert("SECREF0".to_string(), entry("section", Some("2")));
        entries.insert("SECREF1".to_string(), RefEntry { parent: Some("SECREF0".into()), ..entry("section", Some("1")) });
        entries.insert("SECREF2".to_string(), RefEntry { parent: Some("SECREF1".into()), ..entry("section", Some("3")) });
        entries.insert("SECREF3".to_string(), RefEntry { parent: Some("SECREF4".into()), ..entry("section", Some("5")) });
        entries.insert("SECREF4".to_string(), entry("section", None));

        let mut doc = doc("see SECREF2 and SECREF3 now");
        resolve_references(&mut doc, &entries, &Delimiters::default());
        assert_eq!(doc.get(0), Some("see 2.1.3 and now"));
    }

    #[test]
    fn test_section_cycle_is_unknown() {
        let mut entries = BTreeMap::new();
        entries.insert("SECREF0".to_string(), RefEntry { parent: Some("SECREF1".into()), ..entry("section", Some("1")) });
        entries.insert("SECREF1".to_string(), RefEntry { parent: Some("SECREF0".into()), ..entry("section", Some("2")) });

        let mut doc = doc("in SECREF0 here");
        resolve_references(&mut doc, &entries, &Delimiters::default());
        assert_eq!(doc.get(0), Some("in here"));
    }

    #[test]
    fn test_missing_entry_keeps_marker() {
        let mut entries = BTreeMap::new();
        entries.insert("FIGREF0".to_string(), entry("figure", Some("1")));
        let mut doc = doc("see FIGREF9 here");
        resolve_references(&mut doc, &entries, &Delimiters::default());
        assert_eq!(doc.get(0), Some("see FIGREF9 here"));
    }

    #[test]
    fn test_resolution_order_follows_document() {
        let mut entries = BTreeMap::new();
        entries.insert("FIGREF0".to_string(), entry("figure", Some("1")));
        entries.insert("FIGREF1".to_string(), entry("figure", Some("2")));
        entries.insert("FIGREF10".to_string(), entry("figure", Some("3")));
        entries.insert("FIGREF2".to_string(), entry("figure", Some("4")));

        let delimiters = Delimiters::default();
        let doc = doc("a FIGREF1 b\n\nc FIGREF0 d");
        let resolver = ReferenceResolver::new(&entries, &delimiters);
        assert_eq!(
            resolver.resolution_order(&doc),
            vec!["FIGREF1", "FIGREF0", "FIGREF2", "FIGREF10"]
        );
    }
}
