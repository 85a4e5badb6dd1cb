//! Bibliography formatting and citation numbering.

use std::collections::{BTreeMap, HashMap};

use regex::{Captures, Regex, RegexBuilder};

use crate::model::{Author, BibEntry};

use super::references::natural_key;

const UNKNOWN_AUTHOR: &str = "Unknown Author";
const NO_DATE: &str = "n.d.";
const UNTITLED: &str = "Untitled";
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Format one bibliography entry as a citation string.
///
/// A non-empty `raw_text` is returned verbatim. Otherwise the citation is
/// synthesized as `Authors (year). *title*. venue, volume(issue), pp. pages.`
/// with a `Retrieved from <url>` suffix when the entry has a URL.
pub fn format_citation(entry: &BibEntry) -> String {
    if let Some(raw) = entry.raw_text.as_deref() {
        if !raw.trim().is_empty() {
            return raw.to_string();
        }
    }

    let authors = format_authors(&entry.authors);
    let year = entry.year.as_deref().unwrap_or(NO_DATE);
    let title = match entry.title.trim() {
        "" => UNTITLED,
        title => title,
    };

    let mut citation = format!("{} ({}). *{}*.", authors, year, title);

    let journal = journal_info(entry);
    if !journal.is_empty() {
        citation.push(' ');
        citation.push_str(&journal);
        citation.push('.');
    }

    if let Some(url) = entry.urls.iter().find(|url| !url.trim().is_empty()) {
        citation.push_str(" Retrieved from ");
        citation.push_str(url.trim());
    }

    citation
}

fn format_authors(authors: &[Author]) -> String {
    let names: Vec<String> = authors
        .iter()
        .map(Author::display_name)
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [single] => single.clone(),
        [head @ .., last] => format!("{} & {}", head.join(", "), last),
    }
}

fn journal_info(entry: &BibEntry) -> String {
    let mut parts = Vec::new();

    if let Some(venue) = entry.venue.as_deref() {
        parts.push(venue.trim().to_string());
    }

    let issue = entry.issue.as_deref().map(|issue| format!("({})", issue.trim()));
    match (entry.volume.as_deref(), issue) {
        (Some(volume), Some(issue)) => parts.push(format!("{}{}", volume.trim(), issue)),
        (Some(volume), None) => parts.push(volume.trim().to_string()),
        (None, Some(issue)) => parts.push(issue),
        (None, None) => {}
    }

    if let Some(pages) = entry.pages.as_deref() {
        parts.push(format!("pp. {}", pages.trim()));
    }

    parts.join(", ")
}

/// Assigns 1-based citation numbers in first-seen order.
///
/// Text passed through [`CitationIndex::resolve`] has each known citation id
/// replaced by `[n]`. Entries never cited are numbered after all cited ones,
/// in natural id order, when the index is finished.
pub struct CitationIndex<'a> {
    entries: &'a BTreeMap<String, BibEntry>,
    pattern: Option<Regex>,
    assigned: HashMap<String, usize>,
    order: Vec<String>,
}

impl<'a> CitationIndex<'a> {
    /// Build an index over the bibliography table.
    pub fn new(entries: &'a BTreeMap<String, BibEntry>) -> Self {
        let mut ids: Vec<&str> = entries
            .keys()
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
            .collect();
        // Longest first so that BIBREF10 is never matched as BIBREF1.
        ids.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = citation_pattern(&ids, PATTERN_SIZE_LIMIT);

        Self {
            entries,
            pattern,
            assigned: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Replace citation ids in `text` with their numbers.
    pub fn resolve(&mut self, text: &str) -> String {
        let Some(pattern) = self.pattern.clone() else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures| {
                let id = &caps[0];
                format!("[{}]", self.number_for(id))
            })
            .into_owned()
    }

    fn number_for(&mut self, id: &str) -> usize {
        if let Some(&number) = self.assigned.get(id) {
            return number;
        }
        self.order.push(id.to_string());
        let number = self.order.len();
        self.assigned.insert(id.to_string(), number);
        number
    }

    /// Number of citation ids seen so far.
    pub fn cited_count(&self) -> usize {
        self.order.len()
    }

    /// Formatted bibliography, in number order.
    pub fn finish(mut self) -> Vec<(usize, String)> {
        let mut uncited: Vec<&String> = self
            .entries
            .keys()
            .filter(|id| !self.assigned.contains_key(id.as_str()))
            .collect();
        uncited.sort_by_key(|id| natural_key(id));
        let uncited: Vec<String> = uncited.into_iter().cloned().collect();
        for id in uncited {
            self.number_for(&id);
        }

        self.order
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                self.entries
                    .get(id)
                    .map(|entry| (i + 1, format_citation(entry)))
            })
            .collect()
    }
}

/// Alternation over all citation ids. `None` when there are no ids or the
/// pattern does not fit in `size_limit`.
fn citation_pattern(ids: &[&str], size_limit: usize) -> Option<Regex> {
    if ids.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = ids.iter().map(|id| bounded(id)).collect();
    match RegexBuilder::new(&alternatives.join("|"))
        .size_limit(size_limit)
        .build()
    {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            log::warn!(
                "Citation pattern over {} ids could not be built, citations stay unresolved: {}",
                ids.len(),
                e
            );
            None
        }
    }
}

fn bounded(id: &str) -> String {
    let escaped = regex::escape(id);
    let word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let prefix = if word(id.chars().next()) { r"\b" } else { "" };
    let suffix = if word(id.chars().last()) { r"\b" } else { "" };
    format!("{}{}{}", prefix, escaped, suffix)
}
