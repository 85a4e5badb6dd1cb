//! Rendering options and configuration.

/// A begin/end tag pair marking a region of the linear document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterPair {
    pub open: String,
    pub close: String,
}

impl DelimiterPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Wrap `inner` in this pair.
    pub fn wrap(&self, inner: &str) -> String {
        format!("{}{}{}", self.open, inner, self.close)
    }

    /// Content of the first region anywhere in `text`.
    pub fn find_inner<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = text.find(&self.open)? + self.open.len();
        let len = text[start..].find(&self.close)?;
        Some(&text[start..start + len])
    }

    /// Content of a region that begins `text`.
    pub fn leading_inner<'a>(&self, text: &'a str) -> Option<&'a str> {
        if !text.starts_with(&self.open) {
            return None;
        }
        self.find_inner(text)
    }

    /// Remove every occurrence of either tag from `text`.
    pub fn strip(&self, text: &str) -> String {
        text.replace(&self.open, "").replace(&self.close, "")
    }
}

/// The four placeholder pairs used in the linear document.
///
/// Regions never nest: each region is closed before another of the same kind
/// opens, and source text is stripped of these tags before it is placed in
/// the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    /// Section heading region
    pub section: DelimiterPair,
    /// Figure payload region
    pub figure: DelimiterPair,
    /// Footnote appendix region
    pub footnotes: DelimiterPair,
    /// Bibliography appendix region
    pub references: DelimiterPair,
}

impl Delimiters {
    /// All pairs, in a fixed order.
    pub fn pairs(&self) -> [&DelimiterPair; 4] {
        [&self.section, &self.figure, &self.footnotes, &self.references]
    }

    /// Remove every delimiter tag from `text`.
    pub fn strip_all(&self, text: &str) -> String {
        self.pairs()
            .iter()
            .fold(text.to_string(), |acc, pair| pair.strip(&acc))
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            section: DelimiterPair::new("[SECTION]", "[/SECTION]"),
            figure: DelimiterPair::new("[BEGIN_FIGURE]", "[END_FIGURE]"),
            footnotes: DelimiterPair::new("[FOOTNOTES]", "[/FOOTNOTES]"),
            references: DelimiterPair::new("[REFERENCES]", "[/REFERENCES]"),
        }
    }
}

/// How heading depth is assigned to a newly seen section title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingDepth {
    /// 1 + number of distinct titles seen before it
    #[default]
    Discovery,
    /// 1 + position of the title within its section path
    PathLevel,
}

/// Options for rendering a paper into a linear document.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Placeholder tags
    pub delimiters: Delimiters,

    /// Heading depth assignment
    pub heading_depth: HeadingDepth,

    /// Tokens removed from abstract text
    pub boilerplate_tokens: Vec<String>,

    /// Append the footnote and bibliography sections
    pub include_appendix: bool,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder tags.
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Set the heading depth mode.
    pub fn with_heading_depth(mut self, depth: HeadingDepth) -> Self {
        self.heading_depth = depth;
        self
    }

    /// Add a token to strip from the abstract.
    pub fn with_boilerplate_token(mut self, token: impl Into<String>) -> Self {
        self.boilerplate_tokens.push(token.into());
        self
    }

    /// Enable or disable the generated appendix sections.
    pub fn with_appendix(mut self, include: bool) -> Self {
        self.include_appendix = include;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            heading_depth: HeadingDepth::Discovery,
            boilerplate_tokens: vec!["nolistsep".to_string()],
            include_appendix: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_heading_depth(HeadingDepth::PathLevel)
            .with_boilerplate_token("noitemsep")
            .with_appendix(false);

        assert_eq!(options.heading_depth, HeadingDepth::PathLevel);
        assert_eq!(options.boilerplate_tokens, vec!["nolistsep", "noitemsep"]);
        assert!(!options.include_appendix);
    }

    #[test]
    fn test_delimiter_regions() {
        let pair = DelimiterPair::new("<<", ">>");
        assert_eq!(pair.wrap("x"), "<<x>>");
        assert_eq!(pair.find_inner("a <<b>> c <<d>>"), Some("b"));
        assert_eq!(pair.leading_inner("a <<b>>"), None);
        assert_eq!(pair.leading_inner("<<b>> tail"), Some("b"));
        assert_eq!(pair.find_inner("<<unterminated"), None);
    }

    #[test]
    fn test_strip_all() {
        let delimiters = Delimiters::default();
        let text = "x [SECTION]y[/SECTION] [FOOTNOTES]z";
        assert_eq!(delimiters.strip_all(text), "x y z");
    }
}
