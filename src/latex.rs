//! LaTeX citation scanner.
//!
//! Extracts citation keys from `\cite{a,b}`, `\citep[p.~4]{c}`, `\parencite*{d}`,
//! `\cites[see]{e}{f}` and the rest of the natbib, apacite and biblatex
//! citation families.
//!
//! This is a pattern match over the text, not a LaTeX parser: macros are not
//! expanded and malformed commands are silently skipped.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Command names that take a comma-separated list of citation keys.
const CITE_COMMANDS: &[&str] = &[
    // classic and natbib
    "cite",
    "Cite",
    "citep",
    "Citep",
    "citet",
    "Citet",
    "citealp",
    "Citealp",
    "citealt",
    "Citealt",
    "citeauthor",
    "Citeauthor",
    "citeyear",
    "Citeyear",
    "citeyearpar",
    "Citeyearpar",
    "citenum",
    // apacite and ACM
    "citeA",
    "citeNP",
    "citeANP",
    "citeyearNP",
    "citeN",
    "shortcite",
    "shortciteA",
    "shortciteNP",
    // biblatex
    "parencite",
    "Parencite",
    "textcite",
    "Textcite",
    "autocite",
    "Autocite",
    "footcite",
    "Footcite",
    "footcitetext",
    "Footcitetext",
    "smartcite",
    "Smartcite",
    "supercite",
    "fullcite",
    "citetitle",
    "Citetitle",
    "citeurl",
    "citedate",
    "nocite",
];

/// biblatex multicite commands: one or more `[pre][post]{keys}` groups,
/// optionally preceded by `(pre)(post)` notes for the whole list.
const MULTICITE_COMMANDS: &[&str] = &[
    "cites",
    "Cites",
    "parencites",
    "Parencites",
    "textcites",
    "Textcites",
    "autocites",
    "Autocites",
    "footcites",
    "Footcites",
    "footcitetexts",
    "smartcites",
    "Smartcites",
    "supercites",
];

// Group 1: command name, Group 2: the key list.
// The name must be followed by `*`, whitespace, `[` or `{`, so `\citefoo{x}` never matches.
static CITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"\\({})\*?\s*(?:\[[^\]]*\]\s*){{0,2}}\{{([^}}]*)\}}",
        CITE_COMMANDS.join("|")
    );
    Regex::new(&pattern).expect("citation pattern is a valid regex")
});

// Group 1: command name, Group 2: every `[..][..]{..}` group, back to back.
static MULTICITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"\\({})\s*(?:\([^)]*\)\s*){{0,2}}((?:(?:\[[^\]]*\]\s*){{0,2}}\{{[^}}]*\}})+)",
        MULTICITE_COMMANDS.join("|")
    );
    Regex::new(&pattern).expect("multicite pattern is a valid regex")
});

// Group 1 is set only for the `{..}` key lists; `[..]` notes are skipped.
static MULTICITE_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]|\{([^}]*)\}").expect("multicite group pattern is a valid regex")
});

/// A single citation command found in LaTeX text.
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    /// The command name without the backslash (e.g., "citep")
    pub command: String,
    /// The keys in the order they appear in the argument
    pub keys: Vec<String>,
    /// Start and end byte positions in the original text
    pub span: (usize, usize),
}

/// The distinct citation keys referenced by a set of LaTeX sources.
///
/// Keys are compared byte-for-byte: `Smith2020` and `smith2020` are different
/// keys. Iteration yields keys in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationSet {
    keys: BTreeSet<String>,
}

impl CitationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, returning `true` if it was not already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over the keys in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.keys.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for CitationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for CitationSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.keys.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a CitationSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Extracts every citation command from the given LaTeX text.
///
/// Commands with an empty key list are still reported, with no keys.
///
/// # Examples
///
/// ```
/// use bib_prune::extract_citations;
///
/// let citations = extract_citations(r"see \cite{foo, bar} and \citep[p.~3]{baz}");
/// assert_eq!(citations.len(), 2);
/// assert_eq!(citations[0].keys, vec!["foo", "bar"]);
/// assert_eq!(citations[1].command, "citep");
/// ```
pub fn extract_citations(latex: &str) -> Vec<Citation> {
    let single = CITE_RE.captures_iter(latex).filter_map(|cap| {
        let keys = split_keys(cap.get(2)?.as_str());
        citation_from(&cap, keys)
    });

    let multi = MULTICITE_RE.captures_iter(latex).filter_map(|cap| {
        let keys = MULTICITE_GROUP_RE
            .captures_iter(cap.get(2)?.as_str())
            .filter_map(|group| group.get(1))
            .flat_map(|list| split_keys(list.as_str()))
            .collect();
        citation_from(&cap, keys)
    });

    let mut citations: Vec<Citation> = single.chain(multi).collect();
    citations.sort_by_key(|citation| citation.span.0);
    citations
}

fn citation_from(cap: &Captures<'_>, keys: Vec<String>) -> Option<Citation> {
    let full_match = cap.get(0)?;
    Some(Citation {
        command: cap.get(1)?.as_str().to_string(),
        keys,
        span: (full_match.start(), full_match.end()),
    })
}

/// Collects the distinct keys cited anywhere in the given LaTeX sources.
///
/// An empty collection, or sources without citations, yield an empty set.
///
/// # Examples
///
/// ```
/// use bib_prune::collect_citation_keys;
///
/// let keys = collect_citation_keys([r"\cite{a,b}", r"\textcite{b} and \nocite{c}"]);
/// assert_eq!(keys.len(), 3);
/// assert!(keys.contains("c"));
/// ```
pub fn collect_citation_keys<'a, I>(sources: I) -> CitationSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut set = CitationSet::new();
    for source in sources {
        for citation in extract_citations(source) {
            set.extend(citation.keys);
        }
    }
    set
}

/// Splits a citation argument on commas, trimming each key and dropping blanks.
fn split_keys(argument: &str) -> Vec<String> {
    argument
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
