//! Splitting a bibliography into cited and uncited entries.

use serde::Serialize;
use thiserror::Error;

use crate::bibtex::{parse_bibliography, BibDocument, BibParseError};
use crate::latex::CitationSet;

/// Errors that stop a bibliography from being pruned.
#[derive(Error, Debug)]
pub enum PruneError {
    #[error("No bibliography was supplied")]
    MissingBibliography,

    #[error("Malformed bibliography: {0}")]
    Malformed(#[from] BibParseError),
}

/// Entry counts for one run. `kept + removed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Entries parsed from the bibliography
    pub total: usize,
    /// Entries whose key is cited
    pub kept: usize,
    /// Entries whose key is not cited
    pub removed: usize,
}

/// The two halves of a bibliography after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Cited entries, plus every directive and the leading and trailing text
    /// of the original document
    pub kept: BibDocument,
    /// Uncited entries only
    pub removed: BibDocument,
}

impl Partition {
    pub fn summary(&self) -> Summary {
        Summary {
            total: self.kept.len() + self.removed.len(),
            kept: self.kept.len(),
            removed: self.removed.len(),
        }
    }
}

/// Splits a parsed document by citation-set membership.
///
/// An entry is kept iff its key is in `cited`, compared exactly and
/// case-sensitively. Both halves preserve the original order. Directives
/// (`@string`, `@preamble`, `@comment`) all go to the kept half so that
/// abbreviations used by kept entries still resolve, as do the leading and
/// trailing free text.
pub fn partition(doc: BibDocument, cited: &CitationSet) -> Partition {
    let (kept, removed): (Vec<_>, Vec<_>) = doc
        .entries
        .into_iter()
        .partition(|entry| cited.contains(&entry.key));

    Partition {
        kept: BibDocument {
            leading: doc.leading,
            directives: doc.directives,
            entries: kept,
            trailing: doc.trailing,
        },
        removed: BibDocument {
            entries: removed,
            ..BibDocument::default()
        },
    }
}

/// Parses `bibliography` and partitions it against `cited`.
///
/// `None` means no bibliography was found at all, which is an error; an
/// empty or entry-less bibliography is not, and yields an empty partition.
/// An empty `cited` set moves every entry to the removed half.
///
/// # Errors
///
/// * [`PruneError::MissingBibliography`] if `bibliography` is `None`
/// * [`PruneError::Malformed`] if the document ends inside an entry
///
/// # Examples
///
/// ```
/// use bib_prune::{collect_citation_keys, prune};
///
/// let cited = collect_citation_keys([r"see \cite{foo,bar} and \citep{baz}"]);
/// let bib = "@misc{foo}\n@misc{bar}\n@misc{qux}\n";
///
/// let partition = prune(Some(bib), &cited).unwrap();
/// let summary = partition.summary();
/// assert_eq!((summary.total, summary.kept, summary.removed), (3, 2, 1));
/// ```
pub fn prune(bibliography: Option<&str>, cited: &CitationSet) -> Result<Partition, PruneError> {
    let text = bibliography.ok_or(PruneError::MissingBibliography)?;
    let doc = parse_bibliography(text)?;
    let result = partition(doc, cited);

    let summary = result.summary();
    tracing::info!(
        total = summary.total,
        kept = summary.kept,
        removed = summary.removed,
        "filtered bibliography"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibtex::BibEntry;
    use crate::latex::collect_citation_keys;

    const BIB: &str = "@misc{foo, note = {f}}\n@misc{bar, note = {b}}\n@misc{qux, note = {q}}\n";

    fn keys(doc: &BibDocument) -> Vec<&str> {
        doc.keys().collect()
    }

    fn cited(keys: &[&str]) -> CitationSet {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_example_scenario() {
        // Given: citations foo, bar, baz and entries foo, bar, qux
        let cited = collect_citation_keys([r"see \cite{foo,bar} and \citep{baz}"]);

        // When: we prune
        let partition = prune(Some(BIB), &cited).unwrap();

        // Then: foo and bar survive, qux is removed
        assert_eq!(keys(&partition.kept), vec!["foo", "bar"]);
        assert_eq!(keys(&partition.removed), vec!["qux"]);
        assert_eq!(
            partition.summary(),
            Summary {
                total: 3,
                kept: 2,
                removed: 1
            }
        );
    }

    #[test]
    fn test_missing_bibliography() {
        let result = prune(None, &cited(&["a"]));
        assert!(matches!(result, Err(PruneError::MissingBibliography)));
    }

    #[test]
    fn test_malformed_bibliography() {
        // Given: an entry without its closing brace
        let bib = "@misc{foo, note = {f}}\n@article{broken, title = {x}\n";

        // When: we prune
        let result = prune(Some(bib), &cited(&["foo"]));

        // Then: the parse error is surfaced, no partition produced
        match result {
            Err(PruneError::Malformed(err)) => assert_eq!(err.line, 2),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_bibliography_is_not_an_error() {
        let partition = prune(Some("% no entries\n"), &cited(&["a"])).unwrap();
        assert_eq!(partition.summary(), Summary::default());
    }

    #[test]
    fn test_empty_citation_set_removes_everything() {
        // Given: no citations at all
        let cited = collect_citation_keys(Vec::<&str>::new());

        // When: we prune
        let partition = prune(Some(BIB), &cited).unwrap();

        // Then: nothing is kept
        assert!(partition.kept.is_empty());
        assert_eq!(partition.summary().removed, 3);
    }

    #[test]
    fn test_case_sensitive_keys() {
        // Given: an entry keyed Smith2020 and a citation of smith2020
        let bib = "@misc{Smith2020}\n@misc{smith2021}";

        // When: we prune
        let partition = prune(Some(bib), &cited(&["smith2020", "Smith2021"])).unwrap();

        // Then: neither crosses over
        assert!(partition.kept.is_empty());
        assert_eq!(keys(&partition.removed), vec!["Smith2020", "smith2021"]);
    }

    #[test]
    fn test_multi_key_citation_keeps_each_entry() {
        let cited = collect_citation_keys([r"\cite{a,b,c}"]);
        let bib = "@misc{c}\n@misc{x}\n@misc{a}\n@misc{b}";

        let partition = prune(Some(bib), &cited).unwrap();

        assert_eq!(keys(&partition.kept), vec!["c", "a", "b"]);
        assert_eq!(keys(&partition.removed), vec!["x"]);
    }

    #[test]
    fn test_directives_stay_with_kept_half() {
        // Given: a @string used by an uncited entry and a cited one
        let bib = "@string{acm = \"ACM\"}\n@misc{a, publisher = acm}\n@misc{b, publisher = acm}";

        // When: we prune, citing only a
        let partition = prune(Some(bib), &cited(&["a"])).unwrap();

        // Then: the directive is kept and not counted
        assert_eq!(partition.kept.directives.len(), 1);
        assert!(partition.removed.directives.is_empty());
        assert_eq!(partition.summary().total, 2);
    }

    #[test]
    fn test_header_and_footer_stay_with_kept_half() {
        let bib = "% Encoding: UTF-8\n@misc{a}\n@misc{b}\n% jabref footer\n";
        let partition = prune(Some(bib), &cited(&["b"])).unwrap();

        assert_eq!(partition.kept.leading, "% Encoding: UTF-8");
        assert_eq!(partition.kept.trailing, "% jabref footer");
        assert!(partition.removed.leading.is_empty());
        assert!(partition.removed.trailing.is_empty());
    }

    #[test]
    fn test_duplicate_keys_share_a_fate() {
        let bib = "@misc{dup, note = {1}}\n@misc{dup, note = {2}}\n@misc{other}";
        let partition = prune(Some(bib), &cited(&["dup"])).unwrap();

        assert_eq!(partition.kept.len(), 2);
        assert_eq!(partition.removed.len(), 1);
    }

    #[test]
    fn test_counts_always_add_up() {
        let sources = [
            (r"\cite{foo}", BIB),
            ("", BIB),
            (r"\cite{foo,bar,qux,extra}", BIB),
            (r"\cite{a}", ""),
        ];

        for (latex, bib) in sources {
            let partition = prune(Some(bib), &collect_citation_keys([latex])).unwrap();
            let summary = partition.summary();
            assert_eq!(summary.kept + summary.removed, summary.total);
        }
    }

    #[test]
    fn test_kept_keys_are_the_intersection() {
        let cited = cited(&["bar", "qux", "missing"]);
        let partition = prune(Some(BIB), &cited).unwrap();

        for entry in &partition.kept.entries {
            assert!(cited.contains(&entry.key));
        }
        for entry in &partition.removed.entries {
            assert!(!cited.contains(&entry.key));
        }
        assert_eq!(keys(&partition.kept), vec!["bar", "qux"]);
    }

    #[test]
    fn test_filtering_kept_output_is_idempotent() {
        // Given: a first pruning pass
        let cited = cited(&["foo", "qux"]);
        let first = prune(Some(BIB), &cited).unwrap();

        // When: we prune its kept half again with the same citations
        let second = partition(first.kept.clone(), &cited);

        // Then: everything is kept
        assert_eq!(second.kept, first.kept);
        assert!(second.removed.is_empty());
    }

    #[test]
    fn test_halves_reconstruct_the_original_entries() {
        // Given: the parsed original
        let original = parse_bibliography(BIB).unwrap();

        // When: we partition and merge the halves back
        let result = partition(original.clone(), &cited(&["bar"]));
        let mut merged: Vec<BibEntry> = result
            .kept
            .entries
            .into_iter()
            .chain(result.removed.entries)
            .collect();
        merged.sort_by_key(|entry| entry.span.0);

        // Then: every entry is present once with identical text
        assert_eq!(merged, original.entries);
    }
}
