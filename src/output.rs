//! Output generation for pruned bibliographies.
//!
//! Turns the kept and removed halves back into `.bib` text and decides where
//! the removed entries are written.

use std::path::{Path, PathBuf};

use crate::bibtex::BibDocument;
use crate::filter::{Partition, Summary};

/// File name used for removed entries when none is given.
pub const REMOVED_FILE_NAME: &str = "remove.bib.bak";

/// Renders a document back to BibTeX text.
///
/// The leading text comes first, then directives and entries in their
/// original source order, then the trailing text. Every block is written
/// exactly as it appeared in the source and blocks are separated by a blank
/// line. A non-empty result ends with a single newline; an empty document
/// renders as an empty string.
///
/// # Examples
///
/// ```
/// use bib_prune::{parse_bibliography, render_document};
///
/// let doc = parse_bibliography("@misc{a}  junk  @misc{b, note = {x}}").unwrap();
/// assert_eq!(render_document(&doc), "@misc{a}\n\n@misc{b, note = {x}}\n");
/// ```
pub fn render_document(doc: &BibDocument) -> String {
    let mut blocks: Vec<(usize, &str)> = doc
        .directives
        .iter()
        .map(|directive| (directive.span.0, directive.text.as_str()))
        .chain(doc.entries.iter().map(|entry| (entry.span.0, entry.text.as_str())))
        .collect();
    blocks.sort_by_key(|(start, _)| *start);

    let texts: Vec<&str> = std::iter::once(doc.leading.as_str())
        .chain(blocks.into_iter().map(|(_, text)| text))
        .chain(std::iter::once(doc.trailing.as_str()))
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        return String::new();
    }

    let mut output = texts.join("\n\n");
    output.push('\n');
    output
}

/// The text handed to the writer at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedOutput {
    /// The cleaned bibliography
    pub kept: String,
    /// The entries that were dropped
    pub removed: String,
    pub summary: Summary,
}

/// Renders both halves of a partition.
pub fn render_partition(partition: &Partition) -> PrunedOutput {
    PrunedOutput {
        kept: render_document(&partition.kept),
        removed: render_document(&partition.removed),
        summary: partition.summary(),
    }
}

/// Default location of the removed-entries file: next to the output file.
pub fn removed_path_for(output: &Path) -> PathBuf {
    match output.parent() {
        Some(dir) => dir.join(REMOVED_FILE_NAME),
        None => PathBuf::from(REMOVED_FILE_NAME),
    }
}
