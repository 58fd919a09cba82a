//! bib-prune: remove uncited entries from a BibTeX bibliography.
//!
//! This library provides functionality to:
//! - Extract citation keys from LaTeX sources (`\cite`, `\citep`, `\parencite`, ...)
//! - Split a `.bib` document into entries without touching their text
//! - Partition the entries into cited and uncited halves
//! - Read the LaTeX and BibTeX members of a ZIP archive
//! - Render the halves back to BibTeX and summarize the run

pub mod archive;
pub mod bibtex;
pub mod filter;
pub mod latex;
pub mod output;
pub mod report;

pub use archive::{load_archive, read_archive, ArchiveError, ProjectSources, SourceFile};
pub use bibtex::{parse_bibliography, BibDocument, BibEntry, BibParseError, Directive, ScanState};
pub use filter::{partition, prune, Partition, PruneError, Summary};
pub use latex::{collect_citation_keys, extract_citations, Citation, CitationSet};
pub use output::{removed_path_for, render_document, render_partition, PrunedOutput};
pub use report::render_summary;
