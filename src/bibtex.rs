//! BibTeX entry scanner.
//!
//! Splits a `.bib` document into entries without interpreting their fields.
//! Each entry keeps its exact source text so that writing it back out is
//! lossless.
//!
//! The scan is a small state machine over characters:
//!
//! ```text
//! OutsideEntry --'@'--> AtMarker --'{' or '('--> InKey --','--> InBody --closer--> OutsideEntry
//! ```
//!
//! `@string`, `@preamble` and `@comment` blocks skip `InKey` and are kept as
//! [`Directive`]s. Brace depth is tracked in `InBody` so that braces inside
//! field values never close the entry. Free text before the first block and
//! after the last one is kept; free text between blocks is dropped.

use std::fmt;

use thiserror::Error;

/// Entry types that are BibTeX commands rather than citable records.
const DIRECTIVE_KINDS: &[&str] = &["comment", "preamble", "string"];

/// Where the scanner is within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Between blocks; any text here is an implicit comment.
    OutsideEntry,
    /// After `@`, reading the entry type up to the opening delimiter.
    AtMarker,
    /// After the opening delimiter, reading the citation key up to the first comma.
    InKey,
    /// Inside the fields, tracking nested braces until the closing delimiter.
    InBody,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ScanState::OutsideEntry => "outside any entry",
            ScanState::AtMarker => "before the opening delimiter",
            ScanState::InKey => "inside the citation key",
            ScanState::InBody => "inside the entry body",
        };
        f.write_str(description)
    }
}

/// A `.bib` document that ends in the middle of a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "unterminated block `@{kind}` starting at line {line}, column {column} (byte {offset}); input ended {state}"
)]
pub struct BibParseError {
    /// Byte offset of the block's `@`
    pub offset: usize,
    /// 1-based line of the block's `@`
    pub line: usize,
    /// 1-based column (in characters) of the block's `@`
    pub column: usize,
    /// The entry type read so far (may be empty)
    pub kind: String,
    /// State the scanner was in when the input ran out
    pub state: ScanState,
}

/// One citable bibliography record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    /// Entry type as written (e.g., "article", "InProceedings")
    pub kind: String,
    /// Citation key, trimmed
    pub key: String,
    /// Verbatim source, from `@` through the closing delimiter
    pub text: String,
    /// Start and end byte positions in the original document
    pub span: (usize, usize),
}

/// A `@string`, `@preamble` or `@comment` block, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Command name as written (e.g., "string", "PREAMBLE")
    pub kind: String,
    /// Verbatim source, from `@` through the closing delimiter
    pub text: String,
    /// Start and end byte positions in the original document
    pub span: (usize, usize),
}

/// The blocks of a `.bib` document, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibDocument {
    /// Free text before the first block (e.g. `% Encoding: UTF-8`), trimmed
    pub leading: String,
    pub directives: Vec<Directive>,
    pub entries: Vec<BibEntry>,
    /// Free text after the last block, trimmed
    pub trailing: String,
}

impl BibDocument {
    /// Number of citable entries (directives are not counted).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }
}

/// Block under construction.
struct OpenBlock {
    start: usize,
    kind: Option<(usize, usize)>,
    closer: char,
    key: (usize, usize),
    depth: usize,
    in_quote: bool,
    directive: bool,
}

impl OpenBlock {
    fn at(start: usize) -> Self {
        Self {
            start,
            kind: None,
            closer: '}',
            key: (0, 0),
            depth: 0,
            in_quote: false,
            directive: false,
        }
    }

    fn kind<'a>(&self, input: &'a str) -> &'a str {
        self.kind.map_or("", |(start, end)| &input[start..end])
    }
}

fn is_kind_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Whether an `@` at `offset` reads as the start of a block rather than
/// part of free text: it is not glued to a preceding word (`alice@lab`) and
/// its line is not a `%` comment.
fn starts_block(input: &str, offset: usize) -> bool {
    let before = &input[..offset];
    if before.chars().next_back().is_some_and(char::is_alphanumeric) {
        return false;
    }
    let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
    !before[line_start..].trim_start().starts_with('%')
}

/// Parses a BibTeX document into entries and directives.
///
/// Text before the first block and after the last one is kept, trimmed, as
/// [`BibDocument::leading`] and [`BibDocument::trailing`]; text between blocks
/// is discarded. An `@` whose type is followed by anything other than
/// whitespace or an opening delimiter (as in an e-mail address) is not
/// treated as a block.
///
/// # Errors
///
/// Returns [`BibParseError`] if the input ends inside a block, for example
/// when an entry is missing its closing brace. A dangling `@word` at the end
/// of the input is only an error when it stands on its own; inside a word or
/// on a `%` comment line it is free text.
///
/// # Examples
///
/// ```
/// use bib_prune::parse_bibliography;
///
/// let doc = parse_bibliography("@article{knuth, title = {The {\\TeX}book}}").unwrap();
/// assert_eq!(doc.entries.len(), 1);
/// assert_eq!(doc.entries[0].key, "knuth");
/// ```
pub fn parse_bibliography(input: &str) -> Result<BibDocument, BibParseError> {
    let mut doc = BibDocument::default();
    let mut state = ScanState::OutsideEntry;
    let mut block = OpenBlock::at(0);
    // Start of the first closed block and end of the last one
    let mut blocks_span: Option<(usize, usize)> = None;

    for (i, c) in input.char_indices() {
        let next = i + c.len_utf8();

        match state {
            ScanState::OutsideEntry => {
                if c == '@' {
                    block = OpenBlock::at(i);
                    state = ScanState::AtMarker;
                }
            }
            ScanState::AtMarker => match (c, block.kind) {
                ('@', _) => block = OpenBlock::at(i),
                ('{' | '(', Some(_)) => {
                    block.closer = if c == '{' { '}' } else { ')' };
                    block.directive = DIRECTIVE_KINDS
                        .iter()
                        .any(|d| d.eq_ignore_ascii_case(block.kind(input)));
                    if block.directive {
                        state = ScanState::InBody;
                    } else {
                        block.key = (next, next);
                        state = ScanState::InKey;
                    }
                }
                (c, _) if c.is_whitespace() => {}
                (c, None) if is_kind_char(c) => block.kind = Some((i, next)),
                // The type must be one contiguous word
                (c, Some((start, end))) if is_kind_char(c) && end == i => {
                    block.kind = Some((start, next));
                }
                _ => state = ScanState::OutsideEntry,
            },
            ScanState::InKey => {
                if c == ',' {
                    block.key.1 = i;
                    state = ScanState::InBody;
                } else if c == block.closer {
                    block.key.1 = i;
                    doc.entries.push(finish_entry(input, &block, next));
                    blocks_span = Some((blocks_span.map_or(block.start, |(s, _)| s), next));
                    state = ScanState::OutsideEntry;
                }
            }
            ScanState::InBody => {
                let closes = match c {
                    '{' => {
                        block.depth += 1;
                        false
                    }
                    '}' if block.depth > 0 => {
                        block.depth -= 1;
                        false
                    }
                    '}' => block.closer == '}',
                    '"' if block.depth == 0 => {
                        block.in_quote = !block.in_quote;
                        false
                    }
                    ')' => block.closer == ')' && block.depth == 0 && !block.in_quote,
                    _ => false,
                };

                if closes {
                    if block.directive {
                        doc.directives.push(Directive {
                            kind: block.kind(input).to_string(),
                            text: input[block.start..next].to_string(),
                            span: (block.start, next),
                        });
                    } else {
                        doc.entries.push(finish_entry(input, &block, next));
                    }
                    blocks_span = Some((blocks_span.map_or(block.start, |(s, _)| s), next));
                    state = ScanState::OutsideEntry;
                }
            }
        }
    }

    if state == ScanState::AtMarker && !starts_block(input, block.start) {
        state = ScanState::OutsideEntry;
    }

    if state != ScanState::OutsideEntry {
        let (line, column) = line_column(input, block.start);
        return Err(BibParseError {
            offset: block.start,
            line,
            column,
            kind: block.kind(input).to_string(),
            state,
        });
    }

    let (leading, trailing) = match blocks_span {
        Some((first, last)) => (&input[..first], &input[last..]),
        None => (input, ""),
    };
    doc.leading = leading.trim().to_string();
    doc.trailing = trailing.trim().to_string();

    tracing::debug!(
        entries = doc.entries.len(),
        directives = doc.directives.len(),
        "parsed bibliography"
    );

    Ok(doc)
}

fn finish_entry(input: &str, block: &OpenBlock, end: usize) -> BibEntry {
    let (key_start, key_end) = block.key;
    BibEntry {
        kind: block.kind(input).to_string(),
        key: input[key_start..key_end].trim().to_string(),
        text: input[block.start..end].to_string(),
        span: (block.start, end),
    }
}

/// 1-based line and character column of a byte offset.
fn line_column(input: &str, offset: usize) -> (usize, usize) {
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
