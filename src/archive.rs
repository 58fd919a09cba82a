//! Reading LaTeX and BibTeX sources out of a ZIP archive.
//!
//! Members ending in `.tex` are LaTeX sources and members ending in `.bib` are
//! bibliographies. Both lists are sorted by archive path so that "the first
//! bibliography" does not depend on the order the archiver wrote members in.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur when reading an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("'{name}' is not valid UTF-8")]
    Encoding { name: String },
}

/// A text member of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path of the member inside the archive
    pub name: String,
    /// Decoded UTF-8 contents
    pub text: String,
}

/// The LaTeX and BibTeX members of an archive, each sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSources {
    pub tex: Vec<SourceFile>,
    pub bib: Vec<SourceFile>,
}

impl ProjectSources {
    /// The bibliography to prune: the one with the lexicographically smallest path.
    pub fn bibliography(&self) -> Option<&SourceFile> {
        self.bib.first()
    }

    /// Bibliographies that are present but will not be used.
    pub fn ignored_bibliographies(&self) -> &[SourceFile] {
        self.bib.get(1..).unwrap_or_default()
    }

    /// LaTeX texts, in path order.
    pub fn tex_texts(&self) -> impl Iterator<Item = &str> {
        self.tex.iter().map(|file| file.text.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Tex,
    Bib,
}

fn classify(name: &str) -> Option<SourceKind> {
    if name.ends_with(".tex") {
        Some(SourceKind::Tex)
    } else if name.ends_with(".bib") {
        Some(SourceKind::Bib)
    } else {
        None
    }
}

/// Opens a ZIP file and reads its LaTeX and BibTeX members.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not a valid ZIP archive,
/// or contains a `.tex`/`.bib` member that is not UTF-8.
pub fn load_archive(path: &Path) -> Result<ProjectSources, ArchiveError> {
    let file = File::open(path)?;
    read_archive(file)
}

/// Reads LaTeX and BibTeX members from any seekable ZIP stream.
///
/// Directories and members with other extensions are skipped.
pub fn read_archive<R: Read + Seek>(reader: R) -> Result<ProjectSources, ArchiveError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut sources = ProjectSources::default();

    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        if member.is_dir() {
            continue;
        }

        let name = member.name().to_string();
        let Some(kind) = classify(&name) else {
            tracing::trace!("skipping {name}");
            continue;
        };

        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|_| ArchiveError::Encoding {
            name: name.clone(),
        })?;

        tracing::debug!("read {name} ({} bytes)", text.len());
        let file = SourceFile { name, text };
        match kind {
            SourceKind::Tex => sources.tex.push(file),
            SourceKind::Bib => sources.bib.push(file),
        }
    }

    sources.tex.sort_by(|a, b| a.name.cmp(&b.name));
    sources.bib.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!(
        tex = sources.tex.len(),
        bib = sources.bib.len(),
        "scanned archive"
    );

    Ok(sources)
}
