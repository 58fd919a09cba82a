//! Shared test constants and helpers for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

/// A bibliography with two entries cited by [`SAMPLE_TEX`] and one that is not.
pub const SAMPLE_BIB: &str = r#"@string{aw = "Addison-Wesley"}

@book{knuth1984,
  author    = {Donald E. Knuth},
  title     = {The {\TeX}book},
  publisher = aw,
  year      = 1984
}

@article{unused2001,
  author  = {Nobody Inparticular},
  title   = {A Paper {Nobody} Cites},
  journal = {Journal of {Unread} Results},
  year    = 2001
}

@book{lamport1994,
  author    = "Leslie Lamport",
  title     = "{\LaTeX}: A Document Preparation System",
  publisher = aw,
  year      = 1994
}
"#;

/// A LaTeX source citing two of the three entries of [`SAMPLE_BIB`].
pub const SAMPLE_TEX: &str = r"\documentclass{article}
\begin{document}
Typesetting with \TeX{} \cite{knuth1984} and \LaTeX{} \citep[ch.~2]{lamport1994}.
\bibliography{refs}
\end{document}
";

/// Writes a ZIP archive with the given (member name, contents) pairs and returns its path.
pub fn write_zip(dir: &Path, file_name: &str, members: &[(&str, &str)]) -> PathBuf {
    write_zip_bytes(
        dir,
        file_name,
        &members
            .iter()
            .map(|(name, text)| (*name, text.as_bytes()))
            .collect::<Vec<_>>(),
    )
}

/// Like [`write_zip`], for members that are not valid UTF-8.
pub fn write_zip_bytes(dir: &Path, file_name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(file_name);
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (name, contents) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();

    path
}

/// Entry keys of a document, in order.
pub fn keys_of(doc: &bib_prune::BibDocument) -> Vec<String> {
    doc.keys().map(str::to_string).collect()
}
