//! CLI for bib-prune - Remove uncited entries from the bibliography of a LaTeX project.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tempfile::NamedTempFile;

use bib_prune::{
    collect_citation_keys, load_archive, prune, removed_path_for, render_partition,
    render_summary, report, ArchiveError, CitationSet, ProjectSources, PruneError, PrunedOutput,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Remove bibliography entries that are not cited in the LaTeX sources of a ZIP archive
#[derive(Parser)]
#[command(name = "bib-prune")]
#[command(version)]
#[command(after_help = "\
Examples:
  bib-prune project.zip references_clean.bib
  bib-prune project.zip out/refs.bib --removed out/unused.bib
  bib-prune project.zip refs.bib --dry-run --json

The first .bib file in the archive (by path) is pruned. Citation commands
recognized: \\cite, \\citep, \\citet, \\parencite, \\textcite, \\autocite,
\\nocite, the \\cites multicite family and their natbib, apacite and
biblatex variants.")]
struct Cli {
    /// ZIP archive containing the .tex sources and a .bib file
    archive: PathBuf,

    /// Output path for the cleaned bibliography
    output: PathBuf,

    /// Where to write the removed entries (default: remove.bib.bak next to OUTPUT)
    #[arg(long)]
    removed: Option<PathBuf>,

    /// Report what would be removed without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Hide the progress bar and the summary panel
    #[arg(short, long)]
    quiet: bool,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — archive not found / unreadable / not a ZIP
    Archive(String),
    /// Exit 11 — no .bib file in the archive
    MissingBibliography(String),
    /// Exit 12 — no .tex file in the archive
    MissingSources(String),
    /// Exit 13 — bibliography could not be scanned
    MalformedBibliography(String),
    /// Exit 14 — a member is not UTF-8
    Encoding(String),
    /// Exit 15 — cannot write output file
    OutputFile(String),
    /// Exit 15 — the cleaned and removed files would be the same file
    OutputConflict(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Archive(_) => 10,
            AppError::MissingBibliography(_) => 11,
            AppError::MissingSources(_) => 12,
            AppError::MalformedBibliography(_) => 13,
            AppError::Encoding(_) => 14,
            AppError::OutputFile(_) | AppError::OutputConflict(_) => 15,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Archive(msg) => {
                write!(f, "{}\n  hint: verify the path points to a valid .zip file", msg)
            }
            AppError::MissingBibliography(msg) => {
                write!(f, "{}\n  hint: add your .bib file to the archive", msg)
            }
            AppError::MissingSources(msg) => {
                write!(
                    f,
                    "{}\n  hint: the archive must contain the .tex files that cite the bibliography",
                    msg
                )
            }
            AppError::MalformedBibliography(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that every entry has a matching closing brace",
                    msg
                )
            }
            AppError::Encoding(msg) => {
                write!(f, "{}\n  hint: re-save the file as UTF-8", msg)
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
            AppError::OutputConflict(msg) => {
                write!(
                    f,
                    "{}\n  hint: pass --removed with a path different from OUTPUT",
                    msg
                )
            }
        }
    }
}

/// Maps an ArchiveError to an AppError, naming the archive.
fn map_archive_error(archive: &Path, e: ArchiveError) -> AppError {
    match e {
        ArchiveError::Encoding { .. } => {
            AppError::Encoding(format!("'{}': {}", archive.display(), e))
        }
        _ => AppError::Archive(format!("'{}': {}", archive.display(), e)),
    }
}

/// Maps a PruneError to an AppError using type-safe matching.
fn map_prune_error(bib_name: &str, e: PruneError) -> AppError {
    match e {
        PruneError::MissingBibliography => AppError::MissingBibliography(e.to_string()),
        PruneError::Malformed(_) => {
            AppError::MalformedBibliography(format!("'{}': {}", bib_name, e))
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // RUST_LOG alone decides unless -v asks for more
    let env_set = std::env::var_os(tracing_subscriber::EnvFilter::DEFAULT_ENV).is_some();
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if verbosity > 0 || !env_set {
        filter = filter.add_directive(level.into());
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let removed_path = cli
        .removed
        .clone()
        .unwrap_or_else(|| removed_path_for(&cli.output));
    if same_file(&cli.output, &removed_path) {
        return Err(AppError::OutputConflict(format!(
            "'{}' would receive both the cleaned bibliography and the removed entries",
            cli.output.display()
        )));
    }

    // 1. Read the archive
    let sources = load_archive(&cli.archive).map_err(|e| map_archive_error(&cli.archive, e))?;

    let bib = sources.bibliography().ok_or_else(|| {
        AppError::MissingBibliography(format!(
            "no .bib file found in '{}'",
            cli.archive.display()
        ))
    })?;
    for ignored in sources.ignored_bibliographies() {
        tracing::warn!("ignoring {} (using {})", ignored.name, bib.name);
    }
    if sources.tex.is_empty() {
        return Err(AppError::MissingSources(format!(
            "no .tex file found in '{}'",
            cli.archive.display()
        )));
    }

    // 2. Collect citation keys
    let cited = collect_with_progress(&sources, cli.quiet);
    tracing::info!("found {} distinct citation key(s)", cited.len());

    // 3. Parse and partition the bibliography
    let partition =
        prune(Some(bib.text.as_str()), &cited).map_err(|e| map_prune_error(&bib.name, e))?;
    let rendered = render_partition(&partition);

    // 4. Write both files only after everything succeeded
    if cli.dry_run {
        tracing::info!("dry run, not writing {}", cli.output.display());
    } else {
        write_outputs(&rendered, &cli.output, &removed_path)?;
    }

    // 5. Report
    if cli.json {
        let json = serde_json::to_string_pretty(&rendered.summary)
            .map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))?;
        println!("{}", json);
    } else if !cli.quiet {
        print!("{}", render_summary(&rendered.summary, report::supports_color()));
    }

    Ok(())
}

/// Extracts citation keys, one .tex file at a time, behind a progress bar.
fn collect_with_progress(sources: &ProjectSources, quiet: bool) -> CitationSet {
    let bar = ProgressBar::new(sources.tex.len() as u64);
    if quiet {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    if let Ok(style) = ProgressStyle::with_template("{msg:>8} [{bar:30}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message("Reading");

    let mut cited = CitationSet::new();
    for file in &sources.tex {
        let keys = collect_citation_keys([file.text.as_str()]);
        tracing::debug!("{}: {} key(s)", file.name, keys.len());
        cited.extend(keys.iter().cloned());
        bar.inc(1);
    }
    bar.finish_and_clear();

    cited
}

/// Whether two paths name the same file, comparing their resolved
/// directories when those exist.
fn same_file(a: &Path, b: &Path) -> bool {
    let resolve = |path: &Path| {
        fs::canonicalize(parent_dir(path))
            .ok()
            .map(|dir| dir.join(path.file_name().unwrap_or_default()))
    };
    a == b || matches!((resolve(a), resolve(b)), (Some(x), Some(y)) if x == y)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Writes both files, or neither: each text goes to a temporary file next to
/// its destination, and the temporaries are renamed into place only once both
/// have been written.
fn write_outputs(
    rendered: &PrunedOutput,
    output: &Path,
    removed: &Path,
) -> Result<(), AppError> {
    let kept_file = stage(output, &rendered.kept)?;
    let removed_file = stage(removed, &rendered.removed)?;

    kept_file
        .persist(output)
        .map_err(|e| output_error(output, e.error))?;
    tracing::info!("wrote cleaned bibliography to {}", output.display());

    if let Err(e) = removed_file.persist(removed) {
        if let Err(cleanup) = fs::remove_file(output) {
            tracing::warn!("could not remove {}: {}", output.display(), cleanup);
        }
        return Err(output_error(removed, e.error));
    }
    tracing::info!("wrote removed entries to {}", removed.display());

    Ok(())
}

/// Writes `text` to a temporary file in the directory of `destination`.
fn stage(destination: &Path, text: &str) -> Result<NamedTempFile, AppError> {
    let mut file = NamedTempFile::new_in(parent_dir(destination))
        .map_err(|e| output_error(destination, e))?;
    file.write_all(text.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| output_error(destination, e))?;

    // Temporary files are owner-only; outputs get the usual file mode
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| output_error(destination, e))?;
    }

    Ok(file)
}

fn output_error(path: &Path, e: io::Error) -> AppError {
    AppError::OutputFile(format!("'{}': {}", path.display(), e))
}
