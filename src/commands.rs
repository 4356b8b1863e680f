// Subcommand bodies - everything the CLI does once config and database are set up
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::config::ShelfConfig;
use crate::indexer::{IndexReport, Indexer};
use crate::pdf_extraction::Ghostscript;
use crate::storage::{Library, LibraryStats, ListedDocument, SearchHit, SNIPPET_END, SNIPPET_START};
use crate::title::{Dictionary, TitleEngine};

const BOLD_ON: &str = "\x1b[1m";
const BOLD_OFF: &str = "\x1b[0m";

/// How search hits are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStyle {
    pub names_only: bool,
    pub bold: bool,
}

impl Default for SearchStyle {
    fn default() -> Self {
        Self {
            names_only: false,
            bold: true,
        }
    }
}

/// Build the title engine, loading a custom word list when one is configured.
pub fn title_engine(config: &ShelfConfig) -> Result<TitleEngine> {
    let dictionary = match &config.title.dictionary_path {
        Some(path) => Arc::new(Dictionary::from_file(path)?),
        None => Dictionary::shared(),
    };
    debug!(words = dictionary.len(), "dictionary loaded");
    Ok(TitleEngine::new(dictionary, &config.title)?)
}

pub async fn add(
    library: &Library,
    config: &ShelfConfig,
    paths: &[PathBuf],
) -> Result<IndexReport> {
    let ghostscript = Ghostscript::from_config(&config.index)?;
    debug!(gs = %ghostscript.exe().display(), "using ghostscript");
    let engine = Arc::new(title_engine(config)?);
    let indexer = Indexer::new(library, ghostscript, engine, &config.index);
    let report = indexer.add_paths(paths).await?;
    info!(%report, "indexing finished");
    Ok(report)
}

pub fn write_add_summary<W: Write>(
    w: &mut W,
    report: &IndexReport,
    stats: &LibraryStats,
) -> io::Result<()> {
    writeln!(
        w,
        "{report} (library: {} documents, {} pages, {} untitled)",
        stats.document_count, stats.page_count, stats.untitled_count
    )
}

pub fn search<W: Write>(
    library: &Library,
    w: &mut W,
    query: &str,
    limit: usize,
    style: SearchStyle,
) -> Result<()> {
    let hits = library
        .search(query, limit)
        .with_context(|| format!("failed to search for {query:?}"))?;
    write_search_hits(w, &hits, style)?;
    Ok(())
}

pub fn write_search_hits<W: Write>(
    w: &mut W,
    hits: &[SearchHit],
    style: SearchStyle,
) -> io::Result<()> {
    for hit in hits {
        if style.names_only {
            writeln!(w, "[{}] {} (#{})", hit.id, hit.path, hit.pages)?;
        } else {
            writeln!(
                w,
                "[{}] {} (#{})\nTitle: {}\n{}\n",
                hit.id,
                hit.path,
                hit.pages,
                hit.title,
                highlight(&hit.snippet, style.bold)
            )?;
        }
    }
    Ok(())
}

/// Turn snippet match markers into ANSI bold, or drop them.
pub fn highlight(snippet: &str, bold: bool) -> String {
    let (on, off) = if bold { (BOLD_ON, BOLD_OFF) } else { ("", "") };
    snippet.replace(SNIPPET_START, on).replace(SNIPPET_END, off)
}

pub fn list<W: Write>(library: &Library, w: &mut W, exprs: &[String]) -> Result<()> {
    for expr in exprs {
        let docs = library
            .list(expr)
            .with_context(|| format!("failed to list for {expr:?}"))?;
        write_listing(w, &docs)?;
    }
    Ok(())
}

pub fn write_listing<W: Write>(w: &mut W, docs: &[ListedDocument]) -> io::Result<()> {
    for doc in docs {
        writeln!(w, "[{}] {} (#{})\nTitle: {}", doc.id, doc.path, doc.pages, doc.title)?;
    }
    Ok(())
}

/// Write the stored cover to a temporary file and open it in `viewer`.
pub fn show_cover(library: &Library, id: i64, viewer: &str) -> Result<()> {
    let Some(cover) = library.cover(id)? else {
        bail!("pdf with id {id} not found");
    };
    let viewer = which::which(viewer).with_context(|| format!("viewer {viewer:?} not found"))?;

    let mut file = tempfile::Builder::new()
        .prefix("pdfshelf-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary cover file")?;
    file.write_all(&cover)?;
    file.flush()?;

    debug!(viewer = %viewer.display(), file = %file.path().display(), "opening cover");
    let status = Command::new(&viewer)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to run {}", viewer.display()))?;
    if !status.success() {
        bail!("{} exited with {status}", viewer.display());
    }
    Ok(())
}

/// Infer the title of one PDF without touching the database.
pub async fn title<W: Write>(config: &ShelfConfig, w: &mut W, path: &Path) -> Result<()> {
    let engine = title_engine(config)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let title = tokio::task::spawn_blocking(move || engine.title_of_pdf(&bytes))
        .await
        .context("title task failed")?
        .with_context(|| format!("title error {}", path.display()))?;
    writeln!(w, "{title}")?;
    Ok(())
}

pub fn remove(library: &Library, id: i64) -> Result<()> {
    if !library.remove(id)? {
        bail!("pdf with id {id} not found");
    }
    info!(id, "removed");
    Ok(())
}
