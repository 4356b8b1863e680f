// Indexer - walks paths and feeds PDFs through extraction into the library
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IndexConfig;
use crate::pdf_extraction::{Ghostscript, PdfFile};
use crate::storage::{Library, NewDocument};
use crate::title::TitleEngine;

/// Outcome counts of one `add` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub added: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added {}, duplicates {}, failed {}, skipped {}",
            self.added, self.duplicates, self.failed, self.skipped
        )
    }
}

type Extraction = (PathBuf, Result<NewDocument>);

pub struct Indexer<'a> {
    library: &'a Library,
    ghostscript: Arc<Ghostscript>,
    engine: Arc<TitleEngine>,
    timeout: Duration,
    jobs: usize,
}

// State of one run: signatures already queued and the documents in flight
struct Run {
    report: IndexReport,
    queued: HashSet<String>,
    in_flight: JoinSet<Extraction>,
}

impl<'a> Indexer<'a> {
    pub fn new(
        library: &'a Library,
        ghostscript: Ghostscript,
        engine: Arc<TitleEngine>,
        config: &IndexConfig,
    ) -> Self {
        Self {
            library,
            ghostscript: Arc::new(ghostscript),
            engine,
            timeout: Duration::from_secs(config.timeout_secs),
            jobs: config.jobs.max(1),
        }
    }

    pub async fn add_path(&self, path: &Path) -> Result<IndexReport> {
        self.add_paths(&[path.to_path_buf()]).await
    }

    /// Index every PDF under `paths`.
    ///
    /// Files are added directly and directories walked recursively. All
    /// paths are checked before any work starts; per-file problems are
    /// logged and counted, never fatal.
    pub async fn add_paths(&self, paths: &[PathBuf]) -> Result<IndexReport> {
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("failed to add path {}", path.display()))?;
            roots.push((path.as_path(), meta.is_dir()));
        }

        let mut run = Run {
            report: IndexReport::default(),
            queued: HashSet::new(),
            in_flight: JoinSet::new(),
        };

        for (root, is_dir) in roots {
            if !is_dir {
                self.enqueue(root, &mut run).await;
                continue;
            }
            for entry in WalkDir::new(root) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        self.enqueue(entry.path(), &mut run).await
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "skipping unreadable entry");
                        run.report.skipped += 1;
                    }
                }
            }
        }

        while let Some(joined) = run.in_flight.join_next().await {
            self.store(joined, &mut run.report);
        }
        Ok(run.report)
    }

    // Problems with one file are logged and counted, never returned
    async fn enqueue(&self, path: &Path, run: &mut Run) {
        if !is_pdf(path) {
            debug!(path = %path.display(), "not a pdf");
            run.report.skipped += 1;
            return;
        }

        let file = match PdfFile::read(path).await {
            Ok(file) => file,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "skipping document");
                run.report.failed += 1;
                return;
            }
        };

        let sig = file.signature();
        let stored = match self.library.contains_signature(&sig) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "skipping document");
                run.report.failed += 1;
                return;
            }
        };
        if stored || run.queued.contains(&sig) {
            info!(path = %path.display(), "duplicate");
            run.report.duplicates += 1;
            return;
        }

        while run.in_flight.len() >= self.jobs {
            match run.in_flight.join_next().await {
                Some(joined) => self.store(joined, &mut run.report),
                None => break,
            }
        }

        run.queued.insert(sig.clone());
        run.in_flight.spawn(extract(
            file,
            sig,
            Arc::clone(&self.ghostscript),
            Arc::clone(&self.engine),
            self.timeout,
        ));
    }

    fn store(
        &self,
        joined: std::result::Result<Extraction, tokio::task::JoinError>,
        report: &mut IndexReport,
    ) {
        match joined {
            Ok((path, Ok(doc))) => match self.library.insert(&doc) {
                Ok(id) => {
                    info!(
                        id,
                        path = %path.display(),
                        title = %doc.title,
                        pages = doc.pages,
                        "added"
                    );
                    report.added += 1;
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %format!("{err:#}"),
                        "failed to store document"
                    );
                    report.failed += 1;
                }
            },
            Ok((path, Err(err))) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "skipping document");
                report.failed += 1;
            }
            Err(err) => {
                warn!(error = %err, "extraction task failed");
                report.failed += 1;
            }
        }
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

async fn extract(
    file: PdfFile,
    sig: String,
    ghostscript: Arc<Ghostscript>,
    engine: Arc<TitleEngine>,
    timeout: Duration,
) -> Extraction {
    let path = file.path().to_path_buf();
    let result = tokio::time::timeout(timeout, extract_document(&file, sig, &ghostscript, engine))
        .await
        .unwrap_or_else(|_| {
            Err(anyhow!("{} timed out after {}s", path.display(), timeout.as_secs()))
        });
    (path, result)
}

// Text, cover, page count and title all run together
async fn extract_document(
    file: &PdfFile,
    sig: String,
    ghostscript: &Ghostscript,
    engine: Arc<TitleEngine>,
) -> Result<NewDocument> {
    let path = file.path();
    let data = file.data();
    let title_task = tokio::task::spawn_blocking(move || engine.title_of_pdf(&data));

    let (text, cover, pages, title) = tokio::join!(
        ghostscript.full_text(path, file.data()),
        ghostscript.cover(path, file.data()),
        ghostscript.pages(path),
        title_task,
    );
    let text = text?;
    let cover = cover?;
    let pages = pages?;

    let title = match title {
        Ok(Ok(title)) => title,
        Ok(Err(err)) if err.is_malformed_encoding() => {
            debug!(path = %path.display(), error = %err, "title error");
            String::new()
        }
        Ok(Err(err)) => {
            warn!(path = %path.display(), error = %err, "title error");
            String::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "title task failed");
            String::new()
        }
    };

    Ok(NewDocument {
        path: path.display().to_string(),
        pages,
        sig,
        title,
        text,
        cover,
    })
}
