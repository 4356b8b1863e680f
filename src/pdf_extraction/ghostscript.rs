// Ghostscript glue - full text, cover page and page count through `gs`
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::IndexConfig;

use super::document::blank_page_pdf;

const BASE_ARGS: [&str; 4] = ["-dNOPAUSE", "-dBATCH", "-dSAFER", "-dQUIET"];
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Ghostscript {
    exe: PathBuf,
    max_text_bytes: usize,
    max_cover_bytes: usize,
}

impl Ghostscript {
    /// Resolve `exe` on `PATH`.
    pub fn locate(exe: &str, max_text_bytes: usize, max_cover_bytes: usize) -> Result<Self> {
        let exe = which::which(exe)
            .with_context(|| format!("ghostscript executable {exe:?} not found"))?;
        debug!(exe = %exe.display(), "using ghostscript");
        Ok(Self::new(exe, max_text_bytes, max_cover_bytes))
    }

    pub fn new(exe: impl Into<PathBuf>, max_text_bytes: usize, max_cover_bytes: usize) -> Self {
        Self {
            exe: exe.into(),
            max_text_bytes,
            max_cover_bytes,
        }
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        Self::locate(&config.ghostscript, config.max_text_bytes, config.max_cover_bytes)
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Full text of the document; empty when the output exceeds the text cap.
    pub async fn full_text(&self, path: &Path, data: Arc<[u8]>) -> Result<String> {
        let args = ["-sDEVICE=txtwrite", "-sOutputFile=-", "-"];
        let output = self
            .run(&args, Some(data), self.max_text_bytes)
            .await
            .with_context(|| format!("failed to get full text of {}", path.display()))?;
        match output {
            Bounded::Complete(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Bounded::Overflow => {
                warn!(
                    path = %path.display(),
                    limit = self.max_text_bytes,
                    "full text too large, indexing without it"
                );
                Ok(String::new())
            }
        }
    }

    /// First page as a standalone PDF; a blank page when the output exceeds the cover cap.
    pub async fn cover(&self, path: &Path, data: Arc<[u8]>) -> Result<Vec<u8>> {
        let args = [
            "-sDEVICE=pdfwrite",
            "-sOutputFile=-",
            "-dFirstPage=1",
            "-dLastPage=1",
            "-",
        ];
        let output = self
            .run(&args, Some(data), self.max_cover_bytes)
            .await
            .with_context(|| format!("failed to get cover of {}", path.display()))?;
        match output {
            Bounded::Complete(bytes) => Ok(bytes),
            Bounded::Overflow => {
                debug!(path = %path.display(), "cover too large, storing a blank page");
                blank_page_pdf()
            }
        }
    }

    /// Page count as reported by the PDF interpreter.
    pub async fn pages(&self, path: &Path) -> Result<u32> {
        let shown = path.to_string_lossy();
        let permit = format!("--permit-file-read={shown}");
        let program = format!("({}) (r) file runpdfbegin pdfpagecount = quit", ps_escape(&shown));
        let args = ["-dNODISPLAY", permit.as_str(), "-c", program.as_str()];
        let output = self
            .run(&args, None, READ_CHUNK)
            .await
            .with_context(|| format!("failed to get pages of {}", path.display()))?;
        let Bounded::Complete(bytes) = output else {
            bail!("failed to get pages of {}: unexpected output", path.display());
        };
        parse_page_count(&bytes)
            .with_context(|| format!("failed to get pages of {}", path.display()))
    }

    async fn run(&self, args: &[&str], stdin: Option<Arc<[u8]>>, limit: usize) -> Result<Bounded> {
        let mut cmd = Command::new(&self.exe);
        cmd.args(BASE_ARGS)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.exe.display()))?;

        // stdin is fed from its own task so a chatty child can't deadlock us
        let feeder = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => Some(tokio::spawn(async move {
                // gs may stop reading early; a broken pipe shows up in the exit status
                let _ = pipe.write_all(&data).await;
                let _ = pipe.shutdown().await;
            })),
            _ => None,
        };

        let stdout = child.stdout.take().context("child stdout not captured")?;
        let stderr = child.stderr.take().context("child stderr not captured")?;
        let (output, errors) =
            tokio::join!(read_bounded(stdout, limit), read_bounded(stderr, READ_CHUNK));
        let status = child.wait().await?;
        if let Some(feeder) = feeder {
            let _ = feeder.await;
        }

        if !status.success() {
            let detail = match errors? {
                Bounded::Complete(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
                Bounded::Overflow => String::new(),
            };
            bail!("{} exited with {status}: {detail}", self.exe.display());
        }
        output
    }
}

/// Output of a child process read against a size cap.
#[derive(Debug, PartialEq, Eq)]
pub enum Bounded {
    Complete(Vec<u8>),
    Overflow,
}

/// Read `reader` to the end, keeping at most `limit` bytes.
///
/// Once a chunk would push the buffer past the cap the data is dropped but
/// the stream is still drained, so the writer never blocks on a full pipe.
pub async fn read_bounded<R>(mut reader: R, limit: usize) -> Result<Bounded>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut overflow = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        if overflow {
            continue;
        }
        if buf.len() + n > limit {
            overflow = true;
            buf = Vec::new();
        } else {
            buf.extend_from_slice(&chunk[..n]);
        }
    }
    Ok(if overflow { Bounded::Overflow } else { Bounded::Complete(buf) })
}

fn parse_page_count(output: &[u8]) -> Result<u32> {
    let text = String::from_utf8_lossy(output);
    let trimmed = text.trim();
    trimmed
        .parse::<u32>()
        .with_context(|| format!("unexpected page count output {trimmed:?}"))
}

// Backslash and parentheses are special inside PostScript string literals
fn ps_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
