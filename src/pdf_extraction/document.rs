// PDF document handle - path, bytes and content signature
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sha2::{Digest, Sha256};

/// A PDF read fully into memory.
///
/// The bytes are shared so the extraction tasks of one document can each
/// hold a handle without copying the file.
#[derive(Debug, Clone)]
pub struct PdfFile {
    path: PathBuf,
    data: Arc<[u8]>,
}

impl PdfFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_bytes(path, data))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Lowercase hex SHA-256 of the file contents, used to spot duplicates.
    pub fn signature(&self) -> String {
        signature(&self.data)
    }
}

pub fn signature(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A one page A4 PDF with nothing on it, stored when a real cover is too big.
pub fn blank_page_pdf() -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Content {
        operations: Vec::<Operation>::new(),
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).context("failed to write blank page")?;
    Ok(out)
}
