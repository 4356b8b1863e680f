// pdfshelf - full-text PDF index with covers and inferred titles
pub mod commands;
pub mod config;
pub mod indexer;
pub mod pdf_extraction;
pub mod storage;
pub mod title;
pub mod types;

pub use indexer::{IndexReport, Indexer};
pub use storage::Library;
pub use title::TitleEngine;
pub use types::{TextRun, TitleError, TitleResult};
