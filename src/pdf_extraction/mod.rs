// PDF access: in-process first page reading and Ghostscript subprocesses
pub mod content_scan;
pub mod document;
pub mod first_page;
pub mod ghostscript;

pub use document::{blank_page_pdf, PdfFile};
pub use first_page::first_page_runs;
pub use ghostscript::Ghostscript;
