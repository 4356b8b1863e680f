// Core types shared by the title engine and the PDF readers

/// One glyph run as emitted by the content-stream reader.
///
/// `text` holds the raw string bytes of the run. They are usually UTF-8 or
/// a single-byte font encoding and may be malformed; the sanitizer deals
/// with that before anything is accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: Vec<u8>,
    pub font: String,
    pub font_size: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl TextRun {
    pub fn new(
        text: impl Into<Vec<u8>>,
        font: impl Into<String>,
        font_size: f64,
        x: f64,
        y: f64,
        width: f64,
    ) -> Self {
        Self {
            text: text.into(),
            font: font.into(),
            font_size,
            x,
            y,
            width,
        }
    }
}

// Error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    #[error("can't init reader: {0}")]
    ReaderInit(String),

    #[error("reader aborted: malformed hex string")]
    MalformedEncoding,

    #[error("reader aborted: {0}")]
    ReaderAbort(String),
}

impl TitleError {
    /// True for both abort kinds, i.e. the reader was built but died on the page.
    pub fn is_abort(&self) -> bool {
        matches!(self, TitleError::MalformedEncoding | TitleError::ReaderAbort(_))
    }

    /// Broken string literals are routine in scanned documents and get logged quietly.
    pub fn is_malformed_encoding(&self) -> bool {
        matches!(self, TitleError::MalformedEncoding)
    }

    /// Classify an abort message coming out of the reader.
    pub fn from_abort_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("hex string") || lower.contains("hexadecimal") {
            TitleError::MalformedEncoding
        } else {
            TitleError::ReaderAbort(message.to_string())
        }
    }
}

pub type TitleResult<T> = std::result::Result<T, TitleError>;
