// Title engine: runs -> phrases -> candidate -> dictionary check
use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigError, TitleConfig};
use crate::pdf_extraction::first_page::first_page_runs;
use crate::types::{TextRun, TitleResult};

use super::dictionary::Dictionary;
use super::phrase::PhraseBuilder;
use super::ranker::TitleRanker;
use super::validator::DictionaryValidator;

/// Infers a document title from the glyph runs of its first page.
///
/// Holds no mutable state; one engine is shared by every concurrent
/// inference.
pub struct TitleEngine {
    builder: PhraseBuilder,
    ranker: TitleRanker,
    validator: DictionaryValidator,
}

impl TitleEngine {
    pub fn new(dictionary: Arc<Dictionary>, config: &TitleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            builder: PhraseBuilder::new(config),
            ranker: TitleRanker::new(config),
            validator: DictionaryValidator::new(dictionary, config)?,
        })
    }

    /// Engine with default tunables over the bundled word list.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(Dictionary::shared(), &TitleConfig::default())
    }

    /// Best guess title, or "" when no candidate is convincing.
    pub fn infer(&self, runs: &[TextRun]) -> String {
        let phrases = self.builder.build(runs);
        let candidate = self.ranker.rank(phrases);
        if self.validator.accept(&candidate) {
            candidate
        } else {
            if !candidate.is_empty() {
                debug!(candidate = %candidate, "title candidate rejected by dictionary");
            }
            String::new()
        }
    }

    /// Read the first page of a PDF and infer its title.
    pub fn title_of_pdf(&self, bytes: &[u8]) -> TitleResult<String> {
        let runs = first_page_runs(bytes)?;
        Ok(self.infer(&runs))
    }
}
