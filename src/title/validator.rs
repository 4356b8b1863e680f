// Dictionary check: does a candidate look like words of the language?
use std::sync::Arc;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

use crate::config::{ConfigError, TitleConfig};

use super::dictionary::Dictionary;

/// Accepts a candidate when enough of its alphabetic tokens are known words.
pub struct DictionaryValidator {
    dictionary: Arc<Dictionary>,
    stemmer: Stemmer,
    tokens: Regex,
    ratio: f64,
}

/// Token tally of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coverage {
    pub hits: usize,
    pub tokens: usize,
}

impl Coverage {
    pub fn ratio(&self) -> f64 {
        if self.tokens == 0 {
            return 0.0;
        }
        self.hits as f64 / self.tokens as f64
    }
}

impl DictionaryValidator {
    pub fn new(dictionary: Arc<Dictionary>, config: &TitleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tokens = Regex::new(&format!(
            "[[:alpha:]]{{{},{}}}",
            config.min_word_len, config.max_word_len
        ))?;
        Ok(Self {
            dictionary,
            stemmer: Stemmer::create(Algorithm::English),
            tokens,
            ratio: config.dictionary_ratio,
        })
    }

    pub fn accept(&self, candidate: &str) -> bool {
        let coverage = self.coverage(candidate);
        coverage.tokens > 0 && coverage.ratio() >= self.ratio
    }

    pub fn coverage(&self, candidate: &str) -> Coverage {
        let mut coverage = Coverage::default();
        for token in self.tokens.find_iter(candidate) {
            coverage.tokens += 1;
            if self.is_known(token.as_str()) {
                coverage.hits += 1;
            }
        }
        coverage
    }

    // The stemmer is aggressive (computers -> comput), so the plain
    // lowercase form is tried first and either match counts.
    fn is_known(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.dictionary.contains(&lower) || self.dictionary.contains(&self.stemmer.stem(&lower))
    }
}
