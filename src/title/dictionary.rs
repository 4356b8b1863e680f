// Known-word dictionary, built once and shared read-only
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

// English word list, one lowercase word per line
static BUNDLED_WORDS: &str = include_str!("../../assets/words");

static SHARED: Lazy<Arc<Dictionary>> = Lazy::new(|| Arc::new(Dictionary::bundled()));

/// Immutable set of lowercase words.
///
/// Built once at startup and handed to every engine behind an `Arc`;
/// lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    /// The word list shipped inside the binary.
    pub fn bundled() -> Self {
        Self::from_word_list(BUNDLED_WORDS)
    }

    /// The bundled list, parsed on first use and shared process-wide.
    pub fn shared() -> Arc<Dictionary> {
        Arc::clone(&SHARED)
    }

    /// Build from text holding one word per line. Blank lines are ignored.
    pub fn from_word_list(list: &str) -> Self {
        let words = list
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let list = fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?;
        Ok(Self::from_word_list(&list))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Dictionary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let words = iter
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }
}
