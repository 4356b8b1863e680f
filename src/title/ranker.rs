// Title ranking: the most prominent phrase wins unless it is too short
use crate::config::TitleConfig;

use super::phrase::Phrase;

pub struct TitleRanker {
    min_chars: usize,
    max_chars: usize,
}

impl TitleRanker {
    pub fn new(config: &TitleConfig) -> Self {
        Self {
            min_chars: config.min_title_chars,
            max_chars: config.max_title_chars,
        }
    }

    /// Pick a title candidate from `phrases`.
    ///
    /// Phrases are ordered by descending font size; the stable sort keeps
    /// document order among equal sizes. A first candidate shorter than
    /// `min_chars` (typically a drop cap opening the body text) is replaced
    /// by the runner-up, whatever its length. Empty input gives "".
    pub fn rank(&self, mut phrases: Vec<Phrase>) -> String {
        sort_by_prominence(&mut phrases);

        let Some(first) = phrases.first() else {
            return String::new();
        };
        let candidate = first.render(self.max_chars);
        if candidate.chars().count() < self.min_chars {
            if let Some(second) = phrases.get(1) {
                return second.render(self.max_chars);
            }
        }
        candidate
    }
}

impl Default for TitleRanker {
    fn default() -> Self {
        Self::new(&TitleConfig::default())
    }
}

/// Descending font size, original order among ties.
pub fn sort_by_prominence(phrases: &mut [Phrase]) {
    phrases.sort_by(|a, b| b.font_size().total_cmp(&a.font_size()));
}
