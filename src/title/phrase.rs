// Phrase building: group glyph runs by font size and spatial adjacency
use crate::config::TitleConfig;
use crate::types::TextRun;

use super::sanitize::sanitize;

/// Runs hypothesized to form one visually contiguous piece of text.
#[derive(Debug, Clone)]
pub struct Phrase {
    font: String,
    font_size: f64,
    spacing_threshold: f64,
    text: String,
    length: usize,
    last_x: f64,
    last_y: f64,
}

impl Phrase {
    /// Open a phrase seeded with `run`.
    pub fn start(run: &TextRun, spacing_coefficient: f64) -> Self {
        let mut phrase = Self {
            font: run.font.clone(),
            font_size: run.font_size,
            spacing_threshold: spacing_coefficient * run.font_size,
            text: String::new(),
            length: 0,
            last_x: 0.0,
            last_y: 0.0,
        };
        phrase.absorb(run);
        phrase
    }

    /// Absorb `run` if its font size is within `tolerance` of the seed's.
    ///
    /// Font names are ignored: slides mix fonts and cases freely.
    pub fn try_append(&mut self, run: &TextRun, tolerance: f64) -> bool {
        // a NaN difference is never within tolerance
        let within = (run.font_size - self.font_size).abs() < tolerance;
        if !within {
            return false;
        }
        if self.length > 0 {
            let new_line = run.y < self.last_y;
            let word_gap = run.x - self.last_x >= self.spacing_threshold;
            if new_line || word_gap {
                self.text.push(' ');
                self.length += 1;
            }
        }
        self.absorb(run);
        true
    }

    fn absorb(&mut self, run: &TextRun) {
        self.text.push_str(&sanitize(&run.text));
        self.length += run.text.len();
        self.last_x = run.x + run.width;
        self.last_y = run.y;
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn spacing_threshold(&self) -> f64 {
        self.spacing_threshold
    }

    /// Accumulated text, separators included, not yet collapsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw units absorbed so far plus inserted separators.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whitespace-collapsed text capped to `max_chars` code points.
    pub fn render(&self, max_chars: usize) -> String {
        let collapsed = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.char_indices().nth(max_chars) {
            Some((cut, _)) => collapsed[..cut].to_string(),
            None => collapsed,
        }
    }
}

/// Groups an ordered run sequence into closed phrases.
pub struct PhraseBuilder {
    spacing_coefficient: f64,
    tolerance: f64,
}

impl PhraseBuilder {
    pub fn new(config: &TitleConfig) -> Self {
        Self {
            spacing_coefficient: config.spacing_coefficient,
            tolerance: config.font_size_tolerance,
        }
    }

    pub fn build(&self, runs: &[TextRun]) -> Vec<Phrase> {
        let mut phrases = Vec::new();
        let mut current: Option<Phrase> = None;

        for run in runs {
            if let Some(phrase) = current.as_mut() {
                if phrase.try_append(run, self.tolerance) {
                    continue;
                }
            }
            if let Some(closed) = current.replace(Phrase::start(run, self.spacing_coefficient)) {
                phrases.push(closed);
            }
        }
        phrases.extend(current);
        phrases
    }
}

impl Default for PhraseBuilder {
    fn default() -> Self {
        Self::new(&TitleConfig::default())
    }
}
