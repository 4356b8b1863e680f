// Configuration for pdfshelf: compiled-in defaults, config file, environment
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "pdfshelf";
pub const CONFIG_FILE: &str = "config.toml";

// Title inference
pub const SPACING_COEFFICIENT: f64 = 0.16;
pub const FONT_SIZE_TOLERANCE: f64 = 4.0;
pub const DICTIONARY_RATIO: f64 = 0.20;
pub const MIN_TITLE_CHARS: usize = 4;
pub const MAX_TITLE_CHARS: usize = 80;
pub const MIN_WORD_LEN: usize = 3;
pub const MAX_WORD_LEN: usize = 30;

// Indexing
pub const DEFAULT_GHOSTSCRIPT: &str = "gs";
pub const DEFAULT_DATABASE: &str = "main.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5 * 60;
pub const MAX_TEXT_BYTES: usize = 100 * 1024 * 1024;
pub const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_JOBS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("can't parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid word pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no user config directory on this system")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub title: TitleConfig,
    pub index: IndexConfig,
}

/// Tunables of the title engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TitleConfig {
    /// Multiplied by the font size: horizontal gaps at least this wide start a new word.
    pub spacing_coefficient: f64,
    pub font_size_tolerance: f64,
    pub dictionary_ratio: f64,
    pub min_title_chars: usize,
    pub max_title_chars: usize,
    pub min_word_len: usize,
    pub max_word_len: usize,
    /// Word list replacing the bundled one, one word per line.
    pub dictionary_path: Option<PathBuf>,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            spacing_coefficient: SPACING_COEFFICIENT,
            font_size_tolerance: FONT_SIZE_TOLERANCE,
            dictionary_ratio: DICTIONARY_RATIO,
            min_title_chars: MIN_TITLE_CHARS,
            max_title_chars: MAX_TITLE_CHARS,
            min_word_len: MIN_WORD_LEN,
            max_word_len: MAX_WORD_LEN,
            dictionary_path: None,
        }
    }
}

impl TitleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spacing_coefficient.is_nan() || self.spacing_coefficient <= 0.0 {
            return Err(invalid("title.spacing_coefficient must be positive"));
        }
        if self.font_size_tolerance.is_nan() || self.font_size_tolerance <= 0.0 {
            return Err(invalid("title.font_size_tolerance must be positive"));
        }
        if !(0.0..=1.0).contains(&self.dictionary_ratio) {
            return Err(invalid("title.dictionary_ratio must be within [0, 1]"));
        }
        if self.max_title_chars == 0 {
            return Err(invalid("title.max_title_chars must be at least 1"));
        }
        if self.min_word_len == 0 || self.min_word_len > self.max_word_len {
            return Err(invalid(
                "title.min_word_len must be at least 1 and not above title.max_word_len",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub ghostscript: String,
    pub database: String,
    pub timeout_secs: u64,
    pub max_text_bytes: usize,
    pub max_cover_bytes: usize,
    /// Documents extracted at the same time.
    pub jobs: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ghostscript: DEFAULT_GHOSTSCRIPT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_text_bytes: MAX_TEXT_BYTES,
            max_cover_bytes: MAX_COVER_BYTES,
            jobs: DEFAULT_JOBS,
        }
    }
}

impl ShelfConfig {
    /// Load the config file, if any, then apply environment overrides.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) {
        if let Some(gs) = ghostscript_from_env() {
            self.index.ghostscript = gs;
        }
        if let Ok(db) = env::var("PDFSHELF_DB") {
            if !db.is_empty() {
                self.index.database = db;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.title.validate()?;
        if self.index.jobs == 0 {
            return Err(invalid("index.jobs must be at least 1"));
        }
        if self.index.timeout_secs == 0 {
            return Err(invalid("index.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

// Ghostscript executable from the environment, if set
pub fn ghostscript_from_env() -> Option<String> {
    env::var("PDFSHELF_GS").ok().filter(|s| !s.is_empty())
}

pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Resolve a database name to a path.
///
/// Names containing a path separator are used as they are; bare names
/// live in the user's config directory, which is created on demand.
pub fn database_path(name: &str) -> Result<PathBuf, ConfigError> {
    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        return Ok(PathBuf::from(name));
    }
    let dir = app_config_dir().ok_or(ConfigError::NoConfigDir)?;
    create_private_dir(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir.join(name))
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = ShelfConfig::default();
        assert_eq!(config.title.spacing_coefficient, 0.16);
        assert_eq!(config.title.font_size_tolerance, 4.0);
        assert_eq!(config.title.dictionary_ratio, 0.20);
        assert_eq!(config.title.max_title_chars, 80);
        assert_eq!(config.index.ghostscript, "gs");
        assert_eq!(config.index.timeout_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ShelfConfig::from_toml(
            r#"
            [title]
            dictionary_ratio = 0.5

            [index]
            jobs = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.title.dictionary_ratio, 0.5);
        assert_eq!(config.title.min_word_len, 3);
        assert_eq!(config.index.jobs, 2);
        assert_eq!(config.index.database, "main.db");
    }

    #[test]
    fn rejects_inverted_word_bounds() {
        let mut config = ShelfConfig::default();
        config.title.min_word_len = 10;
        config.title.max_word_len = 5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_ratio_above_one() {
        let mut config = ShelfConfig::default();
        config.title.dictionary_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn database_names_with_separator_are_kept() {
        let path = database_path("./test.db").unwrap();
        assert_eq!(path, PathBuf::from("./test.db"));
    }
}
