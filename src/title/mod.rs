// Title inference from the first page's glyph runs
pub mod dictionary;
pub mod engine;
pub mod phrase;
pub mod ranker;
pub mod sanitize;
pub mod validator;

pub use dictionary::Dictionary;
pub use engine::TitleEngine;
pub use phrase::{Phrase, PhraseBuilder};
pub use ranker::TitleRanker;
pub use sanitize::sanitize;
pub use validator::{Coverage, DictionaryValidator};
