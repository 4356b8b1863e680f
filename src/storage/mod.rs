// Storage layer module
pub mod sqlite_storage;

pub use sqlite_storage::{
    Library, LibraryStats, ListedDocument, NewDocument, SearchHit, SNIPPET_END, SNIPPET_START,
};
