// SQLite library store with an FTS5 index over titles and full text
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// A document ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub path: String,
    pub pages: u32,
    pub sig: String,
    pub title: String,
    pub text: String,
    pub cover: Vec<u8>,
}

/// One full-text match. `snippet` carries `{{{`/`}}}` around matched terms.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub path: String,
    pub pages: u32,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListedDocument {
    pub id: i64,
    pub path: String,
    pub pages: u32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryStats {
    pub document_count: usize,
    pub page_count: usize,
    pub untitled_count: usize,
}

pub const SNIPPET_START: &str = "{{{";
pub const SNIPPET_END: &str = "}}}";

pub struct Library {
    conn: Connection,
}

impl Library {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("can't open database {}", path.display()))?;
        debug!(db = %path.display(), "opened library");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::create_schema(&conn).context("can't create schema")?;
        Ok(Self { conn })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS pdfs(
                id       INTEGER PRIMARY KEY,
                path     TEXT NOT NULL,
                pages    INT NOT NULL,
                sig      TEXT NOT NULL,
                title    TEXT NOT NULL DEFAULT '',
                text     TEXT NOT NULL DEFAULT '',
                cover    BLOB,
                added_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS pdfs_sig ON pdfs(sig);

            CREATE VIRTUAL TABLE IF NOT EXISTS pdfs_fts
                USING fts5(title, text, content=pdfs, content_rowid=id);

            CREATE TRIGGER IF NOT EXISTS pdfs_ai AFTER INSERT ON pdfs BEGIN
                INSERT INTO pdfs_fts(rowid, title, text) VALUES (new.id, new.title, new.text);
            END;

            CREATE TRIGGER IF NOT EXISTS pdfs_ad AFTER DELETE ON pdfs BEGIN
                INSERT INTO pdfs_fts(pdfs_fts, rowid, title, text)
                    VALUES ('delete', old.id, old.title, old.text);
            END;
            "#,
        )?;
        Ok(())
    }

    pub fn contains_signature(&self, sig: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM pdfs WHERE sig = ?1)",
            params![sig],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn insert(&self, doc: &NewDocument) -> Result<i64> {
        self.conn.execute(
            r#"INSERT INTO pdfs(path, pages, sig, title, text, cover, added_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                doc.path,
                doc.pages,
                doc.sig,
                doc.title,
                doc.text,
                doc.cover,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn cover(&self, id: i64) -> Result<Option<Vec<u8>>> {
        let cover = self
            .conn
            .query_row("SELECT cover FROM pdfs WHERE id = ?1", params![id], |row| {
                row.get::<_, Option<Vec<u8>>>(0)
            })
            .optional()?;
        Ok(cover.flatten())
    }

    /// Full-text search over titles and text, best matches first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT pdfs.id, pdfs.path, pdfs.pages, pdfs.title,
                      snippet(pdfs_fts, 1, '{{{', '}}}', '...', 16)
               FROM pdfs_fts JOIN pdfs ON pdfs.id = pdfs_fts.rowid
               WHERE pdfs_fts MATCH ?1
               ORDER BY rank
               LIMIT ?2"#,
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let hits = stmt.query_map(params![query, limit], |row| {
            Ok(SearchHit {
                id: row.get(0)?,
                path: row.get(1)?,
                pages: row.get(2)?,
                title: row.get(3)?,
                snippet: row.get(4)?,
            })
        })?;
        hits.collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("search failed for {query:?}"))
    }

    /// Documents whose path matches the SQL `LIKE` expression.
    pub fn list(&self, like: &str) -> Result<Vec<ListedDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, pages, title FROM pdfs WHERE path LIKE ?1 ORDER BY id",
        )?;
        let docs = stmt.query_map(params![like], |row| {
            Ok(ListedDocument {
                id: row.get(0)?,
                path: row.get(1)?,
                pages: row.get(2)?,
                title: row.get(3)?,
            })
        })?;
        Ok(docs.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Delete a document; false when the id is unknown.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM pdfs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let (documents, pages, untitled): (i64, i64, i64) = self.conn.query_row(
            r#"SELECT COUNT(*), COALESCE(SUM(pages), 0),
                      COALESCE(SUM(CASE WHEN title = '' THEN 1 ELSE 0 END), 0)
               FROM pdfs"#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(LibraryStats {
            document_count: documents as usize,
            page_count: pages as usize,
            untitled_count: untitled as usize,
        })
    }
}
