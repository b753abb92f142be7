//! Persistent document storage
//!
//! [`SqliteDocumentStore`] keeps one `runbooks` table keyed by an
//! auto-increment id with a unique `file_path`. Embeddings are stored as a
//! JSON-encoded float array. Row order by id is the storage order the index
//! uses to break similarity ties.

use crate::error::IndexError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use triage_model::{Category, DocumentRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runbooks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    file_path TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    category TEXT,
    embedding BLOB,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_category ON runbooks(category);
";

/// Write-through persistence for an embedding index
pub trait DocumentStore: Send + Sync {
    /// Every stored record in storage order
    ///
    /// # Errors
    /// Storage or decoding failure.
    fn load_all(&self) -> Result<Vec<DocumentRecord>, IndexError>;

    /// Insert or replace by path
    ///
    /// # Errors
    /// Storage or encoding failure.
    fn upsert(&self, record: &DocumentRecord) -> Result<(), IndexError>;

    /// Remove by path; absent paths are ignored
    ///
    /// # Errors
    /// Storage failure.
    fn delete(&self, path: &str) -> Result<(), IndexError>;

    /// Remove everything
    ///
    /// # Errors
    /// Storage failure.
    fn clear(&self) -> Result<(), IndexError>;

    /// Replace the whole contents in one transaction
    ///
    /// # Errors
    /// Storage or encoding failure; the previous contents survive on error.
    fn replace_all(&self, records: &[DocumentRecord]) -> Result<(), IndexError>;
}

/// SQLite-backed [`DocumentStore`]
#[derive(Debug)]
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (and create if needed) a database file
    ///
    /// # Errors
    /// The file cannot be opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    /// Schema creation failure.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IndexError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("document store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored rows
    ///
    /// # Errors
    /// Storage failure.
    pub fn count(&self) -> Result<usize, IndexError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM runbooks", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

fn insert_or_replace(conn: &Connection, record: &DocumentRecord) -> Result<(), IndexError> {
    let embedding = serde_json::to_vec(&record.embedding)?;
    conn.execute(
        "INSERT OR REPLACE INTO runbooks (title, file_path, content, category, embedding, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.title,
            record.path,
            record.content,
            record.category.as_str(),
            embedding,
            record.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

struct RawRow {
    title: String,
    path: String,
    content: String,
    category: Option<String>,
    embedding: Option<Vec<u8>>,
    created_at: String,
}

fn decode(row: RawRow) -> Result<DocumentRecord, IndexError> {
    let category = row
        .category
        .as_deref()
        .and_then(|c| c.parse::<Category>().ok())
        .unwrap_or_else(|| {
            tracing::warn!(path = %row.path, stored = ?row.category, "unknown stored category, using General");
            Category::General
        });
    let embedding = match row.embedding {
        Some(bytes) => serde_json::from_slice(&bytes)?,
        None => Vec::new(),
    };
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| IndexError::InvalidTimestamp {
            path: row.path.clone(),
            value: row.created_at.clone(),
        })?;

    Ok(DocumentRecord {
        path: row.path,
        title: row.title,
        content: row.content,
        category,
        embedding,
        created_at,
    })
}

impl DocumentStore for SqliteDocumentStore {
    fn load_all(&self) -> Result<Vec<DocumentRecord>, IndexError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT title, file_path, content, category, embedding, created_at
             FROM runbooks ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawRow {
                title: row.get(0)?,
                path: row.get(1)?,
                content: row.get(2)?,
                category: row.get(3)?,
                embedding: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(decode(row?)?);
        }
        Ok(out)
    }

    fn upsert(&self, record: &DocumentRecord) -> Result<(), IndexError> {
        let conn = self.conn.lock();
        insert_or_replace(&conn, record)
    }

    fn delete(&self, path: &str) -> Result<(), IndexError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM runbooks WHERE file_path = ?1", params![path])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), IndexError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM runbooks", [])?;
        Ok(())
    }

    fn replace_all(&self, records: &[DocumentRecord]) -> Result<(), IndexError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM runbooks", [])?;
        for record in records {
            insert_or_replace(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}
