//! Database layer for SQLite storage.
//!
//! Provides connection management, pragmas, FTS5 availability detection and
//! schema creation (content table, FTS5 index and sync triggers).

use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::config::MEMORY_PATH;
use crate::errors::StoreError;
use crate::schema;

/// Connection settings applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub busy_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection management
// ---------------------------------------------------------------------------

/// Open (or create) a database at `path`, set pragmas and apply the pages
/// schema.  `:memory:` opens a private in-memory database.
pub fn open(path: &Path, opts: ConnectionOptions) -> Result<Connection, StoreError> {
    let conn = if path == Path::new(MEMORY_PATH) {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Connection::open(path)?
    };
    debug!(path = %path.display(), "opened database");

    prepare(&conn, opts)?;
    Ok(conn)
}

/// Open a fresh in-memory database with the pages schema.
pub fn open_in_memory(opts: ConnectionOptions) -> Result<Connection, StoreError> {
    open(Path::new(MEMORY_PATH), opts)
}

fn prepare(conn: &Connection, opts: ConnectionOptions) -> Result<(), StoreError> {
    if !fts5_available(conn)? {
        return Err(StoreError::Fts5Unavailable);
    }
    apply_pragmas(conn, opts)?;
    apply_schema(conn)?;
    Ok(())
}

fn apply_pragmas(conn: &Connection, opts: ConnectionOptions) -> Result<(), StoreError> {
    conn.busy_timeout(opts.busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

/// Create the content table, index and triggers if they do not exist, and
/// add any columns an older `pages` table lacks.
pub fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    for sql in schema::pages_schema() {
        conn.execute_batch(&sql)?;
    }
    add_missing_columns(conn)
}

fn add_missing_columns(conn: &Connection) -> Result<(), StoreError> {
    let existing = {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('pages')")?;
        stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    for (name, decl) in schema::PAGES_LATE_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!("ALTER TABLE pages ADD COLUMN {name} {decl}"))?;
            debug!(column = name, "added column to pages");
        }
    }
    Ok(())
}

/// Whether the linked SQLite was compiled with FTS5.
pub fn fts5_available(conn: &Connection) -> Result<bool, StoreError> {
    let used: i64 = conn.query_row(
        "SELECT sqlite_compileoption_used('ENABLE_FTS5')",
        [],
        |row| row.get(0),
    )?;
    Ok(used == 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_open_creates_schema() {
        let dir = TempDir::new().unwrap();
        let conn = open(&dir.path().join("pages.db"), ConnectionOptions::default()).unwrap();

        let tables = names(&conn, "table");
        assert!(tables.contains(&"pages".to_string()));
        assert!(tables.contains(&"pages_fts".to_string()));
        assert!(tables.contains(&"pages_fts_docsize".to_string()));

        let triggers = names(&conn, "trigger");
        assert_eq!(triggers, vec!["pages_ad", "pages_ai", "pages_au"]);
    }

    #[test]
    fn test_open_upgrades_older_pages_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE pages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    plain_text TEXT NOT NULL,
                    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                );
                INSERT INTO pages (title, plain_text) VALUES ('Old', 'from before');",
            )
            .unwrap();
        }

        let conn = open(&path, ConnectionOptions::default()).unwrap();
        let (views, archived): (i64, Option<String>) = conn
            .query_row("SELECT view_count, archived_at FROM pages WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(views, 0);
        assert!(archived.is_none());

        // Reopening finds the columns already there.
        open(&path, ConnectionOptions::default()).unwrap();
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("pages.db");
        open(&path, ConnectionOptions::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.db");
        let conn = open(&path, ConnectionOptions::default()).unwrap();
        conn.execute(
            "INSERT INTO pages (title, plain_text) VALUES ('kept', 'survives reopen')",
            [],
        )
        .unwrap();
        drop(conn);

        let conn = open(&path, ConnectionOptions::default()).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_busy_timeout_is_set() {
        let opts = ConnectionOptions {
            busy_timeout: Duration::from_millis(1234),
        };
        let dir = TempDir::new().unwrap();
        let conn = open(&dir.path().join("pages.db"), opts).unwrap();

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 1234);
    }

    #[test]
    fn test_in_memory_has_schema() {
        let conn = open_in_memory(ConnectionOptions::default()).unwrap();
        assert!(names(&conn, "table").contains(&"pages_fts".to_string()));
    }

    #[test]
    fn test_bundled_sqlite_has_fts5() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(fts5_available(&conn).unwrap());
    }
}
