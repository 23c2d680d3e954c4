//! Index consistency checks and rebuild.
//!
//! The invariant: an index entry exists for id X iff a content row exists
//! for id X, and its postings match the row's current text.  Presence is
//! compared through the FTS5 `<index>_docsize` shadow table (one row per
//! indexed document); text is compared by the FTS5 `'integrity-check'`
//! command, which re-tokenizes the content table and diffs the postings.

use rusqlite::{Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::schema::SyncSpec;

/// Outcome of [`verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub content_rows: u64,
    pub index_entries: u64,
    /// Content ids with no index entry.
    pub missing: Vec<i64>,
    /// Index ids with no content row.
    pub orphaned: Vec<i64>,
    /// `None` when the FTS5 integrity check passed, else its error message.
    pub integrity_error: Option<String>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.orphaned.is_empty() && self.integrity_error.is_none()
    }
}

/// Compare the whole index against the content table.
pub fn verify(conn: &Connection, spec: &SyncSpec) -> rusqlite::Result<CheckReport> {
    let content_rows: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", spec.content_table),
        [],
        |row| row.get(0),
    )?;
    let index_entries: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", spec.docsize_table()),
        [],
        |row| row.get(0),
    )?;

    let missing = collect_ids(
        conn,
        &format!(
            "SELECT c.{id} FROM {content} c LEFT JOIN {docsize} d ON d.id = c.{id} \
             WHERE d.id IS NULL ORDER BY c.{id}",
            id = spec.id_column,
            content = spec.content_table,
            docsize = spec.docsize_table(),
        ),
    )?;
    let orphaned = collect_ids(
        conn,
        &format!(
            "SELECT d.id FROM {docsize} d LEFT JOIN {content} c ON c.{id} = d.id \
             WHERE c.{id} IS NULL ORDER BY d.id",
            id = spec.id_column,
            content = spec.content_table,
            docsize = spec.docsize_table(),
        ),
    )?;

    let report = CheckReport {
        content_rows: content_rows as u64,
        index_entries: index_entries as u64,
        missing,
        orphaned,
        integrity_error: integrity_check(conn, spec)?,
    };
    debug!(?report, "index check");
    Ok(report)
}

/// Verify one id after a write: the content row and the index entry must
/// both exist or both be absent, and the index must pass the integrity
/// check.  Returns a description of the first mismatch found.
///
/// Presence is checked for `id` alone, but FTS5 has no per-document
/// integrity check: the `'integrity-check'` command walks the whole index,
/// so this costs time proportional to the index size, not to the page.
pub fn verify_id(conn: &Connection, spec: &SyncSpec, id: i64) -> rusqlite::Result<Option<String>> {
    let in_content = conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE {} = ?1",
                spec.content_table, spec.id_column
            ),
            [id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    let in_index = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", spec.docsize_table()),
            [id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    let problem = match (in_content, in_index) {
        (true, false) => Some(format!("page {id} has no index entry")),
        (false, true) => Some(format!("index entry {id} has no page")),
        _ => integrity_check(conn, spec)?,
    };
    Ok(problem)
}

/// Run the FTS5 integrity check, including the comparison against the
/// external content table (`rank = 1`).  Returns the failure message when
/// the index does not match; engine errors are propagated.
fn integrity_check(conn: &Connection, spec: &SyncSpec) -> rusqlite::Result<Option<String>> {
    integrity_outcome(conn.execute(
        &format!(
            "INSERT INTO {index}({index}, rank) VALUES ('integrity-check', 1)",
            index = spec.index_table
        ),
        [],
    ))
}

/// FTS5 reports a mismatch as `SQLITE_CORRUPT_VTAB`.  Anything else (busy,
/// I/O, out of memory) says nothing about the index contents.
fn integrity_outcome(result: rusqlite::Result<usize>) -> rusqlite::Result<Option<String>> {
    match result {
        Ok(_) => Ok(None),
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::DatabaseCorrupt) => {
            Ok(Some(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Regenerate the whole index from the content table.
pub fn rebuild(conn: &Connection, spec: &SyncSpec) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {index}({index}) VALUES ('rebuild')",
            index = spec.index_table
        ),
        [],
    )?;
    info!(index = spec.index_table, "rebuilt index");
    Ok(())
}

fn collect_ids(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
