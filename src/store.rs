//! The pages store: an owned SQLite session whose writes keep the FTS5
//! index in step with content.
//!
//! Callers never touch `pages_fts`.  Each mutation is one transaction: the
//! content statement fires the sync trigger, the touched id is optionally
//! verified, and only then is the transaction committed.  Any error drops
//! the transaction, which rolls back the content change and its index
//! change together.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::{debug, warn};

use crate::check::{self, CheckReport};
use crate::config::Config;
use crate::db::{self, ConnectionOptions};
use crate::errors::StoreError;
use crate::schema::{PAGES, SyncSpec};
use crate::script::{self, Script, StepOutcome};
use crate::types::{NewPage, Page, PageUpdate, SearchHit, SearchOptions};

const PAGE_COLUMNS: &str =
    "id, title, plain_text, created_at, updated_at, view_count, last_viewed_at, archived_at";

// Letters and digits only; everything else separates tokens for the
// unicode61 tokenizer anyway.
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("static regex"));

/// Store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub connection: ConnectionOptions,
    /// Check the touched id against the index before each commit.
    pub verify_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            connection: ConnectionOptions::default(),
            verify_writes: true,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            connection: ConnectionOptions {
                busy_timeout: Duration::from_millis(config.database.busy_timeout_ms),
            },
            verify_writes: config.database.verify_writes,
        }
    }
}

/// An open pages database.  The connection is released on drop.
pub struct PageStore {
    conn: Connection,
    spec: SyncSpec,
    verify_writes: bool,
}

impl PageStore {
    /// Open (or create) the store at `path`; `:memory:` is accepted.
    pub fn open(path: &Path, opts: StoreOptions) -> Result<Self, StoreError> {
        let conn = db::open(path, opts.connection)?;
        Ok(Self::from_connection(conn, opts))
    }

    pub fn open_in_memory(opts: StoreOptions) -> Result<Self, StoreError> {
        let conn = db::open_in_memory(opts.connection)?;
        Ok(Self::from_connection(conn, opts))
    }

    fn from_connection(conn: Connection, opts: StoreOptions) -> Self {
        Self {
            conn,
            spec: PAGES,
            verify_writes: opts.verify_writes,
        }
    }

    /// Close the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Statement(e))
    }

    // -- Writes ---------------------------------------------------------------

    /// Insert a page.  With `page.id` set the row takes that id, which must
    /// not belong to a live page.
    pub fn insert(&mut self, page: &NewPage) -> Result<Page, StoreError> {
        let tx = self.conn.transaction()?;
        let id = insert_in(&tx, page)?;
        let stored = finish(tx, &self.spec, self.verify_writes, id, |tx| {
            fetch(tx, id)?.ok_or(StoreError::NotFound(id))
        })?;
        debug!(id, "inserted page");
        Ok(stored)
    }

    /// Update the given fields of page `id`; the index entry is retracted
    /// and re-added with the new text.
    pub fn update(&mut self, id: i64, update: &PageUpdate) -> Result<Page, StoreError> {
        let tx = self.conn.transaction()?;
        update_in(&tx, id, update)?;
        let stored = finish(tx, &self.spec, self.verify_writes, id, |tx| {
            fetch(tx, id)?.ok_or(StoreError::NotFound(id))
        })?;
        debug!(id, "updated page");
        Ok(stored)
    }

    /// Update page `id` if it exists, otherwise insert it.  Without an id
    /// this is a plain insert.
    pub fn upsert(&mut self, id: Option<i64>, title: &str, body: &str) -> Result<Page, StoreError> {
        let tx = self.conn.transaction()?;
        let exists = match id {
            Some(id) => fetch(&tx, id)?.is_some(),
            None => false,
        };
        let id = match (exists, id) {
            (true, Some(id)) => {
                let update = PageUpdate {
                    title: Some(title.to_string()),
                    body: Some(body.to_string()),
                };
                update_in(&tx, id, &update)?;
                id
            }
            _ => insert_in(
                &tx,
                &NewPage {
                    id,
                    title: title.to_string(),
                    body: body.to_string(),
                },
            )?,
        };
        let stored = finish(tx, &self.spec, self.verify_writes, id, |tx| {
            fetch(tx, id)?.ok_or(StoreError::NotFound(id))
        })?;
        debug!(id, existed = exists, "upserted page");
        Ok(stored)
    }

    /// Delete page `id`.  Returns `false` when there was no such page, in
    /// which case neither content nor index changed.
    pub fn delete(&mut self, id: i64) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute("DELETE FROM pages WHERE id = ?1", [id])?;
        let deleted = finish(tx, &self.spec, self.verify_writes, id, |_| Ok(affected > 0))?;
        debug!(id, deleted, "deleted page");
        Ok(deleted)
    }

    /// Record that page `id` was opened: bump `view_count` and set
    /// `last_viewed_at`.  The row update re-indexes the unchanged text.
    pub fn mark_viewed(&mut self, id: i64) -> Result<Page, StoreError> {
        self.set_columns(
            id,
            "last_viewed_at = CURRENT_TIMESTAMP, view_count = view_count + 1",
        )
    }

    /// Hide page `id` from search, find, list and recent.  Archiving an
    /// archived page keeps its original `archived_at`.
    pub fn archive(&mut self, id: i64) -> Result<Page, StoreError> {
        self.set_columns(id, "archived_at = COALESCE(archived_at, CURRENT_TIMESTAMP)")
    }

    pub fn unarchive(&mut self, id: i64) -> Result<Page, StoreError> {
        self.set_columns(id, "archived_at = NULL")
    }

    fn set_columns(&mut self, id: i64, assignments: &str) -> Result<Page, StoreError> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute(&format!("UPDATE pages SET {assignments} WHERE id = ?1"), [id])?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        let stored = finish(tx, &self.spec, self.verify_writes, id, |tx| {
            fetch(tx, id)?.ok_or(StoreError::NotFound(id))
        })?;
        debug!(id, assignments, "updated page state");
        Ok(stored)
    }

    // -- Reads ----------------------------------------------------------------

    /// Any page by id, archived or not.
    pub fn get(&self, id: i64) -> Result<Option<Page>, StoreError> {
        fetch(&self.conn, id)
    }

    /// Number of stored pages, archived included.
    pub fn page_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Live (unarchived) pages, most recently updated first.
    pub fn list(&self, limit: usize) -> Result<Vec<Page>, StoreError> {
        self.select_pages(
            "archived_at IS NULL ORDER BY updated_at DESC, id DESC",
            limit,
        )
    }

    /// Archived pages, most recently archived first.
    pub fn list_archived(&self, limit: usize) -> Result<Vec<Page>, StoreError> {
        self.select_pages(
            "archived_at IS NOT NULL ORDER BY archived_at DESC, id DESC",
            limit,
        )
    }

    /// Live pages that have been viewed, most recently viewed first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Page>, StoreError> {
        self.select_pages(
            "archived_at IS NULL AND last_viewed_at IS NOT NULL \
             ORDER BY last_viewed_at DESC, id DESC",
            limit,
        )
    }

    fn select_pages(&self, filter: &str, limit: usize) -> Result<Vec<Page>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE {filter} LIMIT ?1"))?;
        let pages = stmt
            .query_map([limit as i64], page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    /// Live pages whose title contains the characters of `pattern` in order
    /// (`abc` matches `%a%b%c%`, case-insensitive for ASCII).  Recently
    /// viewed pages come first; never-viewed ones last, by title.
    pub fn find_by_title(&self, pattern: &str, limit: usize) -> Result<Vec<Page>, StoreError> {
        let like = fuzzy_pattern(pattern);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages \
             WHERE title LIKE ?1 ESCAPE '\\' AND archived_at IS NULL \
             ORDER BY last_viewed_at DESC NULLS LAST, title ASC LIMIT ?2"
        ))?;
        let pages = stmt
            .query_map(params![like, limit as i64], page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    /// Ranked full-text search over the titles and bodies of live pages.
    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>, StoreError> {
        let expr = build_match_expression(query, opts)?;
        debug!(query, expr = %expr, "searching");

        self.run_search(&expr, opts).map_err(|e| match e {
            StoreError::Statement(e) if opts.raw => StoreError::InvalidQuery(e.to_string()),
            other => other,
        })
    }

    fn run_search(&self, expr: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.title, pages_fts.rank, \
                    snippet(pages_fts, 1, ?2, ?3, '...', ?4) \
             FROM pages_fts JOIN pages p ON p.id = pages_fts.rowid \
             WHERE pages_fts MATCH ?1 AND p.archived_at IS NULL \
             ORDER BY pages_fts.rank LIMIT ?5",
        )?;
        let hits = stmt
            .query_map(
                params![
                    expr,
                    opts.open_marker,
                    opts.close_marker,
                    opts.snippet_tokens.clamp(1, 64) as i64,
                    opts.limit as i64,
                ],
                |row| {
                    Ok(SearchHit {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        rank: row.get(2)?,
                        snippet: row.get(3)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    /// Ids whose index entry matches `expr` (raw FTS5 syntax), ascending.
    /// Archived pages are included; this reads the index alone.
    pub fn matching_ids(&self, expr: &str) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT rowid FROM pages_fts WHERE pages_fts MATCH ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map([expr], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    // -- Maintenance ----------------------------------------------------------

    /// Run a SQL script against this store's connection, one transaction per
    /// step.
    pub fn run_script(&mut self, script: &Script) -> Result<Vec<StepOutcome>, StoreError> {
        Ok(script::run(&mut self.conn, script)?)
    }

    /// Compare the whole index with the content table.
    pub fn check(&self) -> Result<CheckReport, StoreError> {
        Ok(check::verify(&self.conn, &self.spec)?)
    }

    /// Regenerate the index from the content table in one transaction.
    pub fn rebuild(&mut self) -> Result<CheckReport, StoreError> {
        let tx = self.conn.transaction()?;
        check::rebuild(&tx, &self.spec)?;
        let report = check::verify(&tx, &self.spec)?;
        if !report.is_consistent() {
            warn!(?report, "index still inconsistent after rebuild, rolling back");
            return Err(StoreError::Consistency(
                "index still inconsistent after rebuild".to_string(),
            ));
        }
        tx.commit()?;
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn insert_in(tx: &Transaction<'_>, page: &NewPage) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO pages (id, title, plain_text) VALUES (?1, ?2, ?3)",
        params![page.id, page.title, page.body],
    )
    .map_err(|e| StoreError::from_insert(e, page.id))?;
    // Trigger inserts do not leak into last_insert_rowid once they finish.
    Ok(tx.last_insert_rowid())
}

fn update_in(tx: &Transaction<'_>, id: i64, update: &PageUpdate) -> Result<(), StoreError> {
    let affected = tx.execute(
        "UPDATE pages SET title = COALESCE(?2, title), \
                          plain_text = COALESCE(?3, plain_text), \
                          updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?1",
        params![id, update.title, update.body],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(())
}

/// Verify (when enabled), compute the result, and commit.  Every early
/// return drops `tx`, which rolls it back.
fn finish<T>(
    tx: Transaction<'_>,
    spec: &SyncSpec,
    verify: bool,
    id: i64,
    result: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    if verify && let Some(problem) = check::verify_id(&tx, spec, id)? {
        warn!(id, %problem, "index check failed, rolling back");
        return Err(StoreError::Consistency(problem));
    }
    let value = result(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn fetch(conn: &Connection, id: i64) -> Result<Option<Page>, StoreError> {
    let page = conn
        .query_row(
            &format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"),
            [id],
            page_from_row,
        )
        .optional()?;
    Ok(page)
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        view_count: row.get(5)?,
        last_viewed_at: row.get(6)?,
        archived_at: row.get(7)?,
    })
}

/// `abc` -> `%a%b%c%`, escaping LIKE wildcards in the input.
fn fuzzy_pattern(pattern: &str) -> String {
    let mut like = String::from("%");
    for c in pattern.chars().filter(|c| !c.is_whitespace()) {
        if matches!(c, '%' | '_' | '\\') {
            like.push('\\');
        }
        like.push(c);
        like.push('%');
    }
    like
}

/// Turn user input into an FTS5 MATCH expression.
///
/// Raw queries pass through untouched.  Otherwise each word becomes a quoted
/// phrase (so FTS5 operators in the input are matched literally) and the
/// phrases are ANDed.  `title_only` wraps the expression in a column filter.
fn build_match_expression(query: &str, opts: &SearchOptions) -> Result<String, StoreError> {
    let expr = if opts.raw {
        let q = query.trim();
        if q.is_empty() {
            return Err(StoreError::InvalidQuery("query is empty".to_string()));
        }
        q.to_string()
    } else {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Err(StoreError::InvalidQuery(format!(
                "no searchable words in {query:?}"
            )));
        }
        terms
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" ")
    };

    if opts.title_only {
        Ok(format!("title : ({expr})"))
    } else {
        Ok(expr)
    }
}

fn query_terms(query: &str) -> Vec<&str> {
    WORD.find_iter(query).map(|m| m.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PageStore {
        PageStore::open_in_memory(StoreOptions::default()).unwrap()
    }

    fn ids(store: &PageStore, expr: &str) -> Vec<i64> {
        store.matching_ids(expr).unwrap()
    }

    fn assert_consistent(store: &PageStore) {
        let report = store.check().unwrap();
        assert!(report.is_consistent(), "{report:?}");
    }

    #[test]
    fn insert_update_delete_scenario() {
        let mut store = store();

        let page = store
            .insert(&NewPage::new("Test Page", "This is a test page with some content"))
            .unwrap();
        assert_eq!(page.id, 1);
        assert_eq!(ids(&store, "test"), vec![1]);

        store
            .update(
                1,
                &PageUpdate {
                    title: Some("Updated Test Page".into()),
                    body: Some("This is an updated test page".into()),
                },
            )
            .unwrap();
        assert_eq!(ids(&store, "updated"), vec![1]);
        assert!(ids(&store, "content").is_empty());
        assert_consistent(&store);

        assert!(store.delete(1).unwrap());
        assert!(ids(&store, "test").is_empty());
        assert!(ids(&store, "updated").is_empty());
        assert!(store.get(1).unwrap().is_none());
        assert_consistent(&store);
    }

    #[test]
    fn explicit_id_round_trip() {
        let mut store = store();
        store
            .insert(&NewPage::new("Page 42", "This is page number 42").with_id(42))
            .unwrap();
        assert_eq!(ids(&store, "42"), vec![42]);

        store
            .update(
                42,
                &PageUpdate {
                    title: Some("Still Page 42".into()),
                    body: Some("This is still page number 42, but updated".into()),
                },
            )
            .unwrap();
        assert_eq!(ids(&store, "still"), vec![42]);
        assert_eq!(ids(&store, "42"), vec![42]);
        assert_consistent(&store);
    }

    #[test]
    fn partial_update_keeps_other_field() {
        let mut store = store();
        let page = store.insert(&NewPage::new("Alpha", "bravo charlie")).unwrap();
        let updated = store
            .update(
                page.id,
                &PageUpdate {
                    title: Some("Delta".into()),
                    body: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Delta");
        assert_eq!(updated.body, "bravo charlie");
        assert!(ids(&store, "alpha").is_empty());
        assert_eq!(ids(&store, "delta"), vec![page.id]);
        assert_eq!(ids(&store, "charlie"), vec![page.id]);
    }

    #[test]
    fn auto_ids_follow_explicit_ids() {
        let mut store = store();
        store.insert(&NewPage::new("a", "one")).unwrap();
        store.insert(&NewPage::new("b", "two").with_id(42)).unwrap();
        let next = store.insert(&NewPage::new("c", "three")).unwrap();
        assert_eq!(next.id, 43);
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let mut store = store();
        let first = store.insert(&NewPage::new("a", "one")).unwrap();
        store.delete(first.id).unwrap();
        let second = store.insert(&NewPage::new("b", "two")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn duplicate_explicit_id_rolls_back() {
        let mut store = store();
        store
            .insert(&NewPage::new("Original", "kept text").with_id(5))
            .unwrap();

        let err = store
            .insert(&NewPage::new("Intruder", "rejected words").with_id(5))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(5)));

        assert_eq!(store.get(5).unwrap().unwrap().title, "Original");
        assert!(ids(&store, "intruder").is_empty());
        assert!(ids(&store, "rejected").is_empty());
        assert_eq!(ids(&store, "kept"), vec![5]);
        assert_consistent(&store);
    }

    #[test]
    fn update_missing_page_is_not_found() {
        let mut store = store();
        let err = store
            .update(
                9,
                &PageUpdate {
                    title: Some("x".into()),
                    body: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
        assert_consistent(&store);
    }

    #[test]
    fn delete_missing_page_is_noop() {
        let mut store = store();
        store.insert(&NewPage::new("stays", "here")).unwrap();
        assert!(!store.delete(77).unwrap());
        let report = store.check().unwrap();
        assert_eq!(report.index_entries, 1);
        assert!(report.is_consistent());
    }

    #[test]
    fn bypassed_trigger_is_caught_and_rolled_back() {
        let mut store = store();
        store.conn.execute_batch("DROP TRIGGER pages_ai").unwrap();

        let err = store.insert(&NewPage::new("ghost", "never indexed")).unwrap_err();
        assert!(matches!(err, StoreError::Consistency(_)));
        assert!(store.list(10).unwrap().is_empty());
    }

    #[test]
    fn unverified_writes_commit_without_check() {
        let mut store = PageStore::open_in_memory(StoreOptions {
            verify_writes: false,
            ..StoreOptions::default()
        })
        .unwrap();
        store.conn.execute_batch("DROP TRIGGER pages_ai").unwrap();

        store.insert(&NewPage::new("ghost", "never indexed")).unwrap();
        let report = store.check().unwrap();
        assert_eq!(report.missing, vec![1]);

        let repaired = store.rebuild().unwrap();
        assert!(repaired.is_consistent());
        assert_eq!(ids(&store, "ghost"), vec![1]);
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let mut store = store();
        let created = store.upsert(Some(10), "Fresh", "first draft").unwrap();
        assert_eq!(created.id, 10);

        let updated = store.upsert(Some(10), "Fresh", "second draft").unwrap();
        assert_eq!(updated.id, 10);
        assert_eq!(updated.body, "second draft");
        assert!(ids(&store, "first").is_empty());
        assert_eq!(ids(&store, "second"), vec![10]);

        let auto = store.upsert(None, "Other", "text").unwrap();
        assert_eq!(auto.id, 11);
        assert_consistent(&store);
    }

    #[test]
    fn search_ranks_and_snippets() {
        let mut store = store();
        store
            .insert(&NewPage::new("Gardening", "tomatoes need sun and water"))
            .unwrap();
        store
            .insert(&NewPage::new("Cooking", "tomatoes tomatoes tomatoes in every sauce"))
            .unwrap();
        store.insert(&NewPage::new("Cycling", "chain oil")).unwrap();

        let hits = store.search("tomatoes", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Cooking");
        assert!(hits[0].rank <= hits[1].rank);
        assert!(hits[1].snippet.contains("[tomatoes]"));
    }

    #[test]
    fn search_title_only() {
        let mut store = store();
        store.insert(&NewPage::new("Rust notes", "ownership")).unwrap();
        store.insert(&NewPage::new("Misc", "rust on the bike chain")).unwrap();

        let opts = SearchOptions {
            title_only: true,
            ..SearchOptions::default()
        };
        let hits = store.search("rust", &opts).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust notes");
    }

    #[test]
    fn search_quotes_operators() {
        let mut store = store();
        store.insert(&NewPage::new("Logic", "this OR that")).unwrap();
        // Unquoted, `OR` would be an operator and `that*` a prefix query.
        let hits = store.search("OR that*", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn search_requires_terms() {
        let store = store();
        let err = store.search("  ?! ", &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn raw_search_reports_syntax_errors() {
        let store = store();
        let opts = SearchOptions {
            raw: true,
            ..SearchOptions::default()
        };
        let err = store.search("\"unterminated", &opts).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn raw_search_supports_prefix() {
        let mut store = store();
        store.insert(&NewPage::new("Prefixes", "searching searchable")).unwrap();
        let opts = SearchOptions {
            raw: true,
            ..SearchOptions::default()
        };
        assert_eq!(store.search("search*", &opts).unwrap().len(), 1);
    }

    #[test]
    fn find_by_title_is_fuzzy() {
        let mut store = store();
        store.insert(&NewPage::new("Meeting notes", "")).unwrap();
        store.insert(&NewPage::new("Groceries", "")).unwrap();

        let found = store.find_by_title("mtng", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Meeting notes");
        assert!(store.find_by_title("100%", 10).unwrap().is_empty());
    }

    #[test]
    fn list_newest_first() {
        let mut store = store();
        store.insert(&NewPage::new("old", "a")).unwrap();
        store.insert(&NewPage::new("new", "b")).unwrap();
        let pages = store.list(10).unwrap();
        assert_eq!(pages[0].title, "new");
        assert_eq!(store.list(1).unwrap().len(), 1);
    }

    #[test]
    fn archive_hides_page_but_keeps_it_indexed() {
        let mut store = store();
        let kept = store.insert(&NewPage::new("Kept note", "shared words")).unwrap();
        let gone = store.insert(&NewPage::new("Gone note", "shared words")).unwrap();
        store.mark_viewed(gone.id).unwrap();

        let archived = store.archive(gone.id).unwrap();
        assert!(archived.is_archived());
        assert_consistent(&store);

        let hits = store.search("shared", &SearchOptions::default()).unwrap();
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![kept.id]);
        assert_eq!(store.find_by_title("note", 10).unwrap().len(), 1);
        assert_eq!(store.list(10).unwrap().len(), 1);
        assert!(store.recent(10).unwrap().is_empty());
        assert_eq!(store.list_archived(10).unwrap()[0].id, gone.id);
        assert_eq!(ids(&store, "gone"), vec![gone.id]);
        assert!(store.get(gone.id).unwrap().unwrap().is_archived());
        assert_eq!(store.page_count().unwrap(), 2);

        // Archiving twice keeps the first timestamp.
        let again = store.archive(gone.id).unwrap();
        assert_eq!(again.archived_at, archived.archived_at);

        let restored = store.unarchive(gone.id).unwrap();
        assert!(!restored.is_archived());
        assert_eq!(store.search("shared", &SearchOptions::default()).unwrap().len(), 2);
        assert_eq!(store.recent(10).unwrap()[0].id, gone.id);
        assert_consistent(&store);
    }

    #[test]
    fn state_changes_on_missing_page_are_not_found() {
        let mut store = store();
        assert!(matches!(store.archive(5), Err(StoreError::NotFound(5))));
        assert!(matches!(store.unarchive(5), Err(StoreError::NotFound(5))));
        assert!(matches!(store.mark_viewed(5), Err(StoreError::NotFound(5))));
        assert_eq!(store.page_count().unwrap(), 0);
    }

    #[test]
    fn mark_viewed_counts_views_and_reindexes_same_text() {
        let mut store = store();
        let page = store.insert(&NewPage::new("Viewed", "looked at twice")).unwrap();
        let other = store.insert(&NewPage::new("Unseen", "never opened")).unwrap();
        assert_eq!(page.view_count, 0);
        assert!(page.last_viewed_at.is_none());

        store.mark_viewed(page.id).unwrap();
        let viewed = store.mark_viewed(page.id).unwrap();
        assert_eq!(viewed.view_count, 2);
        assert!(viewed.last_viewed_at.is_some());
        assert_eq!(viewed.body, "looked at twice");

        assert_eq!(ids(&store, "twice"), vec![page.id]);
        assert_eq!(ids(&store, "opened"), vec![other.id]);
        assert_consistent(&store);

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, page.id);
    }

    #[test]
    fn recent_orders_by_last_view() {
        let mut store = store();
        for title in ["first", "second", "third"] {
            let page = store.insert(&NewPage::new(title, "body")).unwrap();
            store.mark_viewed(page.id).unwrap();
        }
        store
            .conn
            .execute_batch(
                "UPDATE pages SET last_viewed_at = '2026-01-01 00:00:0' || id;
                 UPDATE pages SET last_viewed_at = '2026-02-01 00:00:00' WHERE id = 1;",
            )
            .unwrap();

        let titles: Vec<String> = store.recent(10).unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["first", "third", "second"]);
        assert_eq!(store.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn find_by_title_prefers_recently_viewed() {
        let mut store = store();
        store.insert(&NewPage::new("Alpha notes", "")).unwrap();
        let beta = store.insert(&NewPage::new("Beta notes", "")).unwrap();

        let titles = |store: &PageStore| -> Vec<String> {
            store
                .find_by_title("notes", 10)
                .unwrap()
                .into_iter()
                .map(|p| p.title)
                .collect()
        };
        assert_eq!(titles(&store), vec!["Alpha notes", "Beta notes"]);

        store.mark_viewed(beta.id).unwrap();
        assert_eq!(titles(&store), vec!["Beta notes", "Alpha notes"]);
    }

    #[test]
    fn reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut store = PageStore::open(&path, StoreOptions::default()).unwrap();
        store.insert(&NewPage::new("Durable", "written to disk")).unwrap();
        store.close().unwrap();

        let store = PageStore::open(&path, StoreOptions::default()).unwrap();
        assert_eq!(store.matching_ids("durable").unwrap(), vec![1]);
    }
}
