//! Shared types and data structures.

use serde::Serialize;

/// A row of the `pages` content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Stable row id, shared with the page's index entry.
    pub id: i64,
    pub title: String,
    /// Searchable body text (the `plain_text` column).
    pub body: String,
    /// `CURRENT_TIMESTAMP` at insert time (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
    /// `CURRENT_TIMESTAMP` of the last update.
    pub updated_at: String,
    pub view_count: i64,
    /// Set by [`crate::store::PageStore::mark_viewed`]; `None` until then.
    pub last_viewed_at: Option<String>,
    /// Archived pages stay stored and indexed but are hidden from search,
    /// find, list and recent.
    pub archived_at: Option<String>,
}

impl Page {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Input for an insert.  `id: None` lets SQLite assign the next id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPage {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
}

impl NewPage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Request an explicit id instead of an auto-assigned one.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Partial update of a page.  `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl PageUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

/// A ranked full-text match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    /// FTS5 bm25 rank; lower is a better match.
    pub rank: f64,
    /// Body excerpt around the matched terms, wrapped in the requested markers.
    pub snippet: String,
}

/// Tuning knobs for [`crate::store::PageStore::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Restrict matching to the `title` column.
    pub title_only: bool,
    /// Pass the query to FTS5 verbatim instead of quoting each term.
    pub raw: bool,
    /// Tokens of context in the snippet.
    pub snippet_tokens: usize,
    pub open_marker: String,
    pub close_marker: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            title_only: false,
            raw: false,
            snippet_tokens: 10,
            open_marker: "[".to_string(),
            close_marker: "]".to_string(),
        }
    }
}
