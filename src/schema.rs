//! SQL generation for a content table and its trigger-synced FTS5 index.
//!
//! A [`SyncSpec`] names the content table, the external-content FTS5 table,
//! the shared id column and the indexed text columns.  From it we render the
//! virtual table and the three change handlers:
//!
//! * `<table>_ai` inserts the new row's text into the index.
//! * `<table>_ad` issues the FTS5 `'delete'` command with the old values.
//! * `<table>_au` retracts the old values, then inserts the new ones.
//!
//! FTS5 cannot diff two versions of a document, so an update must remove the
//! exact old token set before adding the new one.  The `'delete'` command
//! needs every old column value for that reason.

/// Descriptor of a content table kept in sync with an FTS5 index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSpec {
    pub content_table: &'static str,
    pub index_table: &'static str,
    pub id_column: &'static str,
    /// Indexed columns, in FTS5 column order.
    pub text_columns: &'static [&'static str],
}

/// The `pages` table and its `pages_fts` index.
pub const PAGES: SyncSpec = SyncSpec {
    content_table: "pages",
    index_table: "pages_fts",
    id_column: "id",
    text_columns: &["title", "plain_text"],
};

const PAGES_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    plain_text TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    view_count INTEGER NOT NULL DEFAULT 0,
    last_viewed_at TIMESTAMP NULL,
    archived_at TIMESTAMP NULL
)";

/// Columns added after the first release, with their `ALTER TABLE` types.
/// Older databases get them on open.
pub const PAGES_LATE_COLUMNS: &[(&str, &str)] = &[
    ("view_count", "INTEGER NOT NULL DEFAULT 0"),
    ("last_viewed_at", "TIMESTAMP NULL"),
    ("archived_at", "TIMESTAMP NULL"),
];

/// DDL for the `pages` content table.
pub fn pages_table_sql() -> &'static str {
    PAGES_TABLE_SQL
}

impl SyncSpec {
    /// Name of the FTS5 shadow table holding one row per indexed document.
    pub fn docsize_table(&self) -> String {
        format!("{}_docsize", self.index_table)
    }

    pub fn insert_trigger(&self) -> String {
        format!("{}_ai", self.content_table)
    }

    pub fn delete_trigger(&self) -> String {
        format!("{}_ad", self.content_table)
    }

    pub fn update_trigger(&self) -> String {
        format!("{}_au", self.content_table)
    }

    /// `CREATE VIRTUAL TABLE` for the external-content index.
    pub fn index_sql(&self) -> String {
        format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {index} USING fts5(\n    {cols},\n    content='{content}',\n    content_rowid='{id}'\n)",
            index = self.index_table,
            cols = self.text_columns.join(",\n    "),
            content = self.content_table,
            id = self.id_column,
        )
    }

    /// The three change-handler triggers, in creation order.
    pub fn trigger_sql(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE TRIGGER IF NOT EXISTS {name} AFTER INSERT ON {content} BEGIN\n    {insert};\nEND",
                name = self.insert_trigger(),
                content = self.content_table,
                insert = self.reapply("new"),
            ),
            format!(
                "CREATE TRIGGER IF NOT EXISTS {name} AFTER DELETE ON {content} BEGIN\n    {delete};\nEND",
                name = self.delete_trigger(),
                content = self.content_table,
                delete = self.retract("old"),
            ),
            format!(
                "CREATE TRIGGER IF NOT EXISTS {name} AFTER UPDATE ON {content} BEGIN\n    {delete};\n    {insert};\nEND",
                name = self.update_trigger(),
                content = self.content_table,
                delete = self.retract("old"),
                insert = self.reapply("new"),
            ),
        ]
    }

    /// Every statement needed to set up the index for an existing content
    /// table: the virtual table first, then the triggers.
    pub fn statements(&self) -> Vec<String> {
        let mut stmts = vec![self.index_sql()];
        stmts.extend(self.trigger_sql());
        stmts
    }

    /// `INSERT` adding the `row` (`new`) values to the index.
    fn reapply(&self, row: &str) -> String {
        format!(
            "INSERT INTO {index}(rowid, {cols}) VALUES ({values})",
            index = self.index_table,
            cols = self.text_columns.join(", "),
            values = self.row_values(row),
        )
    }

    /// FTS5 `'delete'` command retracting the `row` (`old`) values.
    fn retract(&self, row: &str) -> String {
        format!(
            "INSERT INTO {index}({index}, rowid, {cols}) VALUES ('delete', {values})",
            index = self.index_table,
            cols = self.text_columns.join(", "),
            values = self.row_values(row),
        )
    }

    fn row_values(&self, row: &str) -> String {
        std::iter::once(format!("{row}.{}", self.id_column))
            .chain(self.text_columns.iter().map(|c| format!("{row}.{c}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Full schema for the pages store: content table, index and triggers.
pub fn pages_schema() -> Vec<String> {
    let mut stmts = vec![PAGES_TABLE_SQL.to_string()];
    stmts.extend(PAGES.statements());
    stmts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
