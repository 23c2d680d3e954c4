//! Scripted SQL runs: the smoke test that exercises the sync triggers with
//! plain statements against the content table.
//!
//! Each step runs in its own transaction.  A failing step is rolled back and
//! recorded; the run continues with the next step.

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::{self, PAGES};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    heading: Option<String>,
    sql: String,
}

/// An ordered list of SQL statements, optionally grouped under headings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
    pending_heading: Option<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new section; the heading is attached to the next statement.
    pub fn section(mut self, heading: impl Into<String>) -> Self {
        self.pending_heading = Some(heading.into());
        self
    }

    /// Append one statement.  A trailing `;` is dropped.
    pub fn sql(mut self, sql: impl AsRef<str>) -> Self {
        let sql = sql.as_ref().trim().trim_end_matches(';').trim_end().to_string();
        self.steps.push(Step {
            heading: self.pending_heading.take(),
            sql,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// What happened when one step ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub sql: String,
    /// Column names for statements that return rows, else empty.
    pub columns: Vec<String>,
    /// Result rows for statements that return rows, else `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<Value>>>,
    /// Error message when the step failed and was rolled back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Run every step of `script`.  Only a failure to open a transaction aborts
/// the run; statement failures are recorded in the step's outcome.
pub fn run(conn: &mut Connection, script: &Script) -> rusqlite::Result<Vec<StepOutcome>> {
    let mut outcomes = Vec::with_capacity(script.steps.len());
    for step in &script.steps {
        let tx = conn.transaction()?;
        let outcome = match execute(&tx, &step.sql) {
            Ok((columns, rows)) => {
                tx.commit()?;
                debug!(sql = %step.sql, "step committed");
                StepOutcome {
                    heading: step.heading.clone(),
                    sql: step.sql.clone(),
                    columns,
                    rows,
                    error: None,
                }
            }
            Err(e) => {
                // Dropping `tx` rolls the step back.
                drop(tx);
                warn!(sql = %step.sql, error = %e, "step failed, rolled back");
                StepOutcome {
                    heading: step.heading.clone(),
                    sql: step.sql.clone(),
                    columns: Vec::new(),
                    rows: None,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

type StepResult = (Vec<String>, Option<Vec<Vec<Value>>>);

fn execute(conn: &Connection, sql: &str) -> rusqlite::Result<StepResult> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        stmt.execute([])?;
        return Ok((Vec::new(), None));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(to_json(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok((columns, Some(out)))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

/// The smoke test: set up the schema, then insert, update and delete pages
/// through the content table only, querying the index after each change.
pub fn demo_script() -> Script {
    let index = PAGES.index_table;
    let match_query = |term: &str| {
        format!("SELECT rowid, title, plain_text FROM {index} WHERE {index} MATCH '{term}'")
    };
    let dump = "SELECT id, title, plain_text FROM pages ORDER BY id";

    let mut script = Script::new()
        .section("Setup: content table, index and sync triggers")
        .sql(schema::pages_table_sql());
    for stmt in PAGES.statements() {
        script = script.sql(stmt);
    }

    script
        .section("Test 1: Insert a new page")
        .sql("INSERT INTO pages (title, plain_text) VALUES ('Test Page', 'This is a test page with some content')")
        .sql(match_query("test"))
        .sql(dump)
        .section("Test 2: Update existing page")
        .sql("UPDATE pages SET title = 'Updated Test Page', plain_text = 'This is an updated test page' WHERE id = 1")
        .sql(match_query("updated"))
        .sql(match_query("content"))
        .sql(dump)
        .section("Test 3: Delete the page")
        .sql("DELETE FROM pages WHERE id = 1")
        .sql(match_query("test"))
        .sql(dump)
        .section("Test 4: Insert with specific ID")
        .sql("INSERT INTO pages (id, title, plain_text) VALUES (42, 'Page 42', 'This is page number 42')")
        .sql(match_query("42"))
        .sql(dump)
        .section("Test 5: Update page keeping same ID")
        .sql("UPDATE pages SET title = 'Still Page 42', plain_text = 'This is still page number 42, but updated' WHERE id = 42")
        .sql(match_query("still"))
        .sql(dump)
        .section("Test 6: Insert with a taken ID")
        .sql("INSERT INTO pages (id, title, plain_text) VALUES (42, 'Impostor', 'This row must not land')")
        .sql(match_query("impostor"))
        .sql(dump)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
