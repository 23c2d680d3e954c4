//! Output formatting: plain text (default) and JSON Lines (`--json`).
//!
//! All result data flows through a [`Formatter`] which writes to an
//! arbitrary [`std::io::Write`] destination (typically stdout).
//! Hints and errors always go to stderr via [`print_hint`] and [`print_error`].

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::check::CheckReport;
use crate::color;
use crate::errors::AppError;
use crate::script::StepOutcome;
use crate::types::{Page, SearchHit};

/// Result of a delete, for JSON output.
#[derive(Debug, Clone, Serialize)]
struct DeleteOutput {
    id: i64,
    deleted: bool,
}

/// Output formatter that renders results as human-readable text or as
/// JSON Lines (one JSON object per line).
pub struct Formatter<W: Write> {
    writer: W,
    json: bool,
    color: bool,
}

impl<W: Write> Formatter<W> {
    /// * `json`  - emit JSON Lines instead of text.
    /// * `color` - emit ANSI color codes in text output.
    pub fn new(writer: W, json: bool, color: bool) -> Self {
        Self {
            writer,
            json,
            color: color && !json,
        }
    }

    /// Markers to wrap matched terms in search snippets.
    pub fn snippet_markers(&self) -> (String, String) {
        if self.color {
            (color::MATCH.to_string(), color::RESET.to_string())
        } else {
            ("[".to_string(), "]".to_string())
        }
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        let line = serde_json::to_string(value).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    fn paint(&mut self, code: &str, text: impl std::fmt::Display) -> std::io::Result<()> {
        if self.color {
            write!(self.writer, "{code}{text}{}", color::RESET)
        } else {
            write!(self.writer, "{text}")
        }
    }

    /// One line per page: `id:title`.
    pub fn format_page_line(&mut self, page: &Page) -> std::io::Result<()> {
        if self.json {
            return self.write_json(page);
        }
        self.paint(color::ID, page.id)?;
        write!(self.writer, ":")?;
        self.paint(color::TITLE, &page.title)?;
        writeln!(self.writer)
    }

    /// Full page: header fields, a blank line, then the body.
    pub fn format_page(&mut self, page: &Page) -> std::io::Result<()> {
        if self.json {
            return self.write_json(page);
        }
        write!(self.writer, "id:      ")?;
        self.paint(color::ID, page.id)?;
        write!(self.writer, "\ntitle:   ")?;
        self.paint(color::TITLE, &page.title)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "created: {}", page.created_at)?;
        writeln!(self.writer, "updated: {}", page.updated_at)?;
        write!(self.writer, "views:   {}", page.view_count)?;
        if let Some(ref viewed) = page.last_viewed_at {
            write!(self.writer, " (last {viewed})")?;
        }
        writeln!(self.writer)?;
        if let Some(ref archived) = page.archived_at {
            writeln!(self.writer, "archived: {archived}")?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", page.body)
    }

    /// `id:title:  snippet`
    pub fn format_hit(&mut self, hit: &SearchHit) -> std::io::Result<()> {
        if self.json {
            return self.write_json(hit);
        }
        self.paint(color::ID, hit.id)?;
        write!(self.writer, ":")?;
        self.paint(color::TITLE, &hit.title)?;
        writeln!(self.writer, ":  {}", hit.snippet)
    }

    pub fn format_deleted(&mut self, id: i64, deleted: bool) -> std::io::Result<()> {
        if self.json {
            return self.write_json(&DeleteOutput { id, deleted });
        }
        if deleted {
            writeln!(self.writer, "deleted page {id}")
        } else {
            writeln!(self.writer, "no page {id}; nothing deleted")
        }
    }

    /// `=== title ===`, preceded by a blank line.
    pub fn format_heading(&mut self, title: &str) -> std::io::Result<()> {
        writeln!(self.writer)?;
        self.paint(color::HEADING, format!("=== {title} ==="))?;
        writeln!(self.writer)
    }

    /// One script step: heading (if it opens a section), the SQL, any
    /// result rows, then success or the error.
    pub fn format_step(&mut self, step: &StepOutcome) -> std::io::Result<()> {
        if self.json {
            return self.write_json(step);
        }
        if let Some(ref heading) = step.heading {
            self.format_heading(heading)?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", step.sql)?;
        if let Some(ref rows) = step.rows {
            if rows.is_empty() {
                writeln!(self.writer, "  No results")?;
            }
            for row in rows {
                writeln!(self.writer, "  {}", render_row(row))?;
            }
        }
        match step.error {
            Some(ref e) => {
                write!(self.writer, "  ")?;
                self.paint(color::ERROR, format!("Error: {e} (rolled back)"))?;
                writeln!(self.writer)
            }
            None => writeln!(self.writer, "  Success!"),
        }
    }

    pub fn format_report(&mut self, report: &CheckReport) -> std::io::Result<()> {
        if self.json {
            return self.write_json(report);
        }
        writeln!(self.writer, "pages:         {}", report.content_rows)?;
        writeln!(self.writer, "index entries: {}", report.index_entries)?;
        if !report.missing.is_empty() {
            writeln!(self.writer, "not indexed:   {}", join_ids(&report.missing))?;
        }
        if !report.orphaned.is_empty() {
            writeln!(self.writer, "orphaned:      {}", join_ids(&report.orphaned))?;
        }
        match report.integrity_error {
            Some(ref e) => writeln!(self.writer, "integrity:     {e}")?,
            None => writeln!(self.writer, "integrity:     ok")?,
        }
        if report.is_consistent() {
            writeln!(self.writer, "consistent")
        } else {
            self.paint(color::ERROR, "INCONSISTENT")?;
            writeln!(self.writer)
        }
    }
}

/// `(1, 'Test Page', NULL)`
fn render_row(row: &[Value]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|v| match v {
            Value::Null => "NULL".to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        })
        .collect();
    format!("({})", cells.join(", "))
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Stderr helpers
// ---------------------------------------------------------------------------

/// Print a hint message to stderr (suppressed when `json` is true).
pub fn print_hint(msg: &str, json: bool) {
    if !json {
        eprintln!("hint: {msg}");
    }
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("error: {msg}");
}

/// Report an [`AppError`] on stderr with `error:` / `hint:` lines and return
/// the process exit code.
pub fn format_error(err: &AppError, json: bool) -> i32 {
    print_error(&format!("{err}"));
    if let Some(hint) = err.hint() {
        print_hint(hint, json);
    }
    err.exit_code()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
