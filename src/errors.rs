//! Application error types and user-facing error formatting.
//!
//! - [`StoreError`] for failures of the pages store and its index
//! - [`AppError`] as the unified top-level error type
//!
//! [`AppError`] carries contextual hints and exit codes so that `main()` can
//! present human-readable diagnostics on stderr without ever exposing raw
//! panics or debug formatting.

use rusqlite::ErrorCode;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `0` - success
/// * `1` - general runtime error
/// * `2` - usage / argument error (bad CLI invocation)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from the pages store.
///
/// Every variant is returned after the surrounding transaction has been
/// rolled back, so content and index are left as they were before the call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A statement failed at the SQLite level (bad SQL, bad FTS5 query, ...).
    #[error("statement failed: {0}")]
    Statement(#[from] rusqlite::Error),

    /// An explicit id collided with a live page.
    #[error("page {0} already exists")]
    DuplicateId(i64),

    /// No page with this id.
    #[error("page {0} not found")]
    NotFound(i64),

    /// Content and index disagree after a write.
    #[error("index out of sync: {0}")]
    Consistency(String),

    /// The search query has nothing to match on, or a raw query does not
    /// parse.
    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    /// Creating the database directory failed.
    #[error("creating database directory: {0}")]
    Io(#[from] std::io::Error),

    /// The linked SQLite library lacks FTS5.
    #[error("this SQLite build does not include FTS5")]
    Fts5Unavailable,
}

impl StoreError {
    /// Map a failed insert to [`StoreError::DuplicateId`] when it tripped the
    /// primary key of an explicitly chosen id.
    pub(crate) fn from_insert(err: rusqlite::Error, id: Option<i64>) -> Self {
        match (&err, id) {
            (rusqlite::Error::SqliteFailure(e, _), Some(id))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::DuplicateId(id)
            }
            _ => StoreError::Statement(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

/// Unified error type for the entire application.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usage / argument error (exit code 2).
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Statement(err))
    }
}

impl AppError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Return an optional human-readable hint that may help the user fix
    /// the problem.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Store(StoreError::DuplicateId(_)) => {
                Some("omit --id to let the database assign one, or use `pagefts edit`")
            }
            AppError::Store(StoreError::NotFound(_)) => {
                Some("run `pagefts ls` to see existing page ids")
            }
            AppError::Store(StoreError::Consistency(_)) => {
                Some("run `pagefts check`, then `pagefts rebuild` to regenerate the index")
            }
            AppError::Store(StoreError::InvalidQuery(_)) => {
                Some("search for at least one word; with --raw the query must be valid FTS5 syntax")
            }
            AppError::Store(StoreError::Fts5Unavailable) => {
                Some("build with the bundled SQLite (rusqlite `bundled` feature)")
            }
            AppError::Store(StoreError::Io(e)) | AppError::Io(e)
                if e.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                Some("check file permissions")
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
