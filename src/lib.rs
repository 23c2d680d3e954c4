//! Pages stored in SQLite with an FTS5 full-text index that triggers keep in
//! sync with every insert, update and delete.

pub mod check;
pub mod cli;
pub mod color;
pub mod config;
pub mod db;
pub mod errors;
pub mod output;
pub mod router;
pub mod schema;
pub mod script;
pub mod store;
pub mod types;

pub use errors::{AppError, StoreError};
pub use store::{PageStore, StoreOptions};
pub use types::{NewPage, Page, PageUpdate, SearchHit, SearchOptions};
