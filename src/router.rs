//! Command dispatch: resolves the store location, runs one command and
//! renders its result.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cli::{Cli, Command};
use crate::color;
use crate::config::{Config, MEMORY_PATH};
use crate::errors::{AppError, EXIT_ERROR, EXIT_SUCCESS};
use crate::output::{self, Formatter};
use crate::script;
use crate::store::{PageStore, StoreOptions};
use crate::types::{NewPage, PageUpdate, SearchOptions};

/// Apply CLI overrides on top of the loaded config.
pub fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref db) = cli.db {
        config.database.path = Some(db.clone());
    }
    if cli.json {
        config.output.format = "json".to_string();
    }
}

/// Run the parsed command.  Returns the process exit code for outcomes that
/// are not errors but still signal failure (an inconsistent `check`).
pub fn dispatch(cli: Cli, config: &Config) -> Result<i32, AppError> {
    let json = config.json_output();
    let color = color::resolve_color(&config.output.color);
    let stdout = std::io::stdout();
    let mut fmt = Formatter::new(stdout.lock(), json, color);
    let opts = StoreOptions::from(config);

    // The demo never touches the configured database unless asked to.
    let path = match (&cli.command, &cli.db) {
        (Command::Demo, None) => PathBuf::from(MEMORY_PATH),
        _ => config.database_path()?,
    };
    let mut store = open_store(&path, opts)?;

    let code = match cli.command {
        Command::Demo => {
            // The script rewrites ids 1 and 42; never run it over real pages.
            let existing = store.page_count()?;
            if existing > 0 {
                return Err(AppError::Usage(format!(
                    "demo needs an empty database, {} already holds {existing} page(s)",
                    path.display()
                )));
            }
            let outcomes = store.run_script(&script::demo_script())?;
            for outcome in &outcomes {
                fmt.format_step(outcome)?;
            }
            let report = store.check()?;
            if !json {
                fmt.format_heading("Index check")?;
            }
            fmt.format_report(&report)?;
            exit_for(report.is_consistent())
        }
        Command::Add(args) => {
            let mut page = NewPage::new(args.title, args.body);
            page.id = args.id;
            let stored = store.insert(&page)?;
            info!(id = stored.id, "added page");
            fmt.format_page_line(&stored)?;
            EXIT_SUCCESS
        }
        Command::Edit(args) => {
            let update = PageUpdate {
                title: args.title,
                body: args.body,
            };
            if update.is_empty() {
                return Err(AppError::Usage(
                    "edit needs --title and/or --body".to_string(),
                ));
            }
            let stored = store.update(args.id, &update)?;
            fmt.format_page_line(&stored)?;
            EXIT_SUCCESS
        }
        Command::Rm(args) => {
            let deleted = store.delete(args.id)?;
            fmt.format_deleted(args.id, deleted)?;
            EXIT_SUCCESS
        }
        Command::Show(args) => {
            let page = store.mark_viewed(args.id)?;
            fmt.format_page(&page)?;
            EXIT_SUCCESS
        }
        Command::Ls(args) => {
            let limit = args.limit.unwrap_or(config.search.default_limit);
            let pages = if args.archived {
                store.list_archived(limit)?
            } else {
                store.list(limit)?
            };
            for page in &pages {
                fmt.format_page_line(page)?;
            }
            EXIT_SUCCESS
        }
        Command::Recent(args) => {
            let limit = args.limit.unwrap_or(config.search.default_limit);
            let pages = store.recent(limit)?;
            if pages.is_empty() {
                output::print_hint("no pages viewed yet; `pagefts show <id>` records a view", json);
            }
            for page in &pages {
                fmt.format_page_line(page)?;
            }
            EXIT_SUCCESS
        }
        Command::Archive(args) => {
            let page = store.archive(args.id)?;
            info!(id = page.id, "archived page");
            fmt.format_page_line(&page)?;
            EXIT_SUCCESS
        }
        Command::Unarchive(args) => {
            let page = store.unarchive(args.id)?;
            fmt.format_page_line(&page)?;
            EXIT_SUCCESS
        }
        Command::Find(args) => {
            let limit = args.limit.unwrap_or(config.search.default_limit);
            let pages = store.find_by_title(&args.pattern, limit)?;
            if pages.is_empty() {
                output::print_hint("no titles matched", json);
            }
            for page in &pages {
                fmt.format_page_line(page)?;
            }
            EXIT_SUCCESS
        }
        Command::Search(args) => {
            let (open_marker, close_marker) = fmt.snippet_markers();
            let opts = SearchOptions {
                limit: args.limit.unwrap_or(config.search.default_limit),
                title_only: args.title_only,
                raw: args.raw,
                snippet_tokens: config.search.snippet_tokens,
                open_marker,
                close_marker,
            };
            let hits = store.search(&args.query, &opts)?;
            debug!(count = hits.len(), "search finished");
            if hits.is_empty() {
                output::print_hint("no pages matched", json);
            }
            for hit in &hits {
                fmt.format_hit(hit)?;
            }
            EXIT_SUCCESS
        }
        Command::Check => {
            let report = store.check()?;
            fmt.format_report(&report)?;
            exit_for(report.is_consistent())
        }
        Command::Rebuild => {
            let report = store.rebuild()?;
            fmt.format_report(&report)?;
            EXIT_SUCCESS
        }
    };

    store.close()?;
    Ok(code)
}

fn open_store(path: &Path, opts: StoreOptions) -> Result<PageStore, AppError> {
    debug!(path = %path.display(), "opening page store");
    Ok(PageStore::open(path, opts)?)
}

fn exit_for(consistent: bool) -> i32 {
    if consistent { EXIT_SUCCESS } else { EXIT_ERROR }
}
