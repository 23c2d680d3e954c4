use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pagefts - pages with a trigger-synchronized SQLite full-text index
#[derive(Parser, Debug)]
#[command(name = "pagefts", version, about)]
pub struct Cli {
    /// Output results as JSON Lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Database file (`:memory:` for a throwaway database)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<String>,

    /// Extra config file, applied after the global and local ones
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the sync smoke test (in memory unless --db is given)
    Demo,

    /// Add a page
    Add(AddArgs),

    /// Change a page's title and/or body
    Edit(EditArgs),

    /// Delete a page
    Rm(IdArgs),

    /// Show one page and record the view
    Show(IdArgs),

    /// List pages, most recently updated first
    Ls(LsArgs),

    /// List recently viewed pages
    Recent(LimitArgs),

    /// Hide a page from search, find and listings
    Archive(IdArgs),

    /// Bring an archived page back
    Unarchive(IdArgs),

    /// Find pages by fuzzy title match
    Find(FindArgs),

    /// Full-text search over titles and bodies
    Search(SearchArgs),

    /// Verify the index against the pages table
    Check,

    /// Regenerate the index from the pages table
    Rebuild,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    pub title: String,

    pub body: String,

    /// Use this id instead of the next free one
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    pub id: i64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New body
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct LsArgs {
    /// List archived pages instead
    #[arg(long)]
    pub archived: bool,

    /// Maximum number of pages
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct LimitArgs {
    /// Maximum number of pages
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct FindArgs {
    /// Characters that must appear in the title, in order
    pub pattern: String,

    /// Maximum number of pages
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Words to search for (all must match)
    pub query: String,

    /// Match titles only
    #[arg(long)]
    pub title_only: bool,

    /// Pass the query to FTS5 as-is (operators, prefixes, NEAR, ...)
    #[arg(long)]
    pub raw: bool,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
