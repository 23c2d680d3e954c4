//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Global config from `~/.pagefts/config.toml`
//! 3. Local config from `<cwd>/.pagefts/config.toml`
//! 4. An explicit `--config` file
//!
//! Each layer only overrides fields it explicitly sets; absent fields
//! are left at their previous value.  CLI flags are applied by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Special database path for a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

// ---------------------------------------------------------------------------
// Public config types (fully resolved, no Options)
// ---------------------------------------------------------------------------

/// Top-level configuration, fully resolved with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`.  `None` means `~/.pagefts/pages.db`.
    pub path: Option<String>,
    pub busy_timeout_ms: u64,
    /// Verify the index against content before committing each write.  The
    /// FTS5 integrity check scans the whole index, so each write pays for it.
    pub verify_writes: bool,
}

/// Search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub snippet_tokens: usize,
}

/// Output / display settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// `"text"` or `"json"`.
    pub format: String,
    /// Color mode: `"auto"`, `"always"`, or `"never"`.
    pub color: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            verify_writes: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            snippet_tokens: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            color: "auto".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Option-based overlay types (for partial deserialization)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigOverlay {
    database: Option<DatabaseOverlay>,
    search: Option<SearchOverlay>,
    output: Option<OutputOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct DatabaseOverlay {
    path: Option<String>,
    busy_timeout_ms: Option<u64>,
    verify_writes: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SearchOverlay {
    default_limit: Option<usize>,
    snippet_tokens: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct OutputOverlay {
    format: Option<String>,
    color: Option<String>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

impl Config {
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(db) = overlay.database {
            if db.path.is_some() {
                self.database.path = db.path;
            }
            if let Some(v) = db.busy_timeout_ms {
                self.database.busy_timeout_ms = v;
            }
            if let Some(v) = db.verify_writes {
                self.database.verify_writes = v;
            }
        }
        if let Some(s) = overlay.search {
            if let Some(v) = s.default_limit {
                self.search.default_limit = v;
            }
            if let Some(v) = s.snippet_tokens {
                self.search.snippet_tokens = v;
            }
        }
        if let Some(out) = overlay.output {
            if let Some(v) = out.format {
                self.output.format = v;
            }
            if let Some(v) = out.color {
                self.output.color = v;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.output.format.as_str(), "text" | "json") {
            bail!(
                "output.format must be \"text\" or \"json\", got {:?}",
                self.output.format
            );
        }
        if self.search.default_limit == 0 {
            bail!("search.default_limit must be at least 1");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn parse_overlay(contents: &str, path: &Path) -> Result<ConfigOverlay> {
    toml::from_str(contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Read a config file and parse it as an overlay.
/// Returns `Ok(None)` if the file does not exist.
fn load_overlay(path: &Path) -> Result<Option<ConfigOverlay>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_overlay(&contents, path)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config file {}: {}",
            path.display(),
            e
        )),
    }
}

impl Config {
    /// Load configuration by merging defaults, the global file, the file in
    /// `local_dir` (usually the working directory) and `explicit`, if given.
    ///
    /// An explicit file that does not exist is an error; the implicit
    /// locations are optional.
    pub fn load(local_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
        let global_dir = home_dir().map(|h| h.join(".pagefts"));
        Self::load_with_global_dir(global_dir.as_deref(), local_dir, explicit)
    }

    fn load_with_global_dir(
        global_dir: Option<&Path>,
        local_dir: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<Config> {
        let mut config = Config::default();

        if let Some(dir) = global_dir
            && let Some(overlay) = load_overlay(&dir.join("config.toml"))?
        {
            config.apply_overlay(overlay);
        }

        if let Some(dir) = local_dir
            && let Some(overlay) = load_overlay(&dir.join(".pagefts").join("config.toml"))?
        {
            config.apply_overlay(overlay);
        }

        if let Some(path) = explicit {
            match load_overlay(path)? {
                Some(overlay) => config.apply_overlay(overlay),
                None => bail!("config file not found: {}", path.display()),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve the database location: the configured path, or
    /// `~/.pagefts/pages.db`.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref p) = self.database.path {
            return Ok(PathBuf::from(p));
        }
        match home_dir() {
            Some(home) => Ok(home.join(".pagefts").join("pages.db")),
            None => bail!("could not determine home directory ($HOME is not set); pass --db"),
        }
    }

    pub fn json_output(&self) -> bool {
        self.output.format == "json"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
