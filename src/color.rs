//! Color resolution: determines whether to emit ANSI color codes.
//!
//! Priority chain (highest first):
//! 1. `NO_COLOR` env (any value) → false
//! 2. `CLICOLOR_FORCE=1` env → true
//! 3. Config `"always"` → true, `"never"` → false
//! 4. `CLICOLOR=0` env → false
//! 5. TTY detection on stdout

use std::io::IsTerminal;

/// Reset all attributes.
pub const RESET: &str = "\x1b[0m";
/// Page ids: green.
pub const ID: &str = "\x1b[32m";
/// Titles: bold.
pub const TITLE: &str = "\x1b[1m";
/// Matched terms inside snippets: red + bold + underline.
pub const MATCH: &str = "\x1b[1m\x1b[4m\x1b[31m";
/// Section headings in script output: cyan.
pub const HEADING: &str = "\x1b[36m";
/// Failed steps: red.
pub const ERROR: &str = "\x1b[31m";

/// Resolve whether to use color from the environment, config and TTY state.
pub fn resolve_color(config_color: &str) -> bool {
    let env = ColorEnv {
        no_color: std::env::var_os("NO_COLOR").is_some(),
        clicolor_force: std::env::var("CLICOLOR_FORCE").ok(),
        clicolor: std::env::var("CLICOLOR").ok(),
        is_tty: std::io::stdout().is_terminal(),
    };
    env.resolve(config_color)
}

/// The environment inputs to color resolution, captured so the rules can be
/// tested without touching process state.
#[derive(Debug, Default)]
struct ColorEnv {
    no_color: bool,
    clicolor_force: Option<String>,
    clicolor: Option<String>,
    is_tty: bool,
}

impl ColorEnv {
    fn resolve(&self, config_color: &str) -> bool {
        if self.no_color {
            return false;
        }
        if self.clicolor_force.as_deref() == Some("1") {
            return true;
        }
        match config_color {
            "always" => return true,
            "never" => return false,
            _ => {}
        }
        if self.clicolor.as_deref() == Some("0") {
            return false;
        }
        self.is_tty
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
