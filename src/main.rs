use std::process::ExitCode;

use pagefts::config::Config;
use pagefts::errors::AppError;
use pagefts::{cli, output, router};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::parse();

    let default_filter = if cli.verbose { "pagefts=debug" } else { "pagefts=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let result = load_config(&cli).and_then(|config| router::dispatch(cli, &config));
    let code = match result {
        Ok(code) => code,
        Err(err) => output::format_error(&err, json),
    };
    ExitCode::from(code as u8)
}

fn load_config(cli: &cli::Cli) -> Result<Config, AppError> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::load(Some(&cwd), cli.config.as_deref())?;
    router::apply_overrides(&mut config, cli);
    Ok(config)
}
