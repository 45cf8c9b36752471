use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Environment variable holding `tracing` directives that replace the `-v`/`-q` levels.
const LOG_ENV: &str = "DOMINO_LOG";

const ENGINE_TARGET: &str = "domino_engine";
const CLI_TARGET: &str = "domino";

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Filter directives: the chosen level for the engine and the CLI, at most warnings from
/// every other crate. `from_env` wins when set.
fn filter_directives(verbosity: u8, quiet: bool, from_env: Option<&str>) -> String {
    if let Some(directives) = from_env.map(str::trim).filter(|d| !d.is_empty()) {
        return directives.to_string();
    }
    let level = level_filter(verbosity, quiet);
    let others = level.min(LevelFilter::WARN);
    format!("{others},{ENGINE_TARGET}={level},{CLI_TARGET}={level}")
}

/// The log-file layer; closed spans are written with their timings, so every
/// branch-and-bound leaf and merge shows up with how long it took.
fn file_layer<S>(file: File) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let from_env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(verbosity, quiet, from_env.as_deref());
    let filter = EnvFilter::try_new(&directives).map_err(|e| {
        CliError::Argument(format!("Invalid {} directives '{}': {}", LOG_ENV, directives, e))
    })?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(&path).map_err(CliError::Io)?;
        subscriber.with(file_layer(file)).init();
    } else {
        subscriber.init();
    }

    Ok(())
}
