mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use repocache::AppConfig;
use repocache::model::config::log_dir;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let _guard = init_logging(&config);

    tracing::info!("repocache starting: {:?}", cli.command);
    let result = cli::run(cli, &config);
    if let Err(err) = &result {
        tracing::error!("{err:#}");
    }
    result
}

/// Logs go to a daily file in the per-user data directory so they never mix
/// with command output. Falls back to stderr when that directory is unusable.
fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter));

    let log_dir = log_dir().filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let Some(log_dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
        return None;
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, "repocache.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    Some(guard)
}
