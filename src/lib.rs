pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod normalize;
pub mod record;
pub mod render;
pub mod server;

use clap::Parser;
use cli::Cli;
use log::info;
use std::process::ExitCode;

/// `RUST_LOG` wins; otherwise `info`, raised by each `-v`.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_timestamp_millis()
    .try_init();
}

pub async fn run() -> ExitCode {
    // `.env` must be loaded before clap reads the JIRA_* fallbacks.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("jira-export {}", env!("CARGO_PKG_VERSION"));

    match cli::execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("{}", err.redacted());
            ExitCode::FAILURE
        }
    }
}
