use anyhow::Result;
use autologin_updater::cli::Cli;
use autologin_updater::core::user_friendly_error;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.build_config();

    // RUST_LOG overrides the level picked from --verbose / --quiet
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute_with_config(config).await {
        Ok(code) => Ok(code),
        Err(e) => {
            user_friendly_error(e).display();
            Ok(ExitCode::FAILURE)
        }
    }
}
