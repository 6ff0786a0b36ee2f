//! b2-upload - upload a backup archive to Backblaze B2
//!
//! Thin orchestration around the containerized b2 command-line tool:
//! credentials come from a local .env file, every delegated call runs in a
//! throwaway container, and leftover containers are removed on the way out.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use b2_uploader::commands::{self, Cli};
use b2_uploader::exit_code::ExitCode;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1 like every other failure; --help/--version exit 0
            let code = if e.use_stderr() {
                ExitCode::Failure
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    // Logs go to stderr so stdout stays parseable in --json mode
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;
    tracing::debug!(%exit_code, "exiting");

    std::process::exit(exit_code.as_i32());
}
