//! CLI definition and execution
//!
//! b2-upload has a single job, so there are no subcommands: the positional
//! arguments describe the upload and the flags tune configuration and output.

use std::path::PathBuf;

use clap::Parser;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

pub mod upload;

/// b2-upload - upload a backup archive to Backblaze B2
///
/// Runs the b2 command-line tool in a disposable container: authorizes the
/// account, uploads the archive, lists it back to verify, and removes any
/// containers left behind.
#[derive(Parser, Debug)]
#[command(name = "b2-upload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Archive file to upload
    pub archive: PathBuf,

    /// Destination bucket
    pub bucket: String,

    /// Object name in the bucket (default: the archive's file name)
    pub remote_name: Option<String>,

    /// Credentials file with B2_APPLICATION_KEY_ID and B2_APPLICATION_KEY
    #[arg(long, env = "B2_UPLOADER_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Settings file (default: ~/.config/b2-uploader/config.toml)
    #[arg(long, env = "B2_UPLOADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Container runtime executable, e.g. docker or podman
    #[arg(long)]
    pub runtime: Option<String>,

    /// Image providing the b2 tool
    #[arg(long)]
    pub image: Option<String>,

    /// Output format: human-readable or JSON
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

/// Execute the CLI and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    upload::execute(upload::UploadArgs::from(cli), output_config).await
}
