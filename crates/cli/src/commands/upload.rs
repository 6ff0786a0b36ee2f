//! Upload pipeline
//!
//! VALIDATE_ARGS -> LOAD_CONFIG -> CHECK_PRECONDITIONS -> AUTHORIZE -> UPLOAD
//! -> VERIFY -> CLEANUP. Anything failing before UPLOAD aborts with exit 1;
//! a failed VERIFY only produces a warning. Cleanup wraps the three delegated
//! steps and runs once whichever way they end.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use b2u_core::{
    Archive, ContainerRuntime, Credentials, Destination, Error, Invocation, Overrides, Result,
    Settings, SettingsManager, StorageTool,
};
use b2u_docker::{B2Cli, CliRuntime, Scoped, SweepReport, shutdown_signal, with_cleanup};

use super::Cli;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Arguments of an upload, as parsed from the command line
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub archive: PathBuf,
    pub bucket: String,
    pub remote_name: Option<String>,
    pub env_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub runtime: Option<String>,
    pub image: Option<String>,
}

impl From<Cli> for UploadArgs {
    fn from(cli: Cli) -> Self {
        Self {
            archive: cli.archive,
            bucket: cli.bucket,
            remote_name: cli.remote_name,
            env_file: cli.env_file,
            config: cli.config,
            runtime: cli.runtime,
            image: cli.image,
        }
    }
}

/// Everything gathered before the first delegated call
#[derive(Debug)]
pub struct Prepared {
    pub invocation: Invocation,
    pub settings: Settings,
    pub credentials: Credentials,
}

/// Result of a completed upload
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub status: &'static str,
    pub source: String,
    pub destination: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub uploaded_at: jiff::Timestamp,
}

/// Execute the upload
pub async fn execute(args: UploadArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let prepared = match prepare(&args) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let runtime = CliRuntime::new(prepared.settings.runtime.program.clone());
    run(&prepared, &runtime, &formatter, shutdown_signal()).await
}

/// Validate the arguments and load settings and credentials
///
/// Touches nothing but local files.
pub fn prepare(args: &UploadArgs) -> Result<Prepared> {
    let invocation = Invocation::new(&args.archive, &args.bucket, args.remote_name.as_deref())?;

    let manager = match &args.config {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            SettingsManager::with_path(path.clone())
        }
        None => SettingsManager::new()?,
    };
    let settings = manager.load()?.with_overrides(Overrides {
        env_file: args.env_file.clone(),
        program: args.runtime.clone(),
        image: args.image.clone(),
    });

    let credentials = Credentials::from_env_file(&settings.env_file)?;

    Ok(Prepared {
        invocation,
        settings,
        credentials,
    })
}

/// Check preconditions, run the delegated steps under cleanup, and report
pub async fn run<R, S>(
    prepared: &Prepared,
    runtime: &R,
    formatter: &Formatter,
    interrupt: S,
) -> ExitCode
where
    R: ContainerRuntime + ?Sized,
    S: Future<Output = ()>,
{
    let archive = match check_preconditions(&prepared.invocation, runtime, &prepared.settings).await
    {
        Ok(a) => a,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let image = prepared.settings.runtime.image.as_str();
    let tool = B2Cli::new(runtime, image);
    let body = transfer(
        &tool,
        &prepared.credentials,
        &archive,
        &prepared.invocation.destination,
        formatter.config(),
    );

    let (outcome, sweep) = with_cleanup(runtime, image, body, interrupt).await;
    let code = match outcome {
        Scoped::Completed(Ok(report)) => {
            print_report(formatter, &report);
            ExitCode::Success
        }
        Scoped::Completed(Err(e)) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
        Scoped::Interrupted => {
            formatter.error(&interrupted_message(&sweep));
            return ExitCode::Interrupted;
        }
    };

    if !sweep.is_clean() {
        formatter.warning(&format!(
            "{} cleanup call(s) failed; containers from {image} may be left behind",
            sweep.failed
        ));
    }
    code
}

fn interrupted_message(sweep: &SweepReport) -> String {
    if sweep.is_clean() {
        "Interrupted; leftover containers were cleaned up".to_string()
    } else {
        format!(
            "Interrupted; cleanup incomplete ({} of {} containers removed, {} call(s) failed)",
            sweep.removed, sweep.found, sweep.failed
        )
    }
}

async fn check_preconditions<R: ContainerRuntime + ?Sized>(
    invocation: &Invocation,
    runtime: &R,
    settings: &Settings,
) -> Result<Archive> {
    let archive = invocation.resolve_archive()?;

    if !runtime.is_available().await {
        return Err(Error::RuntimeUnavailable(format!(
            "'{}' is not installed or not on PATH",
            settings.runtime.program
        )));
    }

    Ok(archive)
}

/// AUTHORIZE -> UPLOAD -> VERIFY
async fn transfer<T: StorageTool + ?Sized>(
    tool: &T,
    credentials: &Credentials,
    archive: &Archive,
    destination: &Destination,
    output_config: &OutputConfig,
) -> Result<UploadReport> {
    let spinner = Spinner::start(output_config, "Authorizing B2 account");
    tool.authorize(credentials).await?.into_result("authorize")?;

    spinner.set_message(&format!(
        "Uploading {} ({})",
        archive.file_name,
        archive.size_human()
    ));
    let upload = tool
        .upload(credentials, archive, destination)
        .await?
        .into_result("upload")?;
    tracing::debug!(output = %upload.output.trim(), "upload finished");

    spinner.set_message("Verifying upload");
    let verification = tool
        .list(credentials, destination)
        .await
        .and_then(|output| output.into_result("verify"));
    spinner.finish_and_clear();

    let (listing, warning) = match verification {
        Ok(output) if output.output.trim().is_empty() => {
            (None, Some("listing returned no entries".to_string()))
        }
        Ok(output) => (Some(output.output.trim().to_string()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    if let Some(warning) = &warning {
        tracing::warn!(destination = %destination, %warning, "verification failed");
    }

    Ok(UploadReport {
        status: "success",
        source: archive.path.display().to_string(),
        destination: destination.to_uri(),
        size_bytes: archive.size_bytes,
        size_human: archive.size_human(),
        verified: listing.is_some(),
        listing,
        warning,
        uploaded_at: jiff::Timestamp::now(),
    })
}

fn print_report(formatter: &Formatter, report: &UploadReport) {
    if formatter.is_json() {
        formatter.json(report);
        return;
    }

    formatter.success(&format!(
        "Uploaded {} ({}) -> {}",
        report.source, report.size_human, report.destination
    ));

    if let Some(listing) = &report.listing {
        formatter.println("Verification listing:");
        for line in listing.lines() {
            formatter.println(&format!("  {line}"));
        }
    }
    if let Some(warning) = &report.warning {
        formatter.warning(&format!(
            "Upload succeeded but verification failed: {warning}"
        ));
    }
}
