//! Container runtime adapter
//!
//! Drives any Docker-compatible runtime executable (docker, podman) through
//! `tokio::process` and implements the ContainerRuntime trait from b2u-core.

use std::ffi::OsStr;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use b2u_core::{ContainerRuntime, Error, Result, RunSpec, ToolOutput};

/// Runtime driven through its command-line client
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
}

impl CliRuntime {
    /// Create a runtime adapter for the given executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the `run` argument list for a spec
    ///
    /// Environment values are not part of the result; only their names are
    /// passed with `-e`, and the client picks the values up from its own
    /// environment.
    pub fn run_args(spec: &RunSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];

        for mount in &spec.mounts {
            args.push("--mount".to_string());
            args.push(mount_arg(&mount.host.to_string_lossy(), &mount.container));
        }

        for var in &spec.env {
            args.push("-e".to_string());
            args.push(var.name.clone());
        }

        if let Some(entrypoint) = &spec.entrypoint {
            args.push("--entrypoint".to_string());
            args.push(entrypoint.clone());
        }

        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());
        args
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn exec(&self, mut cmd: Command) -> Result<ToolOutput> {
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::RuntimeUnavailable(format!("{}: {e}", self.program))
            } else {
                Error::Io(e)
            }
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        Ok(ToolOutput::new(output.status.code(), text))
    }

    /// Run a management subcommand (ps/stop/rm) that must succeed
    async fn manage(&self, operation: &'static str, args: &[&str]) -> Result<ToolOutput> {
        tracing::debug!(program = %self.program, ?args, "running runtime command");
        self.exec(self.command(args)).await?.into_result(operation)
    }
}

/// Read-only bind mount in `--mount` form
///
/// `--mount` takes CSV fields, so a `:` in the host path needs no escaping
/// (unlike `-v`), but a field holding `,` or `"` must be quoted.
fn mount_arg(host: &str, container: &str) -> String {
    [
        "type=bind".to_string(),
        csv_field(&format!("source={host}")),
        csv_field(&format!("target={container}")),
        "readonly".to_string(),
    ]
    .join(",")
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn is_available(&self) -> bool {
        match self.exec(self.command(["--version"])).await {
            Ok(output) if output.success() => {
                tracing::debug!(version = %output.output.trim(), "container runtime available");
                true
            }
            Ok(output) => {
                tracing::debug!(exit_code = ?output.exit_code, "runtime version check failed");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "runtime version check could not start");
                false
            }
        }
    }

    async fn run(&self, spec: &RunSpec) -> Result<ToolOutput> {
        let args = Self::run_args(spec);
        tracing::debug!(program = %self.program, image = %spec.image, "starting container");

        let mut cmd = self.command(&args);
        for var in &spec.env {
            cmd.env(&var.name, &var.value);
        }

        let output = self.exec(cmd).await?;
        tracing::debug!(exit_code = ?output.exit_code, "container finished");
        Ok(output)
    }

    async fn list_by_ancestor(&self, image: &str) -> Result<Vec<String>> {
        let filter = format!("ancestor={image}");
        let output = self
            .manage("list containers", &["ps", "-a", "-q", "--filter", &filter])
            .await?;
        Ok(output
            .output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.manage("stop container", &["stop", id]).await.map(|_| ())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.manage("remove container", &["rm", "-f", id])
            .await
            .map(|_| ())
    }
}
