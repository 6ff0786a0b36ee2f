//! Collaborator trait definitions
//!
//! The uploader never talks to B2 itself. It drives the b2 command-line tool
//! inside a disposable container, and both of those collaborators sit behind
//! traits so the pipeline can run against fakes in tests.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::archive::{Archive, Destination};
use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Read-only bind mount of a host directory into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
}

/// Environment variable handed to the container by name
///
/// The value is set on the runtime client process and forwarded with
/// `-e NAME`, so it never shows up in any argv.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=<redacted>", self.name)
    }
}

/// A single disposable container run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    /// Image to run
    pub image: String,
    /// Entrypoint override
    pub entrypoint: Option<String>,
    /// Bind mounts
    pub mounts: Vec<Mount>,
    /// Environment forwarded by name
    pub env: Vec<EnvVar>,
    /// Arguments passed after the image
    pub args: Vec<String>,
}

impl RunSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn mount(mut self, host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        self.mounts.push(Mount {
            host: host.into(),
            container: container.into(),
        });
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvVar {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Exit status and combined stdout/stderr of a delegated call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr text
    pub output: String,
}

impl ToolOutput {
    pub fn new(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into [`Error::Delegated`] carrying the raw output
    pub fn into_result(self, operation: &'static str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let detail = match (self.output.trim(), self.exit_code) {
            ("", Some(code)) => format!("exited with status {code}"),
            ("", None) => "terminated by signal".to_string(),
            (text, _) => text.to_string(),
        };
        Err(Error::Delegated { operation, detail })
    }
}

/// Trait for a Docker-compatible container runtime
///
/// Only the features the uploader needs: an availability check, running a
/// container, and finding, stopping, and removing containers of an image.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the runtime executable can be reached
    async fn is_available(&self) -> bool;

    /// Run a container to completion
    async fn run(&self, spec: &RunSpec) -> Result<ToolOutput>;

    /// List ids of containers (running or exited) created from `image`
    async fn list_by_ancestor(&self, image: &str) -> Result<Vec<String>>;

    /// Stop a container
    async fn stop(&self, id: &str) -> Result<()>;

    /// Remove a container
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Trait for the delegated B2 operations
#[async_trait]
pub trait StorageTool: Send + Sync {
    /// Authorize the account; fails fast on bad credentials
    async fn authorize(&self, credentials: &Credentials) -> Result<ToolOutput>;

    /// Authorize and upload the archive to the destination
    async fn upload(
        &self,
        credentials: &Credentials,
        archive: &Archive,
        destination: &Destination,
    ) -> Result<ToolOutput>;

    /// Authorize and list the destination
    async fn list(&self, credentials: &Credentials, destination: &Destination)
    -> Result<ToolOutput>;
}
