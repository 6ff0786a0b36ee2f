//! b2 command-line tool invoker
//!
//! Runs the b2 tool in a disposable container and implements the
//! StorageTool trait from b2u-core. Each operation is a fixed `sh -c` script;
//! bucket, file, and remote names travel as positional parameters and the
//! key pair as environment variables, so nothing is ever spliced into the
//! script text.

use async_trait::async_trait;

use b2u_core::{
    Archive, ContainerRuntime, Credentials, Destination, Result, RunSpec, StorageTool, ToolOutput,
};

/// Where the archive directory is mounted inside the container
pub const CONTAINER_DATA_DIR: &str = "/data";

/// `$0` for the scripts, shown by sh in its own error messages
const SCRIPT_NAME: &str = "b2-upload";

/// Standalone authorization
pub const AUTHORIZE_SCRIPT: &str =
    r#"exec b2 authorize-account "$B2_APPLICATION_KEY_ID" "$B2_APPLICATION_KEY""#;

/// Authorization followed by `upload-file <bucket> <local-path> <remote-name>`
pub const UPLOAD_SCRIPT: &str = concat!(
    r#"b2 authorize-account "$B2_APPLICATION_KEY_ID" "$B2_APPLICATION_KEY" >/dev/null"#,
    r#" && exec b2 upload-file "$1" "$2" "$3""#,
);

/// Authorization followed by a listing of `b2://<bucket>/<remote-name>`
pub const LIST_SCRIPT: &str = concat!(
    r#"b2 authorize-account "$B2_APPLICATION_KEY_ID" "$B2_APPLICATION_KEY" >/dev/null"#,
    r#" && exec b2 ls --long "b2://$1/$2""#,
);

/// The b2 tool, run through a container runtime
pub struct B2Cli<'a, R: ?Sized> {
    runtime: &'a R,
    image: &'a str,
}

impl<'a, R: ContainerRuntime + ?Sized> B2Cli<'a, R> {
    pub fn new(runtime: &'a R, image: &'a str) -> Self {
        Self { runtime, image }
    }

    fn spec(&self, credentials: &Credentials, script: &str) -> RunSpec {
        let mut spec = RunSpec::new(self.image)
            .entrypoint("sh")
            .args(["-c", script, SCRIPT_NAME]);
        for (name, value) in credentials.env_pairs() {
            spec = spec.env(name, value);
        }
        spec
    }

    /// Build the container run for the standalone authorization
    pub fn authorize_spec(&self, credentials: &Credentials) -> RunSpec {
        self.spec(credentials, AUTHORIZE_SCRIPT)
    }

    /// Build the container run for the upload
    pub fn upload_spec(
        &self,
        credentials: &Credentials,
        archive: &Archive,
        destination: &Destination,
    ) -> RunSpec {
        let local_path = format!("{CONTAINER_DATA_DIR}/{}", archive.file_name);
        self.spec(credentials, UPLOAD_SCRIPT)
            .mount(&archive.dir, CONTAINER_DATA_DIR)
            .args([
                destination.bucket.as_str(),
                local_path.as_str(),
                destination.remote_name.as_str(),
            ])
    }

    /// Build the container run for the verification listing
    pub fn list_spec(&self, credentials: &Credentials, destination: &Destination) -> RunSpec {
        self.spec(credentials, LIST_SCRIPT).args([
            destination.bucket.as_str(),
            destination.remote_name.as_str(),
        ])
    }
}

#[async_trait]
impl<'a, R: ContainerRuntime + ?Sized> StorageTool for B2Cli<'a, R> {
    async fn authorize(&self, credentials: &Credentials) -> Result<ToolOutput> {
        tracing::info!(image = %self.image, "authorizing B2 account");
        self.runtime.run(&self.authorize_spec(credentials)).await
    }

    async fn upload(
        &self,
        credentials: &Credentials,
        archive: &Archive,
        destination: &Destination,
    ) -> Result<ToolOutput> {
        tracing::info!(
            archive = %archive.path.display(),
            destination = %destination,
            size_bytes = archive.size_bytes,
            "uploading archive"
        );
        self.runtime
            .run(&self.upload_spec(credentials, archive, destination))
            .await
    }

    async fn list(
        &self,
        credentials: &Credentials,
        destination: &Destination,
    ) -> Result<ToolOutput> {
        tracing::info!(destination = %destination, "verifying upload");
        self.runtime
            .run(&self.list_spec(credentials, destination))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Runtime that records every run and answers with a canned output
    #[derive(Default)]
    struct RecordingRuntime {
        runs: Mutex<Vec<RunSpec>>,
    }

    #[async_trait]
    impl ContainerRuntime for RecordingRuntime {
        async fn is_available(&self) -> bool {
            true
        }

        async fn run(&self, spec: &RunSpec) -> Result<ToolOutput> {
            self.runs.lock().unwrap().push(spec.clone());
            Ok(ToolOutput::new(Some(0), "ok"))
        }

        async fn list_by_ancestor(&self, _image: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn stop(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn remove(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("0012ab", "K001secret").unwrap()
    }

    fn archive() -> Archive {
        Archive {
            path: PathBuf::from("/srv/backups/backup.zip"),
            dir: PathBuf::from("/srv/backups"),
            file_name: "backup.zip".into(),
            size_bytes: 42,
        }
    }

    fn destination(bucket: &str, remote_name: &str) -> Destination {
        Destination {
            bucket: bucket.into(),
            remote_name: remote_name.into(),
        }
    }

    #[test]
    fn test_authorize_spec() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "backblazeit/b2:latest");
        let spec = b2.authorize_spec(&credentials());

        assert_eq!(spec.image, "backblazeit/b2:latest");
        assert_eq!(spec.entrypoint.as_deref(), Some("sh"));
        assert_eq!(spec.args, vec!["-c", AUTHORIZE_SCRIPT, "b2-upload"]);
        assert!(spec.mounts.is_empty());
        assert_eq!(spec.env.len(), 2);
    }

    #[test]
    fn test_upload_spec() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "backblazeit/b2:latest");
        let dest = destination("my-bucket", "backup.zip");
        let spec = b2.upload_spec(&credentials(), &archive(), &dest);

        assert_eq!(spec.mounts[0].host, PathBuf::from("/srv/backups"));
        assert_eq!(spec.mounts[0].container, "/data");
        assert_eq!(
            spec.args,
            vec![
                "-c",
                UPLOAD_SCRIPT,
                "b2-upload",
                "my-bucket",
                "/data/backup.zip",
                "backup.zip"
            ]
        );
    }

    #[test]
    fn test_list_spec() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "img");
        let spec = b2.list_spec(&credentials(), &destination("my-bucket", "nightly/backup.zip"));
        assert_eq!(
            spec.args,
            vec!["-c", LIST_SCRIPT, "b2-upload", "my-bucket", "nightly/backup.zip"]
        );
    }

    #[test]
    fn test_hostile_names_stay_positional() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "img");
        let remote = "x\"; rm -rf / #$(whoami)";
        let spec = b2.upload_spec(&credentials(), &archive(), &destination("my-bucket", remote));

        assert_eq!(spec.args[1], UPLOAD_SCRIPT);
        assert_eq!(spec.args.last().map(String::as_str), Some(remote));
    }

    #[test]
    fn test_secrets_only_in_env() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "img");
        let spec = b2.upload_spec(&credentials(), &archive(), &destination("b", "r"));
        assert!(spec.args.iter().all(|a| !a.contains("K001secret") && !a.contains("0012ab")));
        assert!(spec.env.iter().any(|v| v.value == "K001secret"));
    }

    #[tokio::test]
    async fn test_operations_run_one_container_each() {
        let runtime = RecordingRuntime::default();
        let b2 = B2Cli::new(&runtime, "img");
        let creds = credentials();
        let dest = destination("my-bucket", "backup.zip");

        b2.authorize(&creds).await.unwrap();
        b2.upload(&creds, &archive(), &dest).await.unwrap();
        b2.list(&creds, &dest).await.unwrap();

        let runs = runtime.runs.lock().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].args[1], AUTHORIZE_SCRIPT);
        assert_eq!(runs[1].args[1], UPLOAD_SCRIPT);
        assert_eq!(runs[2].args[1], LIST_SCRIPT);
        // upload and list authorize again inside their own container
        assert!(runs[1].args[1].starts_with("b2 authorize-account"));
        assert!(runs[2].args[1].starts_with("b2 authorize-account"));
    }
}
