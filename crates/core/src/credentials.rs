//! Credential loading
//!
//! Reads the B2 application key pair from a local `KEY=VALUE` file. The
//! values are held in memory only; they are not exported into the process
//! environment and never printed.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Key holding the application key identifier
pub const KEY_ID_VAR: &str = "B2_APPLICATION_KEY_ID";

/// Key holding the application key secret
pub const APPLICATION_KEY_VAR: &str = "B2_APPLICATION_KEY";

/// B2 application key pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key_id: String,
    application_key: String,
}

impl Credentials {
    /// Build credentials, rejecting empty values
    pub fn new(key_id: impl Into<String>, application_key: impl Into<String>) -> Result<Self> {
        let key_id = required(KEY_ID_VAR, Some(key_id.into()))?;
        let application_key = required(APPLICATION_KEY_VAR, Some(application_key.into()))?;
        Ok(Self {
            key_id,
            application_key,
        })
    }

    /// Load credentials from a dotenv-style file
    pub fn from_env_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "credentials file not found: {}",
                path.display()
            )));
        }

        let mut key_id = None;
        let mut application_key = None;
        for entry in dotenvy::from_path_iter(path)? {
            let (key, value) = entry?;
            match key.as_str() {
                KEY_ID_VAR => key_id = Some(value),
                APPLICATION_KEY_VAR => application_key = Some(value),
                _ => {}
            }
        }

        let credentials = Self {
            key_id: required(KEY_ID_VAR, key_id)?,
            application_key: required(APPLICATION_KEY_VAR, application_key)?,
        };
        tracing::debug!(path = %path.display(), "loaded credentials");
        Ok(credentials)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }

    /// Name/value pairs to hand to the b2 tool as environment variables
    pub fn env_pairs(&self) -> [(&'static str, &str); 2] {
        [
            (KEY_ID_VAR, self.key_id.as_str()),
            (APPLICATION_KEY_VAR, self.application_key.as_str()),
        ]
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(Error::Config(format!("{name} is empty"))),
        None => Err(Error::Config(format!("{name} is not set"))),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &"<redacted>")
            .field("application_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_env(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_both_keys() {
        let (_dir, path) = write_env(
            "# backblaze\n\
             B2_APPLICATION_KEY_ID=0012ab\n\
             B2_APPLICATION_KEY=\"K001secret\"\n\
             OTHER=1\n",
        );
        let creds = Credentials::from_env_file(&path).unwrap();
        assert_eq!(creds.key_id(), "0012ab");
        assert_eq!(creds.application_key(), "K001secret");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Credentials::from_env_file(&dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_key() {
        let (_dir, path) = write_env("B2_APPLICATION_KEY_ID=0012ab\n");
        let err = Credentials::from_env_file(&path).unwrap_err();
        assert!(err.to_string().contains("B2_APPLICATION_KEY is not set"));
    }

    #[test]
    fn test_empty_key() {
        let (_dir, path) = write_env("B2_APPLICATION_KEY_ID=\nB2_APPLICATION_KEY=K001secret\n");
        let err = Credentials::from_env_file(&path).unwrap_err();
        assert!(err.to_string().contains("B2_APPLICATION_KEY_ID is empty"));
    }

    #[test]
    fn test_whitespace_only_key_is_empty() {
        assert!(Credentials::new("0012ab", "   ").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let creds = Credentials::new("0012ab", "K001secret").unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("0012ab"));
        assert!(!debug.contains("K001secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_env_pairs() {
        let creds = Credentials::new("id", "key").unwrap();
        assert_eq!(
            creds.env_pairs(),
            [("B2_APPLICATION_KEY_ID", "id"), ("B2_APPLICATION_KEY", "key")]
        );
    }
}
