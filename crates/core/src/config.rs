//! Settings management
//!
//! Non-secret settings are read from an optional TOML file stored at
//! ~/.config/b2-uploader/config.toml. Secrets never live here; see
//! [`crate::credentials`].
//!
//! PROTECTED FILE: Changes to schema_version require migration support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current settings schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Default credentials file, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Default container runtime executable
pub const DEFAULT_RUNTIME: &str = "docker";

/// Default image providing the b2 command-line tool
pub const DEFAULT_IMAGE: &str = "backblazeit/b2:latest";

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Path of the KEY=VALUE credentials file
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Container runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

/// Which runtime executable and image run the b2 tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Runtime executable: "docker", "podman", or an absolute path
    #[serde(default = "default_program")]
    pub program: String,

    /// Image that provides the `b2` executable
    #[serde(default = "default_image")]
    pub image: String,
}

fn default_env_file() -> PathBuf {
    PathBuf::from(DEFAULT_ENV_FILE)
}

fn default_program() -> String {
    DEFAULT_RUNTIME.to_string()
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            image: default_image(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            env_file: default_env_file(),
            runtime: RuntimeSettings::default(),
        }
    }
}

/// Command-line overrides applied on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub env_file: Option<PathBuf>,
    pub program: Option<String>,
    pub image: Option<String>,
}

impl Settings {
    /// Apply command-line overrides, which always win over the file
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(env_file) = overrides.env_file {
            self.env_file = env_file;
        }
        if let Some(program) = overrides.program {
            self.runtime.program = program;
        }
        if let Some(image) = overrides.image {
            self.runtime.image = image;
        }
        self
    }
}

/// Settings manager handles locating and loading the settings file
#[derive(Debug)]
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new SettingsManager with the default settings path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let settings_path = config_dir.join("b2-uploader").join("config.toml");
        Ok(Self { settings_path })
    }

    /// Create a SettingsManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            settings_path: path,
        }
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk
    ///
    /// The file is optional: a missing file yields the defaults.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::debug!(
                path = %self.settings_path.display(),
                "no settings file, using defaults"
            );
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.settings_path)?;
        let mut settings: Settings = toml::from_str(&content)?;

        if settings.schema_version < SCHEMA_VERSION {
            settings = self.migrate(settings);
        } else if settings.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Settings file version {} is newer than supported version {}. \
                 Please upgrade b2-upload.",
                settings.schema_version, SCHEMA_VERSION
            )));
        }

        tracing::debug!(path = %self.settings_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Migrate settings from an older schema version
    fn migrate(&self, mut settings: Settings) -> Settings {
        // Version 0 files predate the field and carry nothing that changed shape.
        settings.schema_version = SCHEMA_VERSION;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_settings_manager() -> (SettingsManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        (SettingsManager::with_path(path), temp_dir)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.schema_version, SCHEMA_VERSION);
        assert_eq!(settings.env_file, PathBuf::from(".env"));
        assert_eq!(settings.runtime.program, "docker");
        assert_eq!(settings.runtime.image, "backblazeit/b2:latest");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_settings_manager();
        assert_eq!(manager.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let (manager, _temp_dir) = temp_settings_manager();
        std::fs::write(
            manager.settings_path(),
            r#"
            schema_version = 1

            [runtime]
            program = "podman"
            "#,
        )
        .unwrap();

        let settings = manager.load().unwrap();
        assert_eq!(settings.runtime.program, "podman");
        assert_eq!(settings.runtime.image, DEFAULT_IMAGE);
        assert_eq!(settings.env_file, PathBuf::from(DEFAULT_ENV_FILE));
    }

    #[test]
    fn test_old_schema_is_migrated() {
        let (manager, _temp_dir) = temp_settings_manager();
        std::fs::write(manager.settings_path(), "schema_version = 0\n").unwrap();

        let settings = manager.load().unwrap();
        assert_eq!(settings.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_settings_manager();
        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.settings_path(), content).unwrap();

        let result = manager.load();
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("newer than supported"));
    }

    #[test]
    fn test_invalid_toml() {
        let (manager, _temp_dir) = temp_settings_manager();
        std::fs::write(manager.settings_path(), "schema_version = [").unwrap();
        assert!(matches!(manager.load(), Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings::default().with_overrides(Overrides {
            env_file: Some(PathBuf::from("/etc/b2.env")),
            program: None,
            image: Some("backblazeit/b2:4.3.0".into()),
        });
        assert_eq!(settings.env_file, PathBuf::from("/etc/b2.env"));
        assert_eq!(settings.runtime.program, DEFAULT_RUNTIME);
        assert_eq!(settings.runtime.image, "backblazeit/b2:4.3.0");
    }
}
