//! b2u-core: Core library for the b2-uploader backup CLI
//!
//! This crate provides the runtime-independent pieces of the uploader:
//! - Settings file management
//! - Credential loading from a dotenv-style file
//! - Invocation validation and archive resolution
//! - ContainerRuntime and StorageTool traits for the delegated operations
//!
//! Nothing here spawns processes, so the whole pipeline can be exercised
//! against fakes.

pub mod archive;
pub mod config;
pub mod credentials;
pub mod error;
pub mod traits;

pub use archive::{Archive, Destination, Invocation};
pub use config::{Overrides, RuntimeSettings, Settings, SettingsManager};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use traits::{ContainerRuntime, EnvVar, Mount, RunSpec, StorageTool, ToolOutput};
