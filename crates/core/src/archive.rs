//! Invocation parsing and archive resolution
//!
//! Turns the raw `<archive> <bucket> [remote-name]` arguments into a
//! [`Destination`] and, once the credentials are loaded, resolves the archive
//! into an absolute, readable regular file.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Where the archive ends up inside B2
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    /// Bucket name
    pub bucket: String,
    /// Object name within the bucket
    pub remote_name: String,
}

impl Destination {
    /// Get the destination as a `b2://bucket/name` URI
    pub fn to_uri(&self) -> String {
        format!("b2://{}/{}", self.bucket, self.remote_name)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// Validated invocation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Archive path as given on the command line
    pub archive: PathBuf,
    /// Upload destination
    pub destination: Destination,
}

impl Invocation {
    /// Validate the invocation parameters
    ///
    /// When `remote_name` is omitted (or empty) the archive's base filename
    /// is used, e.g. `./data/backup.zip` uploads as `backup.zip`.
    pub fn new(
        archive: impl Into<PathBuf>,
        bucket: &str,
        remote_name: Option<&str>,
    ) -> Result<Self> {
        let archive = archive.into();

        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(Error::Usage("bucket name cannot be empty".into()));
        }
        if bucket.contains('/') {
            return Err(Error::Usage(format!(
                "bucket name '{bucket}' cannot contain '/'"
            )));
        }
        // b2 would parse these as options
        if bucket.starts_with('-') {
            return Err(Error::Usage(format!(
                "bucket name '{bucket}' cannot start with '-'"
            )));
        }

        let remote_name = match remote_name.map(|n| n.trim_start_matches('/')) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base_name(&archive)?,
        };
        if remote_name.starts_with('-') {
            return Err(Error::Usage(format!(
                "remote name '{remote_name}' cannot start with '-'"
            )));
        }

        Ok(Self {
            archive,
            destination: Destination {
                bucket: bucket.to_string(),
                remote_name,
            },
        })
    }

    /// Resolve the archive path into a readable regular file
    pub fn resolve_archive(&self) -> Result<Archive> {
        Archive::resolve(&self.archive)
    }
}

fn base_name(path: &Path) -> Result<String> {
    let name = path.file_name().ok_or_else(|| {
        Error::Usage(format!(
            "cannot derive a remote name from '{}'",
            path.display()
        ))
    })?;
    name.to_str().map(str::to_string).ok_or_else(|| {
        Error::Usage(format!(
            "archive file name '{}' is not valid UTF-8",
            path.display()
        ))
    })
}

/// An archive that exists and can be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Canonical absolute path
    pub path: PathBuf,
    /// Directory containing the archive
    pub dir: PathBuf,
    /// File name within `dir`
    pub file_name: String,
    /// Size in bytes
    pub size_bytes: u64,
}

impl Archive {
    /// Resolve `path` to a canonical, readable regular file
    pub fn resolve(path: &Path) -> Result<Self> {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => return Err(Error::ArchiveNotFound(path.to_path_buf())),
        };

        let metadata = std::fs::metadata(&canonical)?;
        if !metadata.is_file() {
            return Err(Error::ArchiveNotFound(path.to_path_buf()));
        }

        if let Err(e) = File::open(&canonical) {
            return Err(Error::ArchiveUnreadable {
                path: canonical,
                reason: e.to_string(),
            });
        }

        let file_name = base_name(&canonical)?;
        let dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        // The directory is handed to the runtime as text
        if dir.to_str().is_none() {
            return Err(Error::Usage(format!(
                "archive directory '{}' is not valid UTF-8",
                dir.display()
            )));
        }

        Ok(Self {
            path: canonical,
            dir,
            file_name,
            size_bytes: metadata.len(),
        })
    }

    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size_bytes, humansize::BINARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remote_name_defaults_to_base_name() {
        let inv = Invocation::new("./data/backup.zip", "my-bucket", None).unwrap();
        assert_eq!(inv.destination.remote_name, "backup.zip");
        assert_eq!(inv.destination.to_uri(), "b2://my-bucket/backup.zip");
    }

    #[test]
    fn test_explicit_remote_name() {
        let inv = Invocation::new("backup.zip", "my-bucket", Some("2024/01/db.zip")).unwrap();
        assert_eq!(inv.destination.remote_name, "2024/01/db.zip");
        assert_eq!(inv.destination.to_string(), "b2://my-bucket/2024/01/db.zip");
    }

    #[test]
    fn test_empty_remote_name_falls_back() {
        let inv = Invocation::new("backup.zip", "my-bucket", Some("")).unwrap();
        assert_eq!(inv.destination.remote_name, "backup.zip");
    }

    #[test]
    fn test_leading_slash_stripped() {
        let inv = Invocation::new("backup.zip", "my-bucket", Some("/nightly/backup.zip")).unwrap();
        assert_eq!(inv.destination.remote_name, "nightly/backup.zip");
    }

    #[test]
    fn test_invalid_bucket() {
        assert!(matches!(
            Invocation::new("backup.zip", "  ", None),
            Err(Error::Usage(_))
        ));
        assert!(matches!(
            Invocation::new("backup.zip", "a/b", None),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_names_starting_with_dash() {
        assert!(matches!(
            Invocation::new("backup.zip", "--help", None),
            Err(Error::Usage(_))
        ));
        assert!(matches!(
            Invocation::new("backup.zip", "my-bucket", Some("-rf")),
            Err(Error::Usage(_))
        ));
        assert!(matches!(
            Invocation::new("./-backup.zip", "my-bucket", None),
            Err(Error::Usage(_))
        ));
        let inv = Invocation::new("./-backup.zip", "my-bucket", Some("backup.zip")).unwrap();
        assert_eq!(inv.destination.remote_name, "backup.zip");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from("/srv").join(OsStr::from_bytes(b"backup-\xff.zip"));
        assert!(matches!(
            Invocation::new(&path, "my-bucket", None),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_archive_without_file_name() {
        assert!(matches!(
            Invocation::new("..", "my-bucket", None),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_resolve_existing_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.zip");
        std::fs::write(&path, b"PK\x03\x04data").unwrap();

        let archive = Archive::resolve(&path).unwrap();
        assert!(archive.path.is_absolute());
        assert_eq!(archive.file_name, "backup.zip");
        assert_eq!(archive.dir, dir.path().canonicalize().unwrap());
        assert_eq!(archive.size_bytes, 8);
        assert_eq!(archive.size_human(), "8 B");
    }

    #[test]
    fn test_resolve_missing_archive() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new(dir.path().join("nope.zip"), "my-bucket", None).unwrap();
        assert!(matches!(
            inv.resolve_archive(),
            Err(Error::ArchiveNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_directory_is_not_an_archive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("backup.zip");
        std::fs::create_dir(&sub).unwrap();
        assert!(matches!(Archive::resolve(&sub), Err(Error::ArchiveNotFound(_))));
    }
}
