//! Per-session working directory.
//!
//! Every run gets a fresh `scan_<YYYYMMDD_HHMMSS>/` directory holding the
//! rewritten settings file and the page images the driver produces. The
//! final document is written next to it as `scan_<YYYYMMDD_HHMMSS>.pdf`.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use std::fs;
use thiserror::Error;

/// Name of the settings snapshot inside the working directory.
pub const SETTINGS_FILE_NAME: &str = "settings.sf2";

/// Prefix shared by the working directory and the output document.
pub const SESSION_NAME_PREFIX: &str = "scan_";

/// Errors from creating or removing the working directory
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Working directory already exists: {0}")]
    AlreadyExists(Utf8PathBuf),

    #[error("Failed to create working directory {path}: {source}")]
    Create {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove working directory {path}: {source}")]
    Remove {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Timestamp used in session names, e.g. `20240131_094512`.
pub fn session_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// The working directory of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    parent: Utf8PathBuf,
    root: Utf8PathBuf,
    stamp: String,
}

impl Workspace {
    /// Create `scan_<stamp>/` under `parent`.
    ///
    /// Fails if the directory already exists, so two sessions never share one.
    pub fn create_in(parent: &Utf8Path, stamp: &str) -> Result<Self, WorkspaceError> {
        let root = parent.join(format!("{}{}", SESSION_NAME_PREFIX, stamp));

        fs::create_dir(&root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                WorkspaceError::AlreadyExists(root.clone())
            } else {
                WorkspaceError::Create {
                    path: root.clone(),
                    source,
                }
            }
        })?;

        tracing::debug!("Created working directory {}", root);

        Ok(Self {
            parent: parent.to_path_buf(),
            root,
            stamp: stamp.to_string(),
        })
    }

    /// Create a workspace stamped with the current local time.
    pub fn create_now(parent: &Utf8Path) -> Result<Self, WorkspaceError> {
        Self::create_in(parent, &session_stamp(&Local::now()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Where the settings snapshot is written before every page.
    pub fn settings_path(&self) -> Utf8PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    /// `scan_<stamp>.pdf` next to the working directory.
    pub fn default_output(&self) -> Utf8PathBuf {
        self.parent
            .join(format!("{}{}.pdf", SESSION_NAME_PREFIX, self.stamp))
    }

    /// Delete the working directory and everything in it.
    pub fn remove(&self) -> Result<(), WorkspaceError> {
        fs::remove_dir_all(&self.root).map_err(|source| WorkspaceError::Remove {
            path: self.root.clone(),
            source,
        })?;

        tracing::debug!("Removed working directory {}", self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn temp_parent() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_session_stamp_format() {
        let now = Local.with_ymd_and_hms(2024, 1, 31, 9, 45, 12).unwrap();
        assert_eq!(session_stamp(&now), "20240131_094512");
    }

    #[test]
    fn test_layout() {
        let (_temp_dir, parent) = temp_parent();
        let workspace = Workspace::create_in(&parent, "20240131_094512").unwrap();

        assert!(workspace.root().is_dir());
        assert_eq!(workspace.root(), parent.join("scan_20240131_094512"));
        assert_eq!(
            workspace.settings_path(),
            parent.join("scan_20240131_094512").join("settings.sf2")
        );
        assert_eq!(workspace.default_output(), parent.join("scan_20240131_094512.pdf"));
    }

    #[test]
    fn test_existing_directory_is_rejected() {
        let (_temp_dir, parent) = temp_parent();
        Workspace::create_in(&parent, "same").unwrap();

        assert!(matches!(
            Workspace::create_in(&parent, "same"),
            Err(WorkspaceError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_remove_deletes_contents() {
        let (_temp_dir, parent) = temp_parent();
        let workspace = Workspace::create_in(&parent, "gone").unwrap();
        fs::write(workspace.root().join("scan001.png"), b"png").unwrap();

        workspace.remove().unwrap();
        assert!(!workspace.root().exists());
    }
}
