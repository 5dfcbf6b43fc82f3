//! Storage layout configuration

use std::ffi::OsString;
use std::path::PathBuf;

use crate::errors::EngineError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "AUTODEPLOY_HOME";

/// On-disk layout under one base directory
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Layout from `AUTODEPLOY_HOME`, else the platform default
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Sealed deployment logs, one file per run
    pub fn deployments_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("deployments"))
    }

    /// Command batches, one file per batch
    pub fn commands_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("commands"))
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Create every directory of the layout
    pub async fn setup(&self) -> Result<(), EngineError> {
        self.deployments_dir().create().await?;
        self.commands_dir().create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(default_base_dir(
            running_as_root(),
            std::env::var_os("XDG_DATA_HOME"),
            home_dir(),
        ))
    }
}

/// System directory for root on Linux, otherwise a per-user directory
fn default_base_dir(root: bool, xdg_data_home: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    if cfg!(target_os = "linux") && root {
        return PathBuf::from("/etc/autodeploy");
    }

    match xdg_data_home.filter(|d| !d.is_empty()) {
        Some(data) => PathBuf::from(data).join("autodeploy"),
        None => home
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".autodeploy"),
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;

    // /proc/self is owned by the effective user
    std::fs::metadata("/proc/self")
        .map(|m| m.uid() == 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
