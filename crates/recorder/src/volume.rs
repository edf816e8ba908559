//! Storage Volume
//!
//! Mount-gated view over the directory backing the removable card. All
//! file access goes through here so unmounting reliably cuts every path
//! to the medium.

use crate::RecorderError;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Directory entries hidden from listings: host-OS droppings and FAT
/// long-name artifacts.
const SKIP_PREFIXES: [&str; 5] = [
    "System Volume Information",
    "SYSTEM~",
    "FSEVE~",
    "SPOTL~",
    "TRASH~",
];

/// One listed file: name plus size, when the entry could be stat'ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: Option<u64>,
}

/// Mountable directory-backed volume.
pub struct Volume {
    root: PathBuf,
    mounted: AtomicBool,
}

impl Volume {
    /// Volume over `root`; starts unmounted.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Make the backing directory available and mark the volume mounted.
    pub fn mount(&self) -> Result<(), RecorderError> {
        if let Err(err) = fs::create_dir_all(&self.root) {
            error!("Failed to mount volume at {}: {err}", self.root.display());
            return Err(err.into());
        }
        self.mounted.store(true, Ordering::Release);
        info!("Volume mounted at {}", self.root.display());
        Ok(())
    }

    /// Mark the volume unmounted; subsequent file access is refused.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
        info!("Volume unmounted");
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure_mounted(&self) -> Result<(), RecorderError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(RecorderError::NotMounted)
        }
    }

    /// List data files, skipping dot-files and host-OS artifacts.
    pub fn list(&self) -> Result<Vec<FileEntry>, RecorderError> {
        self.ensure_mounted()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || SKIP_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }
            let size = entry.metadata().ok().map(|m| m.len());
            entries.push(FileEntry { name, size });
        }
        Ok(entries)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.is_mounted() && self.path_of(name).exists()
    }

    /// Delete a file; `NotFound` when it does not exist.
    pub fn remove(&self, name: &str) -> Result<(), RecorderError> {
        self.ensure_mounted()?;
        let path = self.path_of(name);
        if !path.exists() {
            return Err(RecorderError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Open a session file for appending, creating it if needed.
    pub fn open_append(&self, name: &str) -> Result<File, RecorderError> {
        self.ensure_mounted()?;
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_of(name))?)
    }

    /// Open a file for reading.
    pub fn open_read(&self, name: &str) -> Result<File, RecorderError> {
        self.ensure_mounted()?;
        File::open(self.path_of(name))
            .map_err(|_| RecorderError::OpenFailed(name.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &std::path::Path {
        &self.root
    }
}
