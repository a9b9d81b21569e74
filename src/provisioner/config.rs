//! Provisioner Configuration
//!
//! Fixed at process start and never mutated afterwards.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Where volume directories live inside the provisioner's own filesystem
pub const DEFAULT_STORAGE_ROOT: &str = "/persistentvolumes";

/// Subtree of the storage root that archived volumes are moved into
pub const ARCHIVE_DIR_NAME: &str = "archived";

/// Configuration for the host-path provisioner
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Name storage classes use to select this provisioner
    pub provisioner_name: String,
    /// Host-visible directory that is mounted at `storage_root`
    pub host_dir: PathBuf,
    /// Mount point of `host_dir` inside the provisioner
    pub storage_root: PathBuf,
}

impl ProvisionerConfig {
    /// Create a configuration using the default storage root
    pub fn new(provisioner_name: impl Into<String>, host_dir: impl Into<PathBuf>) -> Result<Self> {
        let provisioner_name = provisioner_name.into();
        let host_dir = host_dir.into();

        if provisioner_name.trim().is_empty() {
            return Err(Error::Configuration(
                "provisioner name must not be empty".into(),
            ));
        }
        if host_dir.as_os_str().is_empty() {
            return Err(Error::Configuration("host directory must not be empty".into()));
        }

        Ok(Self {
            provisioner_name,
            host_dir,
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
        })
    }

    /// Override the storage root
    pub fn with_storage_root(mut self, storage_root: impl Into<PathBuf>) -> Self {
        self.storage_root = storage_root.into();
        self
    }

    /// Root of the archive subtree
    pub fn archive_root(&self) -> PathBuf {
        self.storage_root.join(ARCHIVE_DIR_NAME)
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}
