//! Reclaim Actions
//!
//! Filesystem side of releasing a volume once its policy is known.

use crate::domain::ports::ReclaimPolicy;
use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Mode for parent directories created inside the archive subtree
const ARCHIVE_DIR_MODE: u32 = 0o755;

/// Apply `policy` to the volume directory at `path`.
///
/// `archive_path` is where the directory ends up under [`ReclaimPolicy::Archive`].
pub async fn reclaim(policy: ReclaimPolicy, path: &Path, archive_path: &Path) -> Result<()> {
    match policy {
        ReclaimPolicy::Delete => fs::remove_dir_all(path)
            .await
            .map_err(|e| Error::io("remove", path, e)),
        ReclaimPolicy::Retain => Ok(()),
        ReclaimPolicy::Archive => archive(path, archive_path).await,
    }
}

async fn archive(path: &Path, archive_path: &Path) -> Result<()> {
    // Existing parents keep their mode; only missing ones get ARCHIVE_DIR_MODE.
    if let Some(parent) = archive_path.parent() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true).mode(ARCHIVE_DIR_MODE);
        builder
            .create(parent)
            .await
            .map_err(|e| Error::io("create archive directory", parent, e))?;
    }

    debug!(
        from = %path.display(),
        to = %archive_path.display(),
        "Archiving volume directory"
    );
    fs::rename(path, archive_path)
        .await
        .map_err(|e| Error::io("archive", path, e))
}
