use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::constants::BACKUP_SUFFIX;

/// Rename-based backup of an installed plugin folder.
///
/// Before a folder is replaced it is renamed to
/// `<folder>.backup4RestoreInCaseOfFailed`. A failed replacement deletes
/// whatever was written and renames the backup back; a successful one deletes
/// the backup.
///
/// # Known limitation
///
/// The two renames are not atomic as a pair. A crash between them leaves the
/// backup in place; the next run for the same folder deletes it as stale.
///
/// # Examples
///
/// ```rust,no_run
/// use upkeep::upgrade::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backup = BackupManager::for_dir(PathBuf::from("/opt/app/plugins/Foo"));
///
/// backup.create_backup().await?;
/// // ... extract the new version ...
/// let extraction_failed = false;
/// if extraction_failed {
///     backup.restore_backup().await?;
/// } else {
///     backup.cleanup_backup().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// Backup manager for the folder at `dir`.
    #[must_use]
    pub fn for_dir(dir: PathBuf) -> Self {
        let mut backup_path = dir.clone().into_os_string();
        backup_path.push(BACKUP_SUFFIX);

        Self {
            original_path: dir,
            backup_path: PathBuf::from(backup_path),
        }
    }

    /// Move the current installation aside.
    ///
    /// Any stale backup is deleted first. Returns `false` when there was no
    /// installation to back up.
    pub async fn create_backup(&self) -> Result<bool> {
        if self.backup_exists() {
            debug!("Removing stale backup at {}", self.backup_path.display());
            remove_any(&self.backup_path).await.context("Failed to remove stale backup")?;
        }

        if fs::symlink_metadata(&self.original_path).await.is_err() {
            debug!("Nothing to back up at {}", self.original_path.display());
            return Ok(false);
        }

        info!("Creating backup at {}", self.backup_path.display());
        rename_with_retry(&self.original_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;
        Ok(true)
    }

    /// Delete whatever occupies the original path and put the backup back.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_exists() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("Restoring from backup at {}", self.backup_path.display());

        remove_any(&self.original_path).await.context("Failed to remove partial installation")?;
        rename_with_retry(&self.backup_path, &self.original_path)
            .await
            .context("Failed to restore backup")?;

        info!("Successfully restored from backup");
        Ok(())
    }

    /// Delete the backup permanently.
    pub async fn cleanup_backup(&self) -> Result<()> {
        if self.backup_exists() {
            debug!("Cleaning up backup at {}", self.backup_path.display());
            remove_any(&self.backup_path).await.context("Failed to remove backup")?;
        }
        Ok(())
    }

    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    #[must_use]
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}

/// Remove a file or directory tree; a missing path is fine.
async fn remove_any(path: &Path) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || crate::utils::remove_path(&path))
        .await
        .context("Removal task panicked")?
}

// Renames of folders with open handles fail transiently on Windows.
async fn rename_with_retry(from: &Path, to: &Path) -> Result<()> {
    const MAX_ATTEMPTS: u32 = 3;
    let mut attempts = 0;

    loop {
        match fs::rename(from, to).await {
            Ok(()) => return Ok(()),
            Err(e) if attempts < MAX_ATTEMPTS - 1 => {
                warn!(
                    "Rename {} -> {} failed (attempt {}): {}. Retrying...",
                    from.display(),
                    to.display(),
                    attempts + 1,
                    e
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                attempts += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to rename {} to {}", from.display(), to.display())
                });
            }
        }
    }
}
