//! Zip extraction into plugin folders.
//!
//! Extraction trusts neither the archive's directory flags nor the state of
//! the destination: every directory segment is re-checked after creation and
//! a file squatting on a directory path is replaced by the directory. An empty
//! file entry landing on an existing directory is read as that directory.
//! Entries whose names escape the destination are skipped.
//!
//! Extraction runs on the blocking pool and is never interrupted once started.

use anyhow::{Context, Result, anyhow};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::backup::BackupManager;
use crate::core::UpdaterError;
use crate::utils::{plugin_module_name, remove_path};

/// Result of a rollback-protected deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub succeeded: bool,
    /// A prior installation was put back after the deployment failed.
    pub rolled_back: bool,
    /// Why the deployment failed.
    pub error: Option<String>,
}

impl DeploymentOutcome {
    fn success() -> Self {
        Self {
            succeeded: true,
            rolled_back: false,
            error: None,
        }
    }
}

/// Extracts zip archives into a destination directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveDeployer {
    require_module: bool,
}

impl ArchiveDeployer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            require_module: false,
        }
    }

    /// Require `<dest base name><DLL suffix>` directly under the destination
    /// after extraction; the whole destination is deleted when it is missing.
    #[must_use]
    pub const fn require_module(mut self, require: bool) -> Self {
        self.require_module = require;
        self
    }

    /// Extract `archive` into `dest`.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::MalformedArchive`] when the file is not a zip or has no entries
    /// - [`UpdaterError::MissingPluginModule`] when the module check fails
    /// - [`UpdaterError::FileSystemError`] or IO context errors when writing fails
    pub async fn deploy(&self, archive: &Path, dest: &Path) -> Result<()> {
        let deployer = *self;
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || deployer.deploy_blocking(&archive, &dest))
            .await
            .context("Extraction task panicked")?
    }

    /// [`deploy`](Self::deploy) guarded by a backup that already exists.
    ///
    /// On failure the partial output is deleted and the backup (if `backed_up`)
    /// is renamed back; on success the backup is deleted.
    pub async fn deploy_with_backup(
        &self,
        backup: &BackupManager,
        backed_up: bool,
        archive: &Path,
        dest: &Path,
    ) -> DeploymentOutcome {
        match self.deploy(archive, dest).await {
            Ok(()) => {
                if let Err(e) = backup.cleanup_backup().await {
                    warn!("Deployment succeeded but the backup could not be removed: {:#}", e);
                }
                DeploymentOutcome::success()
            }
            Err(e) => {
                warn!("Deployment to {} failed: {:#}", dest.display(), e);
                let rolled_back = if backed_up {
                    match backup.restore_backup().await {
                        Ok(()) => true,
                        Err(restore) => {
                            warn!("Rollback of {} failed: {:#}", dest.display(), restore);
                            false
                        }
                    }
                } else {
                    let partial = dest.to_path_buf();
                    if let Ok(Err(cleanup)) =
                        tokio::task::spawn_blocking(move || remove_path(&partial)).await
                    {
                        warn!("Could not remove partial output: {:#}", cleanup);
                    }
                    false
                };
                DeploymentOutcome {
                    succeeded: false,
                    rolled_back,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }

    /// Back up `dest`, deploy, and roll back on failure.
    pub async fn deploy_with_rollback(&self, archive: &Path, dest: &Path) -> DeploymentOutcome {
        let backup = BackupManager::for_dir(dest.to_path_buf());
        let backed_up = match backup.create_backup().await {
            Ok(backed_up) => backed_up,
            Err(e) => {
                return DeploymentOutcome {
                    succeeded: false,
                    rolled_back: false,
                    error: Some(format!("{e:#}")),
                };
            }
        };
        self.deploy_with_backup(&backup, backed_up, archive, dest).await
    }

    fn deploy_blocking(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest).map_err(|_| UpdaterError::FileSystemError {
            operation: "create destination directory".to_string(),
            path: dest.display().to_string(),
        })?;

        let malformed = || UpdaterError::MalformedArchive {
            path: archive_path.display().to_string(),
        };
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            debug!("Not a zip archive: {}", e);
            malformed()
        })?;
        if archive.len() == 0 {
            return Err(malformed().into());
        }

        info!("Extracting {} entries into {}", archive.len(), dest.display());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| {
                debug!("Unreadable entry {}: {}", index, e);
                malformed()
            })?;

            let Some(relative) = entry.enclosed_name() else {
                warn!("Skipping entry outside the destination: {}", entry.name());
                continue;
            };
            let segments = normal_segments(&relative);
            if segments.is_empty() {
                continue;
            }

            if entry.is_dir() {
                ensure_dir_segments(dest, &segments)?;
                continue;
            }

            let parent = ensure_dir_segments(dest, &segments[..segments.len() - 1])?;
            let target = parent.join(segments[segments.len() - 1]);
            // Directory entry stored without its directory flag.
            if entry.size() == 0 && target.is_dir() {
                debug!("Treating empty entry {} as a directory", entry.name());
                continue;
            }
            write_entry(&mut entry, &target)?;
        }

        if self.require_module {
            check_module(dest)?;
        }
        Ok(())
    }
}

fn normal_segments(path: &Path) -> Vec<&std::ffi::OsStr> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .collect()
}

/// Create every cumulative segment below `root` as a directory, replacing
/// files that occupy a segment. Returns the deepest directory.
fn ensure_dir_segments(root: &Path, segments: &[&std::ffi::OsStr]) -> Result<PathBuf> {
    let mut current = root.to_path_buf();
    for segment in segments {
        current.push(segment);
        ensure_real_dir(&current)?;
    }
    Ok(current)
}

fn ensure_real_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    if fs::symlink_metadata(path).is_ok() {
        debug!("Replacing file with directory: {}", path.display());
        remove_path(path)?;
    }

    if let Err(e) = fs::create_dir(path)
        && e.kind() != io::ErrorKind::AlreadyExists
    {
        return Err(e).with_context(|| format!("Failed to create directory: {}", path.display()));
    }

    if path.is_dir() {
        Ok(())
    } else {
        Err(UpdaterError::FileSystemError {
            operation: "create directory".to_string(),
            path: path.display().to_string(),
        }
        .into())
    }
}

fn write_entry(entry: &mut impl io::Read, target: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    if !file.try_lock_exclusive().unwrap_or(false) {
        return Err(anyhow!(UpdaterError::FileSystemError {
            operation: "lock extracted file".to_string(),
            path: target.display().to_string(),
        }));
    }

    io::copy(entry, &mut file).with_context(|| format!("Failed to extract {}", target.display()))?;
    file.flush().with_context(|| format!("Failed to flush {}", target.display()))?;
    Ok(())
}

fn check_module(dest: &Path) -> Result<()> {
    let module = plugin_module_name(dest).map(|name| dest.join(name));
    if module.as_deref().is_some_and(Path::is_file) {
        return Ok(());
    }

    let expected = module.map_or_else(|| dest.display().to_string(), |m| m.display().to_string());
    warn!("Plugin module {} missing, removing {}", expected, dest.display());
    remove_path(dest)?;
    Err(UpdaterError::MissingPluginModule {
        expected,
    }
    .into())
}
