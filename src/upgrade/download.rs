use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::constants::PAUSE_POLL_INTERVAL;
use crate::host::ProgressSink;
use crate::session::SessionContext;
use crate::transport::{HttpRequest, Transport};

/// Outcome of one download.
///
/// A cancelled transfer is reported distinctly from a failed one so callers
/// can show "download stopped" instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub local_path: PathBuf,
    pub succeeded: bool,
    pub was_cancelled_by_user: bool,
    /// Transport or filesystem error text for failed transfers.
    pub error: Option<String>,
}

impl DownloadResult {
    fn success(local_path: PathBuf) -> Self {
        Self {
            local_path,
            succeeded: true,
            was_cancelled_by_user: false,
            error: None,
        }
    }

    fn cancelled(local_path: PathBuf) -> Self {
        Self {
            local_path,
            succeeded: false,
            was_cancelled_by_user: true,
            error: None,
        }
    }

    fn failed(local_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            local_path,
            succeeded: false,
            was_cancelled_by_user: false,
            error: Some(error.into()),
        }
    }
}

/// Streams a remote file to disk with progress reporting and cooperative
/// cancellation.
///
/// Between chunks the transfer checks the session's abort flag and waits
/// while its pause flag is set. Progress is reported only when the rounded
/// percentage grows.
pub struct Downloader<'a, T: Transport> {
    transport: &'a T,
    user_agent: Option<String>,
}

impl<'a, T: Transport> Downloader<'a, T> {
    #[must_use]
    pub const fn new(transport: &'a T) -> Self {
        Self {
            transport,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Download `url` into `dest`.
    ///
    /// On success the file has been flushed, synced and closed before this
    /// returns. A cancelled or failed transfer leaves its partial output in place.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        session: &SessionContext,
        progress: &dyn ProgressSink,
    ) -> DownloadResult {
        info!("Downloading {} to {}", url, dest.display());
        let _transfer = session.begin_transfer();
        let result = self.transfer(url, dest, session, progress).await;
        progress.finish();

        match result {
            Ok(Transfer::Complete) => DownloadResult::success(dest.to_path_buf()),
            Ok(Transfer::Cancelled) => {
                info!("Download of {} stopped by user", url);
                DownloadResult::cancelled(dest.to_path_buf())
            }
            Err(e) => {
                warn!("Download of {} failed: {:#}", url, e);
                DownloadResult::failed(dest.to_path_buf(), format!("{e:#}"))
            }
        }
    }

    async fn transfer(
        &self,
        url: &str,
        dest: &Path,
        session: &SessionContext,
        progress: &dyn ProgressSink,
    ) -> Result<Transfer> {
        let mut file = open_exclusive(dest)?;

        let mut request = HttpRequest::get(url);
        if let Some(agent) = &self.user_agent {
            request = request.user_agent(agent.clone());
        }
        let stream = self.transport.get_stream(&request).await?;
        let total = stream.total.filter(|t| *t > 0);
        let mut body = stream.body;

        let label = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let mut received: u64 = 0;
        let mut last_percent: u8 = 0;

        loop {
            if hold_while_paused(session).await {
                return Ok(Transfer::Cancelled);
            }

            let chunk = tokio::select! {
                chunk = body.next() => chunk,
                () = wait_for_abort(session) => return Ok(Transfer::Cancelled),
            };

            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk?;

            // Either flag may have been raised while the chunk was in flight.
            if hold_while_paused(session).await {
                return Ok(Transfer::Cancelled);
            }

            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            received += chunk.len() as u64;

            if let Some(total) = total {
                let percent = rounded_percent(received, total);
                if percent > last_percent {
                    last_percent = percent;
                    progress.on_progress(percent, &label);
                }
            }
        }

        if total.is_none() && last_percent < 100 {
            progress.on_progress(100, &label);
        }

        file.flush().await.with_context(|| format!("Failed to flush {}", dest.display()))?;
        file.sync_all().await.with_context(|| format!("Failed to sync {}", dest.display()))?;
        drop(file);

        debug!("Downloaded {} bytes to {}", received, dest.display());
        Ok(Transfer::Complete)
    }
}

enum Transfer {
    Complete,
    Cancelled,
}

fn rounded_percent(received: u64, total: u64) -> u8 {
    let percent = (received.saturating_mul(100) + total / 2) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Wait out a pause. Returns `true` when the transfer should stop.
async fn hold_while_paused(session: &SessionContext) -> bool {
    while session.is_paused() && !session.is_abort_requested() {
        tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
    }
    session.is_abort_requested()
}

async fn wait_for_abort(session: &SessionContext) {
    while !session.is_abort_requested() {
        tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
    }
}

fn open_exclusive(dest: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        crate::utils::ensure_dir(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    if !file.try_lock_exclusive().unwrap_or(false) {
        anyhow::bail!("{} is in use by another process", dest.display());
    }
    Ok(tokio::fs::File::from_std(file))
}
