use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use super::UpdateOrchestrator;
use crate::cli::OperationRequest;
use crate::config::MessageId;
use crate::constants::{CLOSE_RETRY_ATTEMPTS, CLOSE_RETRY_DELAY, HOST_EXIT_POLL_INTERVAL};
use crate::core::{ExitStatus, UpdaterError};
use crate::host::UpdateAnswer;
use crate::transport::Transport;
use crate::upgrade::{ChecksumVerifier, Downloader, VersionChecker};
use crate::utils::{DownloadKind, download_target};

impl<T: Transport> UpdateOrchestrator<T> {
    /// Check for a new version of the host application and run its installer.
    pub(super) async fn app_update(&self, request: &OperationRequest) -> Result<ExitStatus> {
        let app = &self.config.app;
        let silent = self.is_silent(request);

        let version = request
            .explicit_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(&app.current_version);
        let param = request
            .custom_param
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| Some(app.param.as_str()).filter(|p| !p.is_empty()));
        let user_agent = self.user_agent(version);

        let decision = VersionChecker::new(&self.transport, user_agent.clone())
            .check(&app.info_url, version, param)
            .await?;

        if !decision.needs_update {
            info!("{} is up to date", version);
            if !silent {
                self.prompt.show_message(&self.message(MessageId::NoUpdate));
            }
            return Ok(ExitStatus::Success);
        }
        info!("Update available: {} -> {}", version, decision.version);

        let third = app.third_button();
        let text = self.message(MessageId::UpdateAvailable);
        let third_label = third.map(|command| command.button_label().to_string());
        let answer =
            self.ask(move |prompt| prompt.ask_update(&text, third_label.as_deref())).await?;
        match answer {
            UpdateAnswer::Yes => {}
            UpdateAnswer::No => {
                debug!("Update declined");
                return Ok(ExitStatus::Success);
            }
            UpdateAnswer::Third => {
                if let (Some(host), Some(command)) = (app.host_identifier.as_deref(), third)
                    && self.is_host_running(host).await?
                {
                    let (target, command) = (host.to_string(), command.clone());
                    if let Err(e) =
                        self.query_process(move |process| process.notify(&target, &command)).await?
                    {
                        warn!("Could not notify {}: {:#}", host, e);
                    }
                }
                return Ok(ExitStatus::Success);
            }
        }

        let installer =
            download_target(&self.temp_dir, &decision.download_location, DownloadKind::Installer);
        self.session.reset();
        let download = Downloader::new(&self.transport)
            .user_agent(user_agent)
            .fetch(&decision.download_location, &installer, &self.session, self.progress.as_ref())
            .await;

        if download.was_cancelled_by_user {
            self.remove_temp(&installer).await;
            self.prompt.show_message(&self.message(MessageId::DownloadStopped));
            return Ok(ExitStatus::DownloadError);
        }
        if !download.succeeded {
            self.remove_temp(&installer).await;
            return Err(UpdaterError::DownloadFailed {
                url: decision.download_location.clone(),
                detail: download.error.unwrap_or_default(),
            }
            .into());
        }

        if let Some(expected) = decision.expected_hash.as_deref() {
            let (matches, actual) = ChecksumVerifier::verify_file(&installer, Some(expected)).await?;
            if !matches {
                self.remove_temp(&installer).await;
                return Err(UpdaterError::ChecksumMismatch {
                    file: installer.display().to_string(),
                    expected: expected.to_string(),
                    actual,
                }
                .into());
            }
        }

        if let Some(host) = app.host_identifier.as_deref()
            && self.is_host_running(host).await?
        {
            if silent {
                self.wait_for_exit(host).await?;
            } else {
                let text = format!("{host}{}", self.message(MessageId::CloseApp));
                if !self.ask(move |prompt| prompt.confirm(&text)).await? {
                    debug!("User kept {} open; installer not started", host);
                    return Ok(ExitStatus::Success);
                }
                self.close_host(host).await?;
            }
        }

        self.launch_installer(&installer, silent)?;
        Ok(ExitStatus::Success)
    }

    /// Ask the host to exit, retrying while it is still running.
    async fn close_host(&self, host: &str) -> Result<()> {
        for attempt in 1..=CLOSE_RETRY_ATTEMPTS {
            if !self.is_host_running(host).await? {
                return Ok(());
            }
            debug!("Closing {} (attempt {}/{})", host, attempt, CLOSE_RETRY_ATTEMPTS);
            let target = host.to_string();
            if let Err(e) = self.query_process(move |process| process.request_close(&target)).await? {
                warn!("Close request to {} failed: {:#}", host, e);
            }
            tokio::time::sleep(CLOSE_RETRY_DELAY).await;
        }

        if self.is_host_running(host).await? {
            return Err(UpdaterError::ProcessError {
                operation: format!("close {host}"),
                reason: format!("still running after {CLOSE_RETRY_ATTEMPTS} attempts"),
            }
            .into());
        }
        Ok(())
    }

    /// Silent updates never close the host; they wait for it to go away.
    async fn wait_for_exit(&self, host: &str) -> Result<()> {
        info!("Waiting for {} to exit", host);
        while self.is_host_running(host).await? {
            tokio::time::sleep(HOST_EXIT_POLL_INTERVAL).await;
        }
        Ok(())
    }

    fn launch_installer(&self, installer: &Path, silent: bool) -> Result<()> {
        let app = &self.config.app;
        let args = if silent {
            &app.silent_installer_args
        } else {
            &app.installer_args
        };
        let args: Vec<String> = args.split_whitespace().map(str::to_string).collect();

        info!("Launching {} {:?}", installer.display(), args);
        self.process.launch(installer, &args, !silent)
    }
}
