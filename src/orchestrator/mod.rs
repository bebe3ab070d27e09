//! The state machine driving one updater run.
//!
//! ```text
//! Start ─► parse arguments ─┬─► Help            print usage                        ─► exit 0
//!                           ├─► ShowOptions     edit proxy, persist if accepted    ─► exit 0
//!                           ├─► CleanOnly       delete folders, relaunch host      ─► exit 0
//!                           ├─► PluginPipeline  per spec: backup, download,
//!                           │                   verify, deploy; relaunch host      ─► exit 0
//!                           └─► AppUpdate       check, prompt, download, verify,
//!                                               close host, launch installer       ─► exit code
//! ```
//!
//! Plugin specs are handled one at a time in command-line order. A failure
//! only affects its own spec; the host is relaunched once all specs have been
//! attempted.

mod app_update;
mod plugins;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cli::{Mode, OperationRequest, USAGE};
use crate::config::{MessageId, UpdaterConfig};
use crate::core::ExitStatus;
use crate::host::{
    ConsoleProgress, ConsolePrompt, ProcessController, ProgressSink, SystemProcessController,
    UserPrompt,
};
use crate::session::SessionContext;
use crate::transport::Transport;
use crate::upgrade::user_agent;

/// Sequences the pipeline components for one [`OperationRequest`].
///
/// # Examples
///
/// ```rust,no_run
/// use upkeep::cli::parse_command_line;
/// use upkeep::config::UpdaterConfig;
/// use upkeep::orchestrator::UpdateOrchestrator;
/// use upkeep::transport::ReqwestTransport;
///
/// # async fn example() -> anyhow::Result<()> {
/// let request = parse_command_line("-verbose -v8.6.2")?;
/// let config = UpdaterConfig::load(&UpdaterConfig::default_dir()).await?;
/// let transport = ReqwestTransport::new(&config.proxy)?;
///
/// let status = UpdateOrchestrator::new(config, transport).run(&request).await?;
/// std::process::exit(status.code());
/// # }
/// ```
pub struct UpdateOrchestrator<T: Transport> {
    config: UpdaterConfig,
    transport: T,
    prompt: Arc<dyn UserPrompt>,
    process: Arc<dyn ProcessController>,
    progress: Arc<dyn ProgressSink>,
    session: Arc<SessionContext>,
    temp_dir: PathBuf,
}

impl<T: Transport> UpdateOrchestrator<T> {
    /// Orchestrator wired to the console collaborators and the system temp directory.
    pub fn new(config: UpdaterConfig, transport: T) -> Self {
        let prompt = Arc::new(ConsolePrompt::new(config.app.message_box_title.clone()));
        Self {
            config,
            transport,
            prompt,
            process: Arc::new(SystemProcessController::new()),
            progress: Arc::new(ConsoleProgress::new()),
            session: Arc::new(SessionContext::new()),
            temp_dir: std::env::temp_dir(),
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn UserPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub fn with_process(mut self, process: Arc<dyn ProcessController>) -> Self {
        self.process = process;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Share the abort/pause flags with an interface task.
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = session;
        self
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionContext> {
        Arc::clone(&self.session)
    }

    /// Silent unless configured otherwise or `-verbose` was given.
    #[must_use]
    pub fn is_silent(&self, request: &OperationRequest) -> bool {
        self.config.app.silent_mode && !request.verbose
    }

    /// Run `request` to completion.
    ///
    /// Declined prompts and per-plugin failures end in [`ExitStatus::Success`].
    ///
    /// # Errors
    ///
    /// Fatal failures (network, malformed response, download, integrity, host
    /// process control) are returned for the caller to report and map onto an
    /// exit status with [`UpdaterError::exit_status`](crate::core::UpdaterError::exit_status).
    pub async fn run(&self, request: &OperationRequest) -> Result<ExitStatus> {
        debug!("Running {:?}", request.mode);
        match request.mode {
            Mode::Help => {
                println!("{USAGE}");
                Ok(ExitStatus::Success)
            }
            Mode::ShowOptions => self.show_options().await,
            Mode::CleanOnly => self.clean_only(request).await,
            Mode::InstallOrUpdatePlugins {
                replace_existing,
            } => self.plugin_pipeline(request, replace_existing).await,
            Mode::CheckAndUpdateApp => self.app_update(request).await,
        }
    }

    async fn show_options(&self) -> Result<ExitStatus> {
        let current = self.config.proxy.clone();
        match self.ask(move |prompt| prompt.edit_proxy(&current)).await? {
            Some(settings) => {
                let path = self.config.options_path();
                settings.save_to(&path).await?;
                info!("Saved proxy settings to {}", path.display());
            }
            None => debug!("Proxy settings unchanged"),
        }
        Ok(ExitStatus::Success)
    }

    async fn clean_only(&self, request: &OperationRequest) -> Result<ExitStatus> {
        let root = destination_root(request)?;

        for spec in &request.plugin_specs {
            let target = root.join(&spec.folder_name);
            info!("Removing {}", target.display());
            let path = target.clone();
            let removal = tokio::task::spawn_blocking(move || crate::utils::remove_path(&path))
                .await
                .context("Removal task panicked")?;
            if let Err(e) = removal {
                warn!("Could not remove {}: {:#}", target.display(), e);
            }
        }

        self.relaunch(request);
        Ok(ExitStatus::Success)
    }

    /// Start the host application again after a plugin mode.
    fn relaunch(&self, request: &OperationRequest) {
        let Some(exe) = &request.target_executable_path else {
            return;
        };
        info!("Relaunching {}", exe.display());
        if let Err(e) = self.process.launch(exe, &[], true) {
            warn!("Could not relaunch {}: {:#}", exe.display(), e);
        }
    }

    /// Run a prompt on the blocking pool; console prompts wait on stdin.
    async fn ask<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&dyn UserPrompt) -> R + Send + 'static,
        R: Send + 'static,
    {
        let prompt = Arc::clone(&self.prompt);
        tokio::task::spawn_blocking(move || f(prompt.as_ref())).await.context("Prompt task panicked")
    }

    /// Run a process query on the blocking pool; lookups shell out and wait.
    async fn query_process<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&dyn ProcessController) -> R + Send + 'static,
        R: Send + 'static,
    {
        let process = Arc::clone(&self.process);
        tokio::task::spawn_blocking(move || f(process.as_ref()))
            .await
            .context("Process task panicked")
    }

    async fn is_host_running(&self, host: &str) -> Result<bool> {
        let host = host.to_string();
        self.query_process(move |process| process.is_running(&host)).await
    }

    fn message(&self, id: MessageId) -> String {
        self.config.messages.get(id)
    }

    /// User agent for the configured host application and effective version.
    fn user_agent(&self, version: &str) -> String {
        user_agent(self.config.app.software_name.as_deref(), version)
    }

    async fn remove_temp(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Could not delete temporary file {}: {}", path.display(), e);
        }
    }
}

fn destination_root(request: &OperationRequest) -> Result<&Path> {
    request.destination_root.as_deref().ok_or_else(|| {
        let mode = if request.mode == Mode::CleanOnly { "-clean" } else { "-unzipTo" };
        crate::core::UpdaterError::InsufficientArguments {
            mode: mode.to_string(),
            found: 0,
        }
        .into()
    })
}
