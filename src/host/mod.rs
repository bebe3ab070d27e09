//! Collaborators the update pipeline talks to but does not own.
//!
//! The orchestrator never draws anything or touches processes directly; it
//! goes through three capabilities:
//!
//! - [`ProgressSink`] receives download progress
//! - [`UserPrompt`] shows messages and collects yes/no/third-button answers
//! - [`ProcessController`] finds, closes, notifies and launches programs
//!
//! The console build wires in [`ConsoleProgress`], [`ConsolePrompt`] and
//! [`SystemProcessController`]. Tests supply recording fakes.

mod console;
mod process;

pub use console::{ConsoleProgress, ConsolePrompt};
pub use process::SystemProcessController;

use anyhow::Result;
use std::path::Path;

use crate::config::{ExtraCommand, ProxySettings};

/// Receiver of download progress.
pub trait ProgressSink: Send + Sync {
    /// Called each time the rounded completion percentage increases.
    fn on_progress(&self, percent: u8, label: &str);

    /// Called once the transfer is over, whatever its outcome.
    fn finish(&self) {}

    /// Run `f` with the display cleared so terminal output does not tear it.
    fn suspend(&self, f: &mut dyn FnMut()) {
        f();
    }
}

/// A sink that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _percent: u8, _label: &str) {}
}

/// Answer to the update-available prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAnswer {
    Yes,
    No,
    /// The configured custom action (for example "Never").
    Third,
}

/// Message boxes and questions shown to the user.
pub trait UserPrompt: Send + Sync {
    /// Informational message.
    fn show_message(&self, text: &str);

    /// Ask whether to download an update. `third_label` adds a third choice.
    fn ask_update(&self, text: &str, third_label: Option<&str>) -> UpdateAnswer;

    /// Yes/no question; `true` means yes.
    fn confirm(&self, text: &str) -> bool;

    /// Let the user edit the proxy settings. `None` means cancelled.
    fn edit_proxy(&self, current: &ProxySettings) -> Option<ProxySettings>;
}

/// Access to other processes.
pub trait ProcessController: Send + Sync {
    /// Whether a process matching `identifier` is running.
    fn is_running(&self, identifier: &str) -> bool;

    /// Ask the process matching `identifier` to exit gracefully.
    fn request_close(&self, identifier: &str) -> Result<()>;

    /// Deliver the third-button command to the running host.
    fn notify(&self, identifier: &str, command: &ExtraCommand) -> Result<()>;

    /// Start `path` without waiting for it.
    fn launch(&self, path: &Path, args: &[String], visible: bool) -> Result<()>;
}
