//! [`ProcessController`] built on the platform's process tools.
//!
//! Unix uses `pgrep`/`pkill` matched on the exact process name; Windows uses
//! `tasklist`/`taskkill` matched on the image name. The tools are located
//! with `which` so a missing tool is reported instead of panicking.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::ProcessController;
use crate::config::ExtraCommand;
use crate::core::UpdaterError;
use crate::utils::is_windows;

/// Controls processes through `pgrep`/`pkill` or `tasklist`/`taskkill`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessController;

impl SystemProcessController {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|e| {
        UpdaterError::ProcessError {
            operation: format!("locate {name}"),
            reason: e.to_string(),
        }
        .into()
    })
}

fn run_quiet(program: &Path, args: &[&str]) -> Result<std::process::Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", program.display()))
}

impl ProcessController for SystemProcessController {
    fn is_running(&self, identifier: &str) -> bool {
        let result = if is_windows() {
            let filter = format!("IMAGENAME eq {identifier}");
            tool("tasklist").and_then(|t| run_quiet(&t, &["/FI", filter.as_str(), "/NH"])).map(|out| {
                String::from_utf8_lossy(&out.stdout)
                    .to_ascii_lowercase()
                    .contains(&identifier.to_ascii_lowercase())
            })
        } else {
            tool("pgrep").and_then(|t| run_quiet(&t, &["-x", identifier])).map(|out| out.status.success())
        };

        result.unwrap_or_else(|e| {
            warn!("Cannot tell whether {} is running: {:#}", identifier, e);
            false
        })
    }

    fn request_close(&self, identifier: &str) -> Result<()> {
        debug!("Asking {} to close", identifier);
        let output = if is_windows() {
            run_quiet(&tool("taskkill")?, &["/IM", identifier])?
        } else {
            run_quiet(&tool("pkill")?, &["-TERM", "-x", identifier])?
        };

        if !output.status.success() {
            bail!(UpdaterError::ProcessError {
                operation: format!("close {identifier}"),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn notify(&self, identifier: &str, command: &ExtraCommand) -> Result<()> {
        debug!(
            "Notifying {} with command {} ({}, {})",
            identifier, command.code, command.wparam, command.lparam
        );
        if is_windows() {
            // No portable message channel to a foreign window from the console build.
            warn!("Host notification is not supported on this platform");
            return Ok(());
        }

        let output = run_quiet(&tool("pkill")?, &["-USR1", "-x", identifier])?;
        if !output.status.success() {
            bail!(UpdaterError::ProcessError {
                operation: format!("notify {identifier}"),
                reason: "no matching process".to_string(),
            });
        }
        Ok(())
    }

    fn launch(&self, path: &Path, args: &[String], visible: bool) -> Result<()> {
        debug!("Launching {} {:?} (visible: {})", path.display(), args, visible);
        let mut command = Command::new(path);
        command.args(args).stdin(Stdio::null());
        if !visible {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        #[cfg(windows)]
        if !visible {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        command.spawn().map_err(|e| UpdaterError::ProcessError {
            operation: format!("launch {}", path.display()),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_process_is_not_running() {
        let controller = SystemProcessController::new();
        assert!(!controller.is_running("upkeep-no-such-process-name"));
    }

    #[test]
    fn test_launch_missing_program_fails() {
        let controller = SystemProcessController::new();
        let err = controller
            .launch(Path::new("/definitely/not/here/setup"), &[], false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdaterError>(),
            Some(UpdaterError::ProcessError { .. })
        ));
    }
}
