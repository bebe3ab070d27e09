//! Error handling for Upkeep
//!
//! This module provides the error taxonomy of the updater and the user-facing
//! rendering of those errors. It follows two rules:
//! 1. **Strongly-typed errors** so that the orchestrator can branch on the failure kind
//! 2. **User-friendly messages** with a suggestion when the process exits on a fatal error
//!
//! # Error Categories
//!
//! - **Fatal / process exit**: [`UpdaterError::MalformedCommandLine`],
//!   [`UpdaterError::InsufficientArguments`], [`UpdaterError::NetworkError`],
//!   [`UpdaterError::MalformedResponse`], [`UpdaterError::DownloadFailed`],
//!   [`UpdaterError::Config`]
//! - **Recoverable / per item**: [`UpdaterError::ChecksumMismatch`],
//!   [`UpdaterError::MalformedArchive`], [`UpdaterError::MissingPluginModule`]
//! - **User declined**: never an error, see [`ExitStatus::Success`]
//!
//! Each fatal error maps onto a distinct [`ExitStatus`] via [`UpdaterError::exit_status`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use upkeep::core::{UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::NetworkError {
//!     detail: "connection refused".to_string(),
//! };
//! let status = error.exit_status();
//! user_friendly_error(anyhow::Error::from(error)).display();
//! std::process::exit(status.code());
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Process exit statuses.
///
/// `0` covers both success and every "user said no" path. Every fatal error
/// family has its own non-zero value so that the host application can tell
/// them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    ArgumentError,
    ConfigError,
    NetworkError,
    DownloadError,
    IntegrityError,
    InstallError,
    /// Ctrl-C outside a download.
    Interrupted,
}

impl ExitStatus {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ArgumentError => 2,
            Self::ConfigError => 3,
            Self::NetworkError => 4,
            Self::DownloadError => 5,
            Self::IntegrityError => 6,
            Self::InstallError => 7,
            Self::Interrupted => 130,
        }
    }
}

/// The main error type for updater operations.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The command line could not be interpreted.
    #[error("Malformed command line: {reason}")]
    MalformedCommandLine {
        /// What was wrong with it
        reason: String,
    },

    /// A plugin mode was requested without executable, destination root and at least one item.
    #[error("Not enough arguments for {mode}: expected at least 3 positional arguments, found {found}")]
    InsufficientArguments {
        /// The flag that selected the mode (`-clean` or `-unzipTo`)
        mode: String,
        /// Number of positional arguments present
        found: usize,
    },

    /// Transport failure while talking to the version endpoint.
    #[error("Network error: {detail}")]
    NetworkError {
        /// Transport error text
        detail: String,
    },

    /// The version endpoint answered with something that is not an update decision.
    #[error("Malformed version-check response: {reason}")]
    MalformedResponse {
        /// What was missing or invalid
        reason: String,
    },

    /// A field carried a value outside its allowed set.
    #[error("Invalid value for {field}: {value}")]
    InvalidFlagValue {
        /// Field name
        field: String,
        /// Offending value
        value: String,
    },

    /// A download ended with a transport error.
    #[error("Failed to download {url}: {detail}")]
    DownloadFailed {
        /// Source URL
        url: String,
        /// Transport error text
        detail: String,
    },

    /// A downloaded file does not match its expected SHA-256 digest.
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Downloaded file
        file: String,
        /// Digest supplied by the caller
        expected: String,
        /// Digest of the file on disk
        actual: String,
    },

    /// The archive has no entries or cannot be read as a zip archive.
    #[error("Malformed archive: {path}")]
    MalformedArchive {
        /// Archive path
        path: String,
    },

    /// The extracted plugin folder does not contain its loadable module.
    #[error("Plugin module '{expected}' not found after extraction")]
    MissingPluginModule {
        /// Expected module path
        expected: String,
    },

    /// A filesystem operation failed.
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// The operation that failed
        operation: String,
        /// The path involved
        path: String,
    },

    /// Finding, closing or launching a process failed.
    #[error("Process error: {operation}: {reason}")]
    ProcessError {
        /// The operation that failed
        operation: String,
        /// Why it failed
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl UpdaterError {
    /// The process exit status used when this error terminates the run.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        match self {
            Self::MalformedCommandLine { .. } | Self::InsufficientArguments { .. } => {
                ExitStatus::ArgumentError
            }
            Self::Config(_) => ExitStatus::ConfigError,
            Self::NetworkError { .. }
            | Self::MalformedResponse { .. }
            | Self::InvalidFlagValue { .. } => ExitStatus::NetworkError,
            Self::DownloadFailed { .. } => ExitStatus::DownloadError,
            Self::ChecksumMismatch { .. } => ExitStatus::IntegrityError,
            Self::MalformedArchive { .. }
            | Self::MissingPluginModule { .. }
            | Self::FileSystemError { .. }
            | Self::ProcessError { .. }
            | Self::IoError(_)
            | Self::Other { .. } => ExitStatus::InstallError,
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Pairs an [`UpdaterError`] with optional details and a suggestion for the
/// terminal rendering produced by [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }

    /// Exit status of the wrapped error.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        self.error.exit_status()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly format with contextual suggestions.
///
/// Walks the error chain looking for an [`UpdaterError`] or a [`ConfigError`];
/// anything else becomes [`UpdaterError::Other`] carrying the full chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(updater_error) = cause.downcast_ref::<UpdaterError>() {
            return create_error_context(updater_error);
        }
        if let Some(config_error) = cause.downcast_ref::<ConfigError>() {
            return create_error_context(&UpdaterError::Config(config_error.clone()));
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(UpdaterError::FileSystemError {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
        })
        .with_suggestion("Run the updater with permission to write to the installation directory");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(UpdaterError::Other {
        message,
    })
}

fn create_error_context(error: &UpdaterError) -> ErrorContext {
    let context = ErrorContext::new(clone_error(error));
    match error {
        UpdaterError::MalformedCommandLine { .. } | UpdaterError::InsufficientArguments { .. } => {
            context.with_suggestion("Run with --help to see the accepted command lines")
        }
        UpdaterError::NetworkError { .. } => context
            .with_suggestion("Check your internet connection, or configure a proxy with -options")
            .with_details("The version information endpoint could not be reached"),
        UpdaterError::MalformedResponse { .. } | UpdaterError::InvalidFlagValue { .. } => context
            .with_details("The version endpoint must answer with a <GUP> document containing NeedToBeUpdated"),
        UpdaterError::DownloadFailed { .. } => context
            .with_suggestion("Check your internet connection, or configure a proxy with -options"),
        UpdaterError::ChecksumMismatch { .. } => context
            .with_details("The downloaded file was deleted because its SHA-256 digest did not match"),
        UpdaterError::Config(_) => context
            .with_suggestion("Check updater.toml next to the updater executable, or set UPKEEP_CONFIG_DIR"),
        _ => context,
    }
}

// UpdaterError holds io::Error, which is not Clone.
fn clone_error(error: &UpdaterError) -> UpdaterError {
    match error {
        UpdaterError::MalformedCommandLine {
            reason,
        } => UpdaterError::MalformedCommandLine {
            reason: reason.clone(),
        },
        UpdaterError::InsufficientArguments {
            mode,
            found,
        } => UpdaterError::InsufficientArguments {
            mode: mode.clone(),
            found: *found,
        },
        UpdaterError::NetworkError {
            detail,
        } => UpdaterError::NetworkError {
            detail: detail.clone(),
        },
        UpdaterError::MalformedResponse {
            reason,
        } => UpdaterError::MalformedResponse {
            reason: reason.clone(),
        },
        UpdaterError::InvalidFlagValue {
            field,
            value,
        } => UpdaterError::InvalidFlagValue {
            field: field.clone(),
            value: value.clone(),
        },
        UpdaterError::DownloadFailed {
            url,
            detail,
        } => UpdaterError::DownloadFailed {
            url: url.clone(),
            detail: detail.clone(),
        },
        UpdaterError::ChecksumMismatch {
            file,
            expected,
            actual,
        } => UpdaterError::ChecksumMismatch {
            file: file.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        },
        UpdaterError::MalformedArchive {
            path,
        } => UpdaterError::MalformedArchive {
            path: path.clone(),
        },
        UpdaterError::MissingPluginModule {
            expected,
        } => UpdaterError::MissingPluginModule {
            expected: expected.clone(),
        },
        UpdaterError::FileSystemError {
            operation,
            path,
        } => UpdaterError::FileSystemError {
            operation: operation.clone(),
            path: path.clone(),
        },
        UpdaterError::ProcessError {
            operation,
            reason,
        } => UpdaterError::ProcessError {
            operation: operation.clone(),
            reason: reason.clone(),
        },
        UpdaterError::Config(e) => UpdaterError::Config(e.clone()),
        UpdaterError::IoError(e) => UpdaterError::Other {
            message: format!("IO error: {e}"),
        },
        UpdaterError::Other {
            message,
        } => UpdaterError::Other {
            message: message.clone(),
        },
    }
}
