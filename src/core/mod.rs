//! Core types shared by every part of the updater.
//!
//! Currently this is the error taxonomy and the process exit statuses; see
//! [`error`] for the details.

pub mod error;

pub use error::{ErrorContext, ExitStatus, UpdaterError, user_friendly_error};
