//! Global constants used throughout the Upkeep codebase.
//!
//! This module contains timeout durations, polling intervals, file naming
//! suffixes and other constants that are shared by several modules.

use std::time::Duration;

/// Product tag used as the first component of the HTTP user agent.
pub const USER_AGENT_TAG: &str = "Upkeep";

/// Numeric tool version reported in the user agent.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Suffix appended to an installed plugin folder while it is being replaced.
///
/// The name is kept verbatim so that leftovers from older updater builds are
/// recognised and cleaned up.
pub const BACKUP_SUFFIX: &str = ".backup4RestoreInCaseOfFailed";

/// Extension forced onto downloaded plugin archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Interval between polls of the pause flag while a download is suspended.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timeout applied to the version-check request (not to downloads).
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of close requests sent to a running host before giving up.
pub const CLOSE_RETRY_ATTEMPTS: u32 = 10;

/// Delay between two close requests to the running host.
pub const CLOSE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Interval between checks while waiting for the host to exit on its own.
pub const HOST_EXIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "UPKEEP_CONFIG_DIR";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV: &str = "UPKEEP_NO_PROGRESS";
