//! Configuration management for Upkeep.
//!
//! Three TOML files live side by side in the configuration directory:
//!
//! | File            | Type                | Required                          |
//! |-----------------|---------------------|-----------------------------------|
//! | `updater.toml`  | [`AppParameters`]   | for app updates and `-options`    |
//! | `options.toml`  | [`ProxySettings`]   | never (absent means no proxy)     |
//! | `messages.toml` | [`Messages`]        | never (English fallback literals) |
//!
//! # Configuration Directory
//!
//! Resolved in this order:
//! 1. `UPKEEP_CONFIG_DIR` environment variable
//! 2. The directory containing the running executable, when it holds `updater.toml`
//! 3. `<platform config dir>/upkeep` (e.g. `~/.config/upkeep`)
//!
//! # Example `updater.toml`
//!
//! ```toml
//! current_version = "8.6.2"
//! info_url = "https://example.org/update/getDownloadUrl.php"
//! host_identifier = "notepad++"
//! message_box_title = "Notepad++ updater"
//! silent_mode = "no"
//! software_name = "Notepad++"
//!
//! [extra_command]
//! code = 1
//! label = "Never"
//! ```
//!
//! Loading is fallible with a typed [`ConfigError`]; nothing in this module
//! panics on bad input.

pub mod app;
pub mod messages;
pub mod proxy;

pub use app::{AppParameters, ExtraCommand};
pub use messages::{MessageId, Messages};
pub use proxy::ProxySettings;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::CONFIG_DIR_ENV;

/// Application parameters file name.
pub const APP_CONFIG_FILE: &str = "updater.toml";
/// Proxy options file name.
pub const OPTIONS_FILE: &str = "options.toml";
/// Localized messages file name.
pub const MESSAGES_FILE: &str = "messages.toml";

/// Errors raised while loading configuration files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Missing file
        path: String,
    },

    /// A configuration file is not valid TOML or has the wrong shape.
    #[error("Invalid configuration file {path}: {reason}")]
    Parse {
        /// Offending file
        path: String,
        /// Parser message
        reason: String,
    },

    /// A required field is absent or empty.
    #[error("Missing required configuration field: {field}")]
    MissingField {
        /// Field name
        field: String,
    },

    /// A field holds a value outside its allowed set.
    #[error("Invalid value '{value}' for {field} (only \"yes\" or \"no\" is allowed)")]
    InvalidEnumValue {
        /// Field name
        field: String,
        /// Offending value
        value: String,
    },

    /// A configuration file exists but cannot be read.
    #[error("Failed to read configuration file {path}: {reason}")]
    Unreadable {
        /// Offending file
        path: String,
        /// IO error text
        reason: String,
    },
}

/// Everything read from the configuration directory.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Directory the files were read from
    pub dir: PathBuf,
    /// `updater.toml`
    pub app: AppParameters,
    /// `options.toml`
    pub proxy: ProxySettings,
    /// `messages.toml`
    pub messages: Messages,
}

impl UpdaterConfig {
    /// Load all files, requiring `updater.toml` to exist and be valid.
    ///
    /// Used by the app-update and options modes, where a missing info URL is fatal.
    pub async fn load(dir: &Path) -> Result<Self, ConfigError> {
        let app = AppParameters::load(&dir.join(APP_CONFIG_FILE)).await?;
        let proxy = ProxySettings::load(&dir.join(OPTIONS_FILE)).await?;
        let messages = Messages::load(&dir.join(MESSAGES_FILE)).await?;

        debug!("Loaded configuration from {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            app,
            proxy,
            messages,
        })
    }

    /// Load whatever is present, falling back to defaults file by file.
    ///
    /// Plugin modes only need the proxy, the message box title and messages,
    /// so they never fail on configuration.
    pub async fn load_lenient(dir: &Path) -> Self {
        let app = match AppParameters::load(&dir.join(APP_CONFIG_FILE)).await {
            Ok(app) => app,
            Err(e) => {
                debug!("Using default application parameters: {}", e);
                AppParameters::default()
            }
        };
        let proxy = ProxySettings::load(&dir.join(OPTIONS_FILE)).await.unwrap_or_else(|e| {
            warn!("Ignoring proxy settings: {}", e);
            ProxySettings::default()
        });
        let messages = Messages::load(&dir.join(MESSAGES_FILE)).await.unwrap_or_else(|e| {
            warn!("Ignoring localized messages: {}", e);
            Messages::default()
        });

        Self {
            dir: dir.to_path_buf(),
            app,
            proxy,
            messages,
        }
    }

    /// Path the options prompt writes proxy settings back to.
    #[must_use]
    pub fn options_path(&self) -> PathBuf {
        self.dir.join(OPTIONS_FILE)
    }

    /// Resolve the configuration directory.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }

        let exe_dir = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf));
        if let Some(dir) = &exe_dir
            && dir.join(APP_CONFIG_FILE).exists()
        {
            return dir.clone();
        }

        dirs::config_dir()
            .map(|dir| dir.join("upkeep"))
            .or(exe_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Read a configuration file, mapping IO failures onto [`ConfigError`].
pub(crate) async fn read_config_file(path: &Path) -> Result<Option<String>, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}
