//! Localized message strings (`messages.toml`).
//!
//! ```toml
//! [messages]
//! MSGID_NOUPDATE = "Aucune mise à jour disponible."
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{ConfigError, read_config_file};

/// Every message the updater may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    NoUpdate,
    UpdateAvailable,
    DownloadStopped,
    CloseApp,
    AbortOrNot,
    UnzipFailed,
    DownloadFailed,
    HashMismatch,
}

impl MessageId {
    /// Key used in `messages.toml`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::NoUpdate => "MSGID_NOUPDATE",
            Self::UpdateAvailable => "MSGID_UPDATEAVAILABLE",
            Self::DownloadStopped => "MSGID_DOWNLOADSTOPPED",
            Self::CloseApp => "MSGID_CLOSEAPP",
            Self::AbortOrNot => "MSGID_ABORTORNOT",
            Self::UnzipFailed => "MSGID_UNZIPFAILED",
            Self::DownloadFailed => "MSGID_DOWNLOADFAILED",
            Self::HashMismatch => "MSGID_HASHMISMATCH",
        }
    }

    /// English literal used when no translation is available.
    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::NoUpdate => "No update is available.",
            Self::UpdateAvailable => "An update package is available, do you want to download it?",
            Self::DownloadStopped => "Download is stopped by user. Update is aborted.",
            // Prefixed with the host identifier.
            Self::CloseApp => {
                " is opened.\nUpdater will close it in order to process the installation.\nContinue?"
            }
            Self::AbortOrNot => "Do you want to abort update download?",
            Self::UnzipFailed => "Can't unzip:\nOperation not permitted or decompression failed",
            Self::DownloadFailed => "Download failed:",
            Self::HashMismatch => "The downloaded file is corrupted: its checksum does not match.",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MessagesFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

/// Translated messages with English fallbacks.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    translations: HashMap<String, String>,
}

impl Messages {
    /// Load `messages.toml`; a missing file yields the English fallbacks.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_config_file(path).await? else {
            return Ok(Self::default());
        };
        let file: MessagesFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            translations: file.messages,
        })
    }

    #[must_use]
    pub fn get(&self, id: MessageId) -> String {
        self.translations
            .get(id.key())
            .filter(|text| !text.is_empty())
            .map_or_else(|| id.fallback().to_string(), Clone::clone)
    }
}

impl FromIterator<(MessageId, String)> for Messages {
    fn from_iter<I: IntoIterator<Item = (MessageId, String)>>(iter: I) -> Self {
        Self {
            translations: iter.into_iter().map(|(id, text)| (id.key().to_string(), text)).collect(),
        }
    }
}
