//! Proxy settings (`options.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::{ConfigError, read_config_file};
use crate::utils::fs::atomic_write;

/// HTTP proxy used for both the version check and downloads.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy host name or address. Empty means no proxy.
    #[serde(default)]
    pub server: String,
    /// Proxy port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct OptionsFile {
    #[serde(default)]
    proxy: ProxySettings,
}

impl ProxySettings {
    #[must_use]
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port: Some(port),
        }
    }

    /// True when both a server and a port are configured.
    #[must_use]
    pub fn has_proxy(&self) -> bool {
        !self.server.trim().is_empty() && self.port.is_some()
    }

    /// Proxy URL for the HTTP client, `None` when no proxy is configured.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        if !self.has_proxy() {
            return None;
        }
        let server = self.server.trim();
        let port = self.port?;
        if server.contains("://") {
            Some(format!("{server}:{port}"))
        } else {
            Some(format!("http://{server}:{port}"))
        }
    }

    /// Load `options.toml`; a missing file means no proxy.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_config_file(path).await? else {
            debug!("No proxy options at {}", path.display());
            return Ok(Self::default());
        };

        let file: OptionsFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(file.proxy)
    }

    /// Persist these settings to `options.toml`.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&OptionsFile {
            proxy: self.clone(),
        })
        .context("Failed to serialize proxy settings")?;

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
            .await
            .context("Proxy settings writer panicked")??;
        Ok(())
    }
}
