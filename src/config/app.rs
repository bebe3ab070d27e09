//! Application parameters (`updater.toml`).
//!
//! The file is first deserialized into a permissive raw shape and then
//! validated into [`AppParameters`], so that every problem surfaces as a
//! precise [`ConfigError`] instead of a serde message.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ConfigError, read_config_file};

/// A `"yes"`/`"no"` flag that also accepts a TOML boolean.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
enum YesNo {
    Bool(bool),
    Text(String),
}

impl YesNo {
    fn resolve(&self, field: &str) -> Result<bool, ConfigError> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Text(text) if text.eq_ignore_ascii_case("yes") => Ok(true),
            Self::Text(text) if text.eq_ignore_ascii_case("no") => Ok(false),
            Self::Text(text) => Err(ConfigError::InvalidEnumValue {
                field: field.to_string(),
                value: text.clone(),
            }),
        }
    }
}

/// Command sent to the running host when the user picks the third prompt button.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExtraCommand {
    /// Command code; `0` disables the third button.
    #[serde(default)]
    pub code: u32,
    /// First command argument.
    #[serde(default)]
    pub wparam: u64,
    /// Second command argument.
    #[serde(default)]
    pub lparam: i64,
    /// Button label. Defaults to "Never".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExtraCommand {
    /// Label shown on the third button.
    #[must_use]
    pub fn button_label(&self) -> &str {
        self.label.as_deref().filter(|l| !l.is_empty()).unwrap_or("Never")
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAppParameters {
    current_version: Option<String>,
    param: Option<String>,
    info_url: Option<String>,
    host_identifier: Option<String>,
    message_box_title: Option<String>,
    modal: Option<YesNo>,
    silent_mode: Option<YesNo>,
    software_name: Option<String>,
    software_icon: Option<String>,
    extra_command: Option<ExtraCommand>,
    installer_args: Option<String>,
    silent_installer_args: Option<String>,
}

/// Validated application parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppParameters {
    /// Version of the installed application, sent as `version=`.
    pub current_version: String,
    /// Default custom parameter, sent as `param=` unless overridden.
    pub param: String,
    /// Version-check endpoint.
    pub info_url: String,
    /// Process or window identifier of the running host application.
    pub host_identifier: Option<String>,
    /// Title used for every message shown to the user.
    pub message_box_title: String,
    /// Whether prompts block the host application.
    pub modal: bool,
    /// Suppress every non-fatal prompt and message.
    pub silent_mode: bool,
    /// Host application name used in the user agent.
    pub software_name: Option<String>,
    /// Icon shown next to prompts.
    pub software_icon: Option<String>,
    /// Third prompt button configuration.
    pub extra_command: Option<ExtraCommand>,
    /// Arguments passed to an interactively launched installer.
    pub installer_args: String,
    /// Arguments passed to an installer launched in silent mode.
    pub silent_installer_args: String,
}

impl Default for AppParameters {
    fn default() -> Self {
        Self {
            current_version: String::new(),
            param: String::new(),
            info_url: String::new(),
            host_identifier: None,
            message_box_title: "Upkeep".to_string(),
            modal: false,
            silent_mode: true,
            software_name: None,
            software_icon: None,
            extra_command: None,
            installer_args: String::new(),
            silent_installer_args: "/S".to_string(),
        }
    }
}

impl AppParameters {
    /// Load and validate `updater.toml`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::FileNotFound`] when the file is absent
    /// - [`ConfigError::Parse`] when it is not valid TOML
    /// - [`ConfigError::MissingField`] when `info_url` is absent or empty
    /// - [`ConfigError::InvalidEnumValue`] when `modal` or `silent_mode` is not yes/no
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_config_file(path).await?.ok_or_else(|| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse {
                reason, ..
            } => ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate the contents of `updater.toml`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawAppParameters = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: super::APP_CONFIG_FILE.to_string(),
            reason: e.to_string(),
        })?;
        Self::validate(raw)
    }

    fn validate(raw: RawAppParameters) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let info_url = raw.info_url.map(|u| u.trim().to_string()).unwrap_or_default();
        if info_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "info_url".to_string(),
            });
        }

        let modal = match &raw.modal {
            Some(flag) => flag.resolve("modal")?,
            None => defaults.modal,
        };
        let silent_mode = match &raw.silent_mode {
            Some(flag) => flag.resolve("silent_mode")?,
            None => defaults.silent_mode,
        };

        Ok(Self {
            current_version: raw.current_version.unwrap_or_default(),
            param: raw.param.unwrap_or_default(),
            info_url,
            host_identifier: raw.host_identifier.filter(|s| !s.is_empty()),
            message_box_title: raw
                .message_box_title
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.message_box_title),
            modal,
            silent_mode,
            software_name: raw.software_name.filter(|s| !s.is_empty()),
            software_icon: raw.software_icon.filter(|s| !s.is_empty()),
            extra_command: raw.extra_command,
            installer_args: raw.installer_args.unwrap_or(defaults.installer_args),
            silent_installer_args: raw
                .silent_installer_args
                .unwrap_or(defaults.silent_installer_args),
        })
    }

    /// The third prompt button, if one is configured.
    #[must_use]
    pub fn third_button(&self) -> Option<&ExtraCommand> {
        self.extra_command.as_ref().filter(|cmd| cmd.code != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let params = AppParameters::from_toml("info_url = \"https://example.org/check\"").unwrap();
        assert_eq!(params.info_url, "https://example.org/check");
        assert!(params.silent_mode);
        assert!(!params.modal);
        assert!(params.third_button().is_none());
    }

    #[test]
    fn test_missing_info_url() {
        let err = AppParameters::from_toml("current_version = \"1.0\"").unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                field: "info_url".to_string()
            }
        );

        let err = AppParameters::from_toml("info_url = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_yes_no_values() {
        let params = AppParameters::from_toml(
            "info_url = \"u\"\nsilent_mode = \"NO\"\nmodal = \"Yes\"",
        )
        .unwrap();
        assert!(!params.silent_mode);
        assert!(params.modal);

        let params = AppParameters::from_toml("info_url = \"u\"\nsilent_mode = false").unwrap();
        assert!(!params.silent_mode);

        let err = AppParameters::from_toml("info_url = \"u\"\nsilent_mode = \"maybe\"").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnumValue {
                field: "silent_mode".to_string(),
                value: "maybe".to_string()
            }
        );
    }

    #[test]
    fn test_third_button() {
        let params = AppParameters::from_toml(
            "info_url = \"u\"\n[extra_command]\ncode = 1024\nwparam = 1\n",
        )
        .unwrap();
        let button = params.third_button().unwrap();
        assert_eq!(button.code, 1024);
        assert_eq!(button.button_label(), "Never");

        let params =
            AppParameters::from_toml("info_url = \"u\"\n[extra_command]\ncode = 0\n").unwrap();
        assert!(params.third_button().is_none());
    }

    #[test]
    fn test_syntax_error() {
        let err = AppParameters::from_toml("info_url = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = AppParameters::load(&temp.path().join("updater.toml")).await.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
