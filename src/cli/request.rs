//! The typed operation request produced from a command line.

use std::path::PathBuf;
use tracing::{debug, warn};

use super::tokenize::{quote, tokenize};
use crate::core::UpdaterError;

const FLAG_HELP: &str = "--help";
const FLAG_OPTIONS: &str = "-options";
const FLAG_VERBOSE: &str = "-verbose";
const FLAG_CLEAN: &str = "-clean";
const FLAG_UNZIP: &str = "-unzipTo";
const FLAG_VERSION: &str = "-v";
const FLAG_PARAM: &str = "-p";

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// What a run of the updater does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Check the version endpoint and install a newer application build.
    CheckAndUpdateApp,
    /// Edit the proxy settings.
    ShowOptions,
    /// Delete plugin folders, then relaunch the host.
    CleanOnly,
    /// Download and extract plugin archives, then relaunch the host.
    InstallOrUpdatePlugins {
        /// Back up and replace existing folders (`-unzipTo -clean`).
        replace_existing: bool,
    },
    /// Print usage.
    Help,
}

/// One requested plugin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUpdateSpec {
    /// Folder relative to the destination root.
    pub folder_name: String,
    /// Archive URL. `None` means the folder is only removed.
    pub download_url: Option<String>,
    /// Expected SHA-256 of the archive. `None` skips verification.
    pub expected_hash: Option<String>,
}

impl PluginUpdateSpec {
    /// A spec that only removes `folder_name`.
    #[must_use]
    pub fn clean(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            download_url: None,
            expected_hash: None,
        }
    }

    /// Parse `"<folder name> <url> <sha256>"`, splitting from the right so the
    /// folder name may contain spaces.
    ///
    /// The two-field form `"<folder name> <url>"` is accepted when the last field
    /// is a URL; it carries no hash. Entries with fewer fields return `None`.
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let (rest, last) = entry.rsplit_once(' ')?;

        if last.contains("://") {
            let folder = rest.trim_end();
            return (!folder.is_empty()).then(|| Self {
                folder_name: folder.to_string(),
                download_url: Some(last.to_string()),
                expected_hash: None,
            });
        }

        let (folder, url) = rest.trim_end().rsplit_once(' ')?;
        let folder = folder.trim_end();
        if folder.is_empty() || url.is_empty() {
            return None;
        }

        Some(Self {
            folder_name: folder.to_string(),
            download_url: Some(url.to_string()),
            expected_hash: Some(last.to_string()),
        })
    }

    /// False when a hash is present but is not exactly 64 hex characters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.expected_hash.as_deref().is_none_or(is_sha256_hex)
    }

    /// Command-line form of this spec.
    #[must_use]
    pub fn to_entry(&self) -> String {
        let mut entry = self.folder_name.clone();
        if let Some(url) = &self.download_url {
            entry.push(' ');
            entry.push_str(url);
        }
        if let Some(hash) = &self.expected_hash {
            entry.push(' ');
            entry.push_str(hash);
        }
        entry
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_HEX_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Everything one updater run has been asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub mode: Mode,
    /// `-v` override of the configured current version.
    pub explicit_version: Option<String>,
    /// `-p` value forwarded as `param=` to the version endpoint.
    pub custom_param: Option<String>,
    pub verbose: bool,
    /// Host executable relaunched after plugin modes.
    pub target_executable_path: Option<PathBuf>,
    /// Base plugin directory for plugin modes.
    pub destination_root: Option<PathBuf>,
    /// Plugin operations in command-line order.
    pub plugin_specs: Vec<PluginUpdateSpec>,
}

impl OperationRequest {
    /// Request for the default mode with no overrides.
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self {
            mode,
            explicit_version: None,
            custom_param: None,
            verbose: false,
            target_executable_path: None,
            destination_root: None,
            plugin_specs: Vec::new(),
        }
    }

    /// Serialize back to a command line that parses to an equal request.
    #[must_use]
    pub fn to_command_line(&self) -> String {
        let mut tokens: Vec<String> = Vec::new();

        match self.mode {
            Mode::Help => tokens.push(FLAG_HELP.to_string()),
            Mode::ShowOptions => tokens.push(FLAG_OPTIONS.to_string()),
            Mode::CleanOnly => tokens.push(FLAG_CLEAN.to_string()),
            Mode::InstallOrUpdatePlugins {
                replace_existing,
            } => {
                tokens.push(FLAG_UNZIP.to_string());
                if replace_existing {
                    tokens.push(FLAG_CLEAN.to_string());
                }
            }
            Mode::CheckAndUpdateApp => {}
        }

        if self.verbose {
            tokens.push(FLAG_VERBOSE.to_string());
        }
        if let Some(version) = &self.explicit_version {
            tokens.push(format!("{FLAG_VERSION}{version}"));
        }
        if let Some(param) = &self.custom_param {
            tokens.push(format!("{FLAG_PARAM}{param}"));
        }

        if matches!(self.mode, Mode::CleanOnly | Mode::InstallOrUpdatePlugins { .. }) {
            for path in [&self.target_executable_path, &self.destination_root] {
                tokens.push(path.as_ref().map(|p| p.display().to_string()).unwrap_or_default());
            }
            tokens.extend(self.plugin_specs.iter().map(|spec| match self.mode {
                Mode::CleanOnly => spec.folder_name.clone(),
                _ => spec.to_entry(),
            }));
        }

        tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ")
    }
}

/// Remove every token equal to `flag`, returning whether any was present.
fn take_flag(tokens: &mut Vec<String>, flag: &str) -> bool {
    let before = tokens.len();
    tokens.retain(|t| t != flag);
    tokens.len() != before
}

/// Remove every `<prefix><value>` token, returning the first value.
fn take_valued(tokens: &mut Vec<String>, prefix: &str) -> Option<String> {
    let mut value = None;
    tokens.retain(|t| match t.strip_prefix(prefix) {
        Some(rest) => {
            if value.is_none() {
                value = Some(rest.to_string());
            }
            false
        }
        None => true,
    });
    value
}

/// Parse a raw command line (without the program name) into an [`OperationRequest`].
///
/// Boolean flags are matched exactly and may appear anywhere. `-v<version>` and
/// `-p<param>` carry their value in the same token. The remaining positional
/// tokens are interpreted according to the selected mode.
///
/// # Errors
///
/// - [`UpdaterError::MalformedCommandLine`] when the line cannot be tokenized
/// - [`UpdaterError::InsufficientArguments`] when `-clean` or `-unzipTo` has fewer than
///   three positional arguments
pub fn parse_command_line(line: &str) -> Result<OperationRequest, UpdaterError> {
    let mut tokens = tokenize(line)?;

    let help = take_flag(&mut tokens, FLAG_HELP);
    let options = take_flag(&mut tokens, FLAG_OPTIONS);
    let verbose = take_flag(&mut tokens, FLAG_VERBOSE);
    let clean = take_flag(&mut tokens, FLAG_CLEAN);
    let unzip = take_flag(&mut tokens, FLAG_UNZIP);
    let explicit_version = take_valued(&mut tokens, FLAG_VERSION);
    let custom_param = take_valued(&mut tokens, FLAG_PARAM);

    let mode = if help {
        Mode::Help
    } else if unzip {
        Mode::InstallOrUpdatePlugins {
            replace_existing: clean,
        }
    } else if clean {
        Mode::CleanOnly
    } else if options {
        Mode::ShowOptions
    } else {
        Mode::CheckAndUpdateApp
    };

    let mut request = OperationRequest {
        mode,
        explicit_version,
        custom_param,
        verbose,
        ..OperationRequest::new(mode)
    };

    if !matches!(mode, Mode::CleanOnly | Mode::InstallOrUpdatePlugins { .. }) {
        if !tokens.is_empty() {
            debug!("Ignoring positional arguments: {:?}", tokens);
        }
        return Ok(request);
    }

    if tokens.len() < 3 {
        return Err(UpdaterError::InsufficientArguments {
            mode: if unzip { FLAG_UNZIP } else { FLAG_CLEAN }.to_string(),
            found: tokens.len(),
        });
    }

    let mut positional = tokens.into_iter();
    request.target_executable_path = positional.next().map(PathBuf::from);
    request.destination_root = positional.next().map(PathBuf::from);

    request.plugin_specs = if mode == Mode::CleanOnly {
        positional.map(PluginUpdateSpec::clean).collect()
    } else {
        positional
            .filter_map(|entry| {
                let spec = PluginUpdateSpec::parse(&entry);
                if spec.is_none() {
                    warn!("Discarding plugin entry with too few fields: {}", entry);
                }
                spec
            })
            .collect()
    };

    Ok(request)
}
