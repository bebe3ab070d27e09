//! Platform naming conventions.
//!
//! Loadable-module names, executable extensions and the download file names
//! derived from URLs.

use std::env::consts::{DLL_SUFFIX, EXE_EXTENSION};
use std::path::{Path, PathBuf};

use crate::constants::ARCHIVE_EXTENSION;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// File name of the loadable module a plugin folder must contain.
///
/// `Foo` becomes `Foo.dll` on Windows, `Foo.so` on Linux and `Foo.dylib` on macOS.
#[must_use]
pub fn plugin_module_name(plugin_dir: &Path) -> Option<String> {
    let base = plugin_dir.file_name()?.to_string_lossy();
    Some(format!("{base}{DLL_SUFFIX}"))
}

/// What a downloaded file is going to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// Plugin zip archive.
    Archive,
    /// Application installer.
    Installer,
}

impl DownloadKind {
    const fn extension(self) -> &'static str {
        match self {
            Self::Archive => ARCHIVE_EXTENSION,
            Self::Installer => EXE_EXTENSION,
        }
    }
}

/// File name of the last path segment of `url`, ignoring query and fragment.
#[must_use]
pub fn url_file_name(url: &str) -> Option<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let after_scheme = without_query.split_once("://").map_or(without_query, |(_, rest)| rest);
    // A bare host has no path segment to name the file after.
    let (_, path) = after_scheme.split_once('/')?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Local path a download from `url` is written to inside `temp_dir`.
///
/// The required extension is appended when the URL's own file name carries a
/// different one. Platforms without an executable extension leave installer
/// names untouched.
#[must_use]
pub fn download_target(temp_dir: &Path, url: &str, kind: DownloadKind) -> PathBuf {
    let name = url_file_name(url).unwrap_or(match kind {
        DownloadKind::Archive => "plugin",
        DownloadKind::Installer => "installer",
    });

    let wanted = kind.extension();
    let current = Path::new(name).extension().and_then(|e| e.to_str()).unwrap_or("");
    if wanted.is_empty() || current.eq_ignore_ascii_case(wanted) {
        temp_dir.join(name)
    } else {
        temp_dir.join(format!("{name}.{wanted}"))
    }
}
