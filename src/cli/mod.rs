//! Command-line interface for Upkeep.
//!
//! The updater is started by its host application with a fixed single-dash
//! grammar, so the command line is parsed by hand rather than with a derive
//! parser:
//!
//! ```bash
//! upkeep --help
//! upkeep -options
//! upkeep [-verbose] [-v<version>] [-p<customParam>]
//! upkeep -clean <exePath> <destRoot> <folder1> <folder2> ...
//! upkeep -unzipTo [-clean] <exePath> <destRoot> "<folder> <url> <sha256>" ...
//! ```
//!
//! | Flags present            | Mode                                         |
//! |--------------------------|----------------------------------------------|
//! | `--help`                 | [`Mode::Help`] (wins over everything)        |
//! | `-unzipTo -clean`        | [`Mode::InstallOrUpdatePlugins`], replacing  |
//! | `-unzipTo`               | [`Mode::InstallOrUpdatePlugins`], fresh      |
//! | `-clean`                 | [`Mode::CleanOnly`]                          |
//! | `-options`               | [`Mode::ShowOptions`]                        |
//! | none                     | [`Mode::CheckAndUpdateApp`]                  |
//!
//! Parsing is a pure function: [`tokenize`] splits the raw line, and
//! [`parse_command_line`] builds an immutable [`OperationRequest`].

mod request;
mod tokenize;

pub use request::{Mode, OperationRequest, PluginUpdateSpec, SHA256_HEX_LEN, parse_command_line};
pub use tokenize::{join_args, quote, tokenize};

/// Help text printed by `--help`.
pub const USAGE: &str = "\
Usage:

upkeep --help
upkeep -options
upkeep [-verbose] [-vVERSION_VALUE] [-pCUSTOM_PARAM]
upkeep -clean EXE_PATH DEST_ROOT FOLDER...
upkeep -unzipTo [-clean] EXE_PATH DEST_ROOT \"FOLDER ZIP_URL SHA256\"...

    --help     : Show this help message (and quit program).
    -options   : Edit the proxy settings (and quit program).
    -v         : Check for updates as VERSION_VALUE.
                 VERSION_VALUE is the current version number of the program to update.
                 It overrides the version set in updater.toml.
    -p         : Pass CUSTOM_PARAM to the version endpoint as the \"param\" argument.
    -verbose   : Show error and warning messages even in silent mode.
    -clean     : Delete each FOLDER under DEST_ROOT, then relaunch EXE_PATH.
                 Combined with -unzipTo, replace existing folders with rollback on failure.
    -unzipTo   : Download each ZIP_URL, verify it against SHA256 and unzip it into
                 DEST_ROOT/FOLDER, then relaunch EXE_PATH.
";
