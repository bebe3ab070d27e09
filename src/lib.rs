//! Upkeep - self-update and plugin installation helper
//!
//! A short-lived companion process started by a desktop application. It checks a remote
//! endpoint for a newer version of the application, downloads and launches the installer,
//! or installs, updates and removes plugin folders from zip archives before relaunching
//! the application.
//!
//! # Architecture Overview
//!
//! ```text
//! command line ──► cli::parse_command_line ──► OperationRequest
//!                                                   │
//!                                                   ▼
//!                                        orchestrator::UpdateOrchestrator
//!        ┌───────────────┬──────────────────┬───────┴────────┬───────────────────┐
//!        ▼               ▼                  ▼                ▼                   ▼
//!  VersionChecker    Downloader      ChecksumVerifier  ArchiveDeployer   host collaborators
//!  (transport)     (transport, session)                 (BackupManager)  (prompt, progress,
//!                                                                          process control)
//! ```
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line tokenizer and operation request model
//! - [`config`] - `updater.toml`, `options.toml` and `messages.toml` loading
//! - [`core`] - Error types, exit statuses and user-facing error rendering
//! - [`host`] - Collaborator traits (progress, prompts, process control) and their
//!   console/system implementations
//! - [`orchestrator`] - The state machine driving each operation mode
//! - [`session`] - Per-run cooperative abort/pause flags
//! - [`transport`] - HTTP transport abstraction and the `reqwest` implementation
//! - [`upgrade`] - Version check, download, verification, backup and archive deployment
//! - [`utils`] - Filesystem, platform and progress helpers
//!
//! # Operation Modes
//!
//! ```bash
//! upkeep --help
//! upkeep -options
//! upkeep [-verbose] [-v<version>] [-p<customParam>]
//! upkeep -clean <exePath> <destRoot> <folder1> <folder2> ...
//! upkeep -unzipTo [-clean] <exePath> <destRoot> "<folder> <url> <sha256>" ...
//! ```
//!
//! Plugin specs are processed strictly in command-line order, one at a time. The host
//! application is relaunched once every spec has been attempted.

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;
pub mod orchestrator;

// Collaborators and plumbing
pub mod host;
pub mod session;
pub mod transport;

// Update pipeline building blocks
pub mod upgrade;

// Supporting modules
pub mod constants;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
