//! Building blocks of the update pipeline.
//!
//! Each component does one step and knows nothing about operation modes;
//! the [`orchestrator`](crate::orchestrator) sequences them.
//!
//! ```text
//! 1. Version check       VersionChecker   GET <info_url>?version=..&param=..
//!                                         └── UpdateDecision (needs update, location, hash)
//! 2. Download            Downloader       stream to a temp file
//!                                         ├── progress on every rounded-percent increase
//!                                         └── abort/pause flags polled between chunks
//! 3. Verification        ChecksumVerifier SHA-256, case-insensitive hex compare
//! 4. Backup              BackupManager    rename <dir> to <dir>.backup4RestoreInCaseOfFailed
//! 5. Deployment          ArchiveDeployer  zip extraction with self-healing directories
//!                                         ├── success: delete backup
//!                                         └── failure: delete partial output, rename backup back
//! ```
//!
//! # Safety Mechanisms
//!
//! - Downloads are written under an exclusive lock and synced before use
//! - Archives with no entries are rejected before anything is written
//! - Entries that would escape the destination directory are skipped
//! - Plugin folders must contain their loadable module or are removed
//!
//! The backup/restore pair is two renames and is not crash-safe; a leftover
//! backup is deleted as stale by the next run for the same folder.

pub mod archive;
pub mod backup;
pub mod download;
pub mod verification;
pub mod version_check;

pub use archive::{ArchiveDeployer, DeploymentOutcome};
pub use backup::BackupManager;
pub use download::{DownloadResult, Downloader};
pub use verification::ChecksumVerifier;
pub use version_check::{UpdateDecision, VersionChecker, parse_update_decision, user_agent};
