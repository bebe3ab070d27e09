//! Test utilities for Upkeep
//!
//! In-memory stand-ins for every collaborator the orchestrator talks to, plus
//! helpers for building zip fixtures. Nothing in here touches the network or
//! spawns processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use upkeep::test_utils::{FakeTransport, RecordingProgress};
//! use upkeep::upgrade::Downloader;
//! use upkeep::session::SessionContext;
//!
//! # async fn example() {
//! let transport = FakeTransport::new().with_file("http://host/a.zip", vec![0u8; 4096]);
//! let progress = RecordingProgress::default();
//! let result = Downloader::new(&transport)
//!     .fetch("http://host/a.zip", "a.zip".as_ref(), &SessionContext::new(), &progress)
//!     .await;
//! assert!(result.succeeded);
//! # }
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeTransport, RecordingProcess, RecordingProgress, RecordingPrompt};
pub use fixtures::{ZipItem, build_zip, zip_bytes};

use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{AppParameters, Messages, ProxySettings, UpdaterConfig};

/// Version endpoint used by [`test_config`].
pub const TEST_INFO_URL: &str = "http://updates.test/info";

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=upkeep=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Configuration rooted at `dir` with version `1.0` and [`TEST_INFO_URL`].
///
/// Silent mode is on, as it is for a freshly installed `updater.toml`.
#[must_use]
pub fn test_config(dir: &Path) -> UpdaterConfig {
    UpdaterConfig {
        dir: dir.to_path_buf(),
        app: AppParameters {
            current_version: "1.0".to_string(),
            info_url: TEST_INFO_URL.to_string(),
            ..AppParameters::default()
        },
        proxy: ProxySettings::default(),
        messages: Messages::default(),
    }
}
