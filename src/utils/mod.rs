//! Supporting utilities: filesystem operations, platform naming conventions
//! and the terminal progress bar.

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, remove_path};
pub use platform::{DownloadKind, download_target, is_windows, plugin_module_name};
pub use progress::ProgressBar;
