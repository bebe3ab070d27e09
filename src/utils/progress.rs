//! Terminal progress bar.
//!
//! A thin wrapper over `indicatif` with the updater's styling. The bar is
//! hidden when `UPKEEP_NO_PROGRESS` is set, so scripted runs and tests get
//! clean output.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

use crate::constants::NO_PROGRESS_ENV;

/// Checks if progress indicators are disabled through the environment.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// A percentage progress bar.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Bar counting from 0 to 100.
    #[must_use]
    pub fn new_percent() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(100);
            bar.set_style(default_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Bar that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Print a line above the bar without corrupting it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.inner.suspend(f)
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg:.bold} [{bar:40.cyan/blue}] {pos:>3}%")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
