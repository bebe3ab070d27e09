//! Integration test suite for Upkeep
//!
//! End-to-end tests that drive the orchestrator over real HTTP against a local
//! `wiremock` server, and the `upkeep` binary through `assert_cmd`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **app_update**: version check, prompt answers, installer download and launch
//! - **cli**: binary exit codes, help output and the clean mode
//! - **plugin_update**: plugin install and replace with hash checks and rollback
//! - **version_check**: query string, user agent and response parsing over HTTP

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod app_update;
mod cli;
mod plugin_update;
mod version_check;
