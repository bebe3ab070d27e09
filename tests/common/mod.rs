//! Common test utilities and fixtures for Upkeep integration tests
//!
//! Builds configuration directories and plugin archives, and serves them from
//! a local `wiremock` server.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use upkeep::test_utils::{ZipItem, zip_bytes};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Version endpoint path served by [`serve_version`].
pub const INFO_PATH: &str = "/update/getDownloadUrl.php";

/// A temporary configuration directory plus a plugin root.
pub struct TestSetup {
    pub temp: TempDir,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn plugin_root(&self) -> PathBuf {
        self.temp.path().join("plugins")
    }

    /// Write `updater.toml` pointing at `info_url`.
    pub fn write_app_config(&self, info_url: &str, extra: &str) {
        let content = format!(
            "current_version = \"1.0\"\ninfo_url = \"{info_url}\"\nsoftware_name = \"TestApp\"\n{extra}\n"
        );
        std::fs::write(self.config_dir().join("updater.toml"), content)
            .expect("write updater.toml");
    }

    /// Create an installed plugin folder holding a single file.
    pub fn install_plugin(&self, folder: &str, file: &str, content: &str) -> PathBuf {
        let dir = self.plugin_root().join(folder);
        std::fs::create_dir_all(&dir).expect("create plugin folder");
        std::fs::write(dir.join(file), content).expect("write plugin file");
        dir
    }
}

/// Module file name the deployer requires in a plugin folder.
pub fn module_name(folder: &str) -> String {
    format!("{folder}{}", std::env::consts::DLL_SUFFIX)
}

/// A well-formed plugin archive for `folder`.
pub fn plugin_archive(folder: &str, version: &str) -> Vec<u8> {
    let module = module_name(folder);
    zip_bytes(&[
        ZipItem::File(&module, version.as_bytes()),
        ZipItem::Dir("translations/"),
        ZipItem::File("translations/en.xml", b"<lang/>"),
    ])
}

/// `<GUP>` answer announcing an update at `location`.
pub fn update_available(location: &str, hash: Option<&str>) -> String {
    let hash = hash.map(|h| format!("<Hash>{h}</Hash>")).unwrap_or_default();
    format!(
        "<GUP><NeedToBeUpdated>yes</NeedToBeUpdated><Version>2.0</Version><Location>{location}</Location>{hash}</GUP>"
    )
}

/// `<GUP>` answer saying the installed version is current.
pub const NO_UPDATE: &str = "<GUP><NeedToBeUpdated>no</NeedToBeUpdated></GUP>";

/// Serve `body` for GET `INFO_PATH`.
pub async fn serve_version(server: &MockServer, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

/// Serve `content` for GET `file_path`.
pub async fn serve_file(server: &MockServer, file_path: &str, content: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(server)
        .await;
}
