use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::MockServer;

use crate::common::{INFO_PATH, NO_UPDATE, TestSetup, serve_version};

fn upkeep(setup: &TestSetup) -> Command {
    let mut cmd = Command::cargo_bin("upkeep").unwrap();
    cmd.env("UPKEEP_CONFIG_DIR", setup.config_dir())
        .env("UPKEEP_NO_PROGRESS", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_exits_zero() {
    let setup = TestSetup::new();
    upkeep(&setup)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("-unzipTo"));
}

#[test]
fn test_clean_with_too_few_arguments() {
    let setup = TestSetup::new();
    upkeep(&setup)
        .args(["-clean", "host.exe", "plugins"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("-clean"));
}

#[test]
fn test_unterminated_quote() {
    let setup = TestSetup::new();
    upkeep(&setup).arg("-unzipTo \"a b").assert().code(2);
}

#[test]
fn test_clean_removes_folders_without_configuration() {
    let setup = TestSetup::new();
    let foo = setup.install_plugin("Foo", "Foo.dll", "x");
    let keep = setup.install_plugin("Keep", "Keep.dll", "x");
    let root = setup.plugin_root();

    upkeep(&setup)
        .arg("-clean")
        .arg(setup.temp.path().join("no-such-host"))
        .arg(&root)
        .args(["Foo", "Missing"])
        .assert()
        .success();

    assert!(!foo.exists());
    assert!(keep.exists());
}

#[test]
fn test_app_mode_requires_configuration() {
    let setup = TestSetup::new();
    upkeep(&setup)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("updater.toml"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_app_mode_no_update() {
    let server = MockServer::start().await;
    serve_version(&server, NO_UPDATE).await;
    let setup = TestSetup::new();
    setup.write_app_config(&format!("{}{INFO_PATH}", server.uri()), "");

    upkeep(&setup).assert().success();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[test]
fn test_app_mode_unreachable_endpoint() {
    let setup = TestSetup::new();
    setup.write_app_config("http://127.0.0.1:9/info", "");

    upkeep(&setup).assert().code(4);
}
