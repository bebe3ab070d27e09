use std::path::PathBuf;
use std::sync::Arc;

use upkeep::cli::{join_args, parse_command_line};
use upkeep::config::UpdaterConfig;
use upkeep::core::ExitStatus;
use upkeep::host::NullProgress;
use upkeep::orchestrator::UpdateOrchestrator;
use upkeep::test_utils::{RecordingProcess, RecordingPrompt};
use upkeep::transport::ReqwestTransport;
use upkeep::upgrade::ChecksumVerifier;
use wiremock::MockServer;

use crate::common::{TestSetup, module_name, plugin_archive, serve_file};

struct Run {
    status: ExitStatus,
    prompt: Arc<RecordingPrompt>,
    process: Arc<RecordingProcess>,
}

async fn run_plugins(setup: &TestSetup, flags: &[&str], entries: Vec<String>) -> Run {
    let mut args: Vec<String> = flags.iter().map(|f| (*f).to_string()).collect();
    args.push("host-app".to_string());
    args.push(setup.plugin_root().display().to_string());
    args.extend(entries);
    let request = parse_command_line(&join_args(args)).unwrap();

    let mut config = UpdaterConfig::load_lenient(setup.config_dir()).await;
    config.app.silent_mode = false;
    let transport = ReqwestTransport::new(&config.proxy).unwrap();
    let prompt = Arc::new(RecordingPrompt::default());
    let process = Arc::new(RecordingProcess::default());

    let status = UpdateOrchestrator::new(config, transport)
        .with_prompt(prompt.clone())
        .with_process(process.clone())
        .with_progress(Arc::new(NullProgress))
        .with_temp_dir(setup.temp.path().join("downloads"))
        .run(&request)
        .await
        .unwrap();

    Run {
        status,
        prompt,
        process,
    }
}

#[tokio::test]
async fn test_install_two_plugins_in_order() {
    let server = MockServer::start().await;
    let foo = plugin_archive("Foo", "foo-1");
    let bar = plugin_archive("Bar", "bar-1");
    let foo_hash = ChecksumVerifier::compute_sha256(&foo);
    serve_file(&server, "/Foo.zip", foo).await;
    serve_file(&server, "/Bar.zip", bar).await;

    let setup = TestSetup::new();
    let run = run_plugins(
        &setup,
        &["-unzipTo"],
        vec![
            format!("Foo {}/Foo.zip {foo_hash}", server.uri()),
            format!("Bar {}/Bar.zip", server.uri()),
        ],
    )
    .await;

    assert_eq!(run.status, ExitStatus::Success);
    let root = setup.plugin_root();
    assert_eq!(std::fs::read_to_string(root.join("Foo").join(module_name("Foo"))).unwrap(), "foo-1");
    assert_eq!(std::fs::read_to_string(root.join("Bar").join(module_name("Bar"))).unwrap(), "bar-1");
    assert!(root.join("Foo").join("translations").join("en.xml").is_file());
    assert!(run.prompt.messages().is_empty());
    assert_eq!(run.process.launches(), vec![PathBuf::from("host-app")]);

    let requested: Vec<String> =
        server.received_requests().await.unwrap().iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(requested, vec!["/Foo.zip", "/Bar.zip"]);
}

#[tokio::test]
async fn test_replace_with_wrong_hash_restores_previous_version() {
    let server = MockServer::start().await;
    serve_file(&server, "/Foo.zip", plugin_archive("Foo", "foo-2")).await;

    let setup = TestSetup::new();
    let installed = setup.install_plugin("Foo", &module_name("Foo"), "foo-1");

    let run = run_plugins(
        &setup,
        &["-clean", "-unzipTo"],
        vec![format!("Foo {}/Foo.zip {}", server.uri(), "f".repeat(64))],
    )
    .await;

    assert_eq!(run.status, ExitStatus::Success);
    assert_eq!(std::fs::read_to_string(installed.join(module_name("Foo"))).unwrap(), "foo-1");
    assert!(!setup.plugin_root().join("Foo.backup4RestoreInCaseOfFailed").exists());
    assert_eq!(run.prompt.messages().len(), 1);
    assert_eq!(run.process.launches().len(), 1);
}

#[tokio::test]
async fn test_replace_upgrades_existing_folder() {
    let server = MockServer::start().await;
    let archive = plugin_archive("Foo", "foo-2");
    let hash = ChecksumVerifier::compute_sha256(&archive).to_uppercase();
    serve_file(&server, "/Foo.zip", archive).await;

    let setup = TestSetup::new();
    let installed = setup.install_plugin("Foo", "obsolete.txt", "old");

    let run = run_plugins(
        &setup,
        &["-unzipTo", "-clean"],
        vec![format!("Foo {}/Foo.zip {hash}", server.uri())],
    )
    .await;

    assert_eq!(run.status, ExitStatus::Success);
    assert_eq!(std::fs::read_to_string(installed.join(module_name("Foo"))).unwrap(), "foo-2");
    assert!(!installed.join("obsolete.txt").exists());
    assert!(!setup.plugin_root().join("Foo.backup4RestoreInCaseOfFailed").exists());
}

#[tokio::test]
async fn test_missing_archive_is_reported_and_skipped() {
    let server = MockServer::start().await;
    serve_file(&server, "/Bar.zip", plugin_archive("Bar", "bar-1")).await;

    let setup = TestSetup::new();
    let run = run_plugins(
        &setup,
        &["-unzipTo"],
        vec![
            format!("Foo {}/Foo.zip", server.uri()),
            format!("Bar {}/Bar.zip", server.uri()),
        ],
    )
    .await;

    assert_eq!(run.status, ExitStatus::Success);
    assert!(!setup.plugin_root().join("Foo").exists());
    assert!(setup.plugin_root().join("Bar").join(module_name("Bar")).exists());
    assert_eq!(run.prompt.messages().len(), 1);
}
