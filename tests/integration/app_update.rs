use std::sync::Arc;

use upkeep::cli::parse_command_line;
use upkeep::config::UpdaterConfig;
use upkeep::core::{ExitStatus, UpdaterError};
use upkeep::host::UpdateAnswer;
use upkeep::orchestrator::UpdateOrchestrator;
use upkeep::test_utils::{RecordingProcess, RecordingProgress, RecordingPrompt};
use upkeep::transport::ReqwestTransport;
use upkeep::upgrade::ChecksumVerifier;
use wiremock::MockServer;

use crate::common::{INFO_PATH, NO_UPDATE, TestSetup, serve_file, serve_version, update_available};

async fn orchestrator(
    setup: &TestSetup,
    prompt: Arc<RecordingPrompt>,
    process: Arc<RecordingProcess>,
    progress: Arc<RecordingProgress>,
) -> UpdateOrchestrator<ReqwestTransport> {
    let config = UpdaterConfig::load(setup.config_dir()).await.unwrap();
    let transport = ReqwestTransport::new(&config.proxy).unwrap();
    UpdateOrchestrator::new(config, transport)
        .with_prompt(prompt)
        .with_process(process)
        .with_progress(progress)
        .with_temp_dir(setup.temp.path().join("downloads"))
}

#[tokio::test]
async fn test_full_update_flow() {
    let server = MockServer::start().await;
    let installer: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
    let hash = ChecksumVerifier::compute_sha256(&installer);
    let location = format!("{}/files/setup-2.0.exe", server.uri());
    serve_version(&server, update_available(&location, Some(&hash))).await;
    serve_file(&server, "/files/setup-2.0.exe", installer.clone()).await;

    let setup = TestSetup::new();
    setup.write_app_config(
        &format!("{}{INFO_PATH}", server.uri()),
        "silent_mode = \"no\"\nhost_identifier = \"test-host\"\ninstaller_args = \"/lang en\"",
    );

    let prompt = Arc::new(RecordingPrompt::default().with_confirm(true));
    let process = Arc::new(RecordingProcess::default());
    process.set_running("test-host");
    let progress = Arc::new(RecordingProgress::default());

    let status = orchestrator(&setup, prompt.clone(), process.clone(), progress.clone())
        .await
        .run(&parse_command_line("").unwrap())
        .await
        .unwrap();

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(process.closes(), vec!["test-host".to_string()]);

    let launches = process.launch_details();
    assert_eq!(launches.len(), 1);
    let (program, args, visible) = &launches[0];
    assert_eq!(std::fs::read(program).unwrap(), installer);
    assert_eq!(args, &vec!["/lang".to_string(), "en".to_string()]);
    assert!(*visible);

    let reports = progress.reports();
    assert_eq!(reports.last().map(|r| r.0), Some(100));
    assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(progress.finished());
}

#[tokio::test]
async fn test_no_update_is_silent_by_default() {
    let server = MockServer::start().await;
    serve_version(&server, NO_UPDATE).await;

    let setup = TestSetup::new();
    setup.write_app_config(&format!("{}{INFO_PATH}", server.uri()), "");

    let prompt = Arc::new(RecordingPrompt::default());
    let process = Arc::new(RecordingProcess::default());
    let status = orchestrator(&setup, prompt.clone(), process.clone(), Arc::default())
        .await
        .run(&parse_command_line("").unwrap())
        .await
        .unwrap();

    assert_eq!(status, ExitStatus::Success);
    assert!(prompt.messages().is_empty());
    assert!(process.launches().is_empty());
}

#[tokio::test]
async fn test_declining_downloads_nothing() {
    let server = MockServer::start().await;
    let location = format!("{}/files/setup.exe", server.uri());
    serve_version(&server, update_available(&location, None)).await;

    let setup = TestSetup::new();
    setup.write_app_config(&format!("{}{INFO_PATH}", server.uri()), "");

    let prompt = Arc::new(RecordingPrompt::default().with_answer(UpdateAnswer::No));
    let status = orchestrator(&setup, prompt, Arc::default(), Arc::default())
        .await
        .run(&parse_command_line("-verbose").unwrap())
        .await
        .unwrap();

    assert_eq!(status, ExitStatus::Success);
    let paths: Vec<String> =
        server.received_requests().await.unwrap().iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(paths, vec![INFO_PATH.to_string()]);
}

#[tokio::test]
async fn test_tampered_installer_is_rejected() {
    let server = MockServer::start().await;
    let location = format!("{}/files/setup.exe", server.uri());
    let hash = ChecksumVerifier::compute_sha256(b"the real installer");
    serve_version(&server, update_available(&location, Some(&hash))).await;
    serve_file(&server, "/files/setup.exe", b"something else".to_vec()).await;

    let setup = TestSetup::new();
    setup.write_app_config(&format!("{}{INFO_PATH}", server.uri()), "");

    let process = Arc::new(RecordingProcess::default());
    let err = orchestrator(&setup, Arc::default(), process.clone(), Arc::default())
        .await
        .run(&parse_command_line("").unwrap())
        .await
        .unwrap_err();

    let err = err.downcast::<UpdaterError>().unwrap();
    assert_eq!(err.exit_status(), ExitStatus::IntegrityError);
    assert!(process.launches().is_empty());
}
