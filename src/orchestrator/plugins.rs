use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::{UpdateOrchestrator, destination_root};
use crate::cli::{OperationRequest, PluginUpdateSpec};
use crate::config::MessageId;
use crate::core::ExitStatus;
use crate::transport::Transport;
use crate::upgrade::{ArchiveDeployer, BackupManager, ChecksumVerifier, Downloader};
use crate::utils::{DownloadKind, download_target};

impl<T: Transport> UpdateOrchestrator<T> {
    /// Install or replace every plugin in `request`, then relaunch the host.
    ///
    /// Always succeeds: each spec's failure is reported and left behind.
    pub(super) async fn plugin_pipeline(
        &self,
        request: &OperationRequest,
        replace_existing: bool,
    ) -> Result<ExitStatus> {
        let root = destination_root(request)?;
        let silent = self.is_silent(request);
        let user_agent = self.user_agent(&self.config.app.current_version);

        for spec in &request.plugin_specs {
            if !spec.is_well_formed() {
                warn!("Skipping {}: hash is not a SHA-256 digest", spec.folder_name);
                continue;
            }
            let Some(url) = spec.download_url.as_deref() else {
                warn!("Skipping {}: no download URL", spec.folder_name);
                continue;
            };

            let dest = root.join(&spec.folder_name);
            self.update_plugin(spec, url, &dest, replace_existing, silent, &user_agent).await;
        }

        self.relaunch(request);
        Ok(ExitStatus::Success)
    }

    async fn update_plugin(
        &self,
        spec: &PluginUpdateSpec,
        url: &str,
        dest: &Path,
        replace_existing: bool,
        silent: bool,
        user_agent: &str,
    ) {
        let backup = BackupManager::for_dir(dest.to_path_buf());
        let backed_up = if replace_existing {
            match backup.create_backup().await {
                Ok(backed_up) => backed_up,
                Err(e) => {
                    warn!("Skipping {}: backup failed: {:#}", spec.folder_name, e);
                    return;
                }
            }
        } else {
            false
        };

        let archive = download_target(&self.temp_dir, url, DownloadKind::Archive);
        self.install_archive(spec, url, &archive, dest, &backup, backed_up, silent, user_agent)
            .await;
        self.remove_temp(&archive).await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn install_archive(
        &self,
        spec: &PluginUpdateSpec,
        url: &str,
        archive: &Path,
        dest: &Path,
        backup: &BackupManager,
        backed_up: bool,
        silent: bool,
        user_agent: &str,
    ) {
        self.session.reset();
        let download = Downloader::new(&self.transport)
            .user_agent(user_agent)
            .fetch(url, archive, &self.session, self.progress.as_ref())
            .await;

        if !download.succeeded {
            self.restore(backup, backed_up).await;
            if download.was_cancelled_by_user {
                self.prompt.show_message(&self.message(MessageId::DownloadStopped));
            } else if !silent {
                let detail = download.error.unwrap_or_default();
                self.prompt.show_message(&format!(
                    "{} {}\n{}",
                    self.message(MessageId::DownloadFailed),
                    url,
                    detail
                ));
            }
            return;
        }

        match ChecksumVerifier::verify_file(archive, spec.expected_hash.as_deref()).await {
            Ok((true, _)) => {}
            Ok((false, actual)) => {
                warn!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    spec.folder_name,
                    spec.expected_hash.as_deref().unwrap_or_default(),
                    actual
                );
                self.restore(backup, backed_up).await;
                if !silent {
                    self.prompt.show_message(&format!(
                        "{}\n{}",
                        self.message(MessageId::HashMismatch),
                        spec.folder_name
                    ));
                }
                return;
            }
            Err(e) => {
                warn!("Could not hash {}: {:#}", archive.display(), e);
                self.restore(backup, backed_up).await;
                return;
            }
        }

        let outcome = ArchiveDeployer::new()
            .require_module(true)
            .deploy_with_backup(backup, backed_up, archive, dest)
            .await;

        if outcome.succeeded {
            info!("Installed {} into {}", spec.folder_name, dest.display());
        } else if !silent {
            self.prompt.show_message(&format!(
                "{}\n{}",
                self.message(MessageId::UnzipFailed),
                dest.display()
            ));
        }
    }

    async fn restore(&self, backup: &BackupManager, backed_up: bool) {
        if backed_up && let Err(e) = backup.restore_backup().await {
            warn!("Could not restore {}: {:#}", backup.original_path().display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::{join_args, parse_command_line};
    use crate::core::ExitStatus;
    use crate::host::NullProgress;
    use crate::orchestrator::UpdateOrchestrator;
    use crate::test_utils::{
        FakeTransport, RecordingProcess, RecordingPrompt, ZipItem, test_config, zip_bytes,
    };
    use crate::upgrade::ChecksumVerifier;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        prompt: Arc<RecordingPrompt>,
        process: Arc<RecordingProcess>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                prompt: Arc::new(RecordingPrompt::default()),
                process: Arc::new(RecordingProcess::default()),
            }
        }

        fn root(&self) -> PathBuf {
            self.temp.path().join("plugins")
        }

        fn orchestrator(&self, transport: FakeTransport, verbose_config: bool) -> UpdateOrchestrator<FakeTransport> {
            let mut config = test_config(self.temp.path());
            config.app.silent_mode = !verbose_config;
            UpdateOrchestrator::new(config, transport)
                .with_prompt(self.prompt.clone())
                .with_process(self.process.clone())
                .with_progress(Arc::new(NullProgress))
                .with_temp_dir(self.temp.path().join("tmp"))
        }

        fn command_line(&self, flags: &[&str], entries: &[String]) -> String {
            let mut args: Vec<String> = flags.iter().map(|f| (*f).to_string()).collect();
            args.push("host.exe".to_string());
            args.push(self.root().display().to_string());
            args.extend(entries.iter().cloned());
            join_args(args)
        }
    }

    fn plugin_zip(name: &str, marker: &[u8]) -> Vec<u8> {
        let module = format!("{name}{}", std::env::consts::DLL_SUFFIX);
        zip_bytes(&[ZipItem::File(&module, marker), ZipItem::File("doc/readme.txt", b"docs")])
    }

    fn module_path(root: &Path, name: &str) -> PathBuf {
        root.join(name).join(format!("{name}{}", std::env::consts::DLL_SUFFIX))
    }

    #[tokio::test]
    async fn test_install_plugin_with_hash() {
        let fx = Fixture::new();
        let body = plugin_zip("Foo", b"v2");
        let hash = ChecksumVerifier::compute_sha256(&body);
        let transport = FakeTransport::new().with_file("http://host/Foo.zip", body);

        let line = fx.command_line(&["-unzipTo"], &[format!("Foo http://host/Foo.zip {hash}")]);
        let status =
            fx.orchestrator(transport, false).run(&parse_command_line(&line).unwrap()).await.unwrap();

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(std::fs::read(module_path(&fx.root(), "Foo")).unwrap(), b"v2");
        assert!(fx.root().join("Foo").join("doc").join("readme.txt").exists());
        assert_eq!(fx.process.launches(), vec![PathBuf::from("host.exe")]);
        assert!(!fx.temp.path().join("tmp").join("Foo.zip").exists());
    }

    #[tokio::test]
    async fn test_update_replaces_existing_folder() {
        let fx = Fixture::new();
        let old = fx.root().join("Foo");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("stale.txt"), "old").unwrap();

        let transport =
            FakeTransport::new().with_file("http://host/Foo.zip", plugin_zip("Foo", b"v2"));
        let line = fx.command_line(&["-clean", "-unzipTo"], &["Foo http://host/Foo.zip".to_string()]);
        fx.orchestrator(transport, false).run(&parse_command_line(&line).unwrap()).await.unwrap();

        assert_eq!(std::fs::read(module_path(&fx.root(), "Foo")).unwrap(), b"v2");
        assert!(!old.join("stale.txt").exists());
        assert!(!fx.root().join("Foo.backup4RestoreInCaseOfFailed").exists());
    }

    #[tokio::test]
    async fn test_hash_mismatch_keeps_previous_installation() {
        let fx = Fixture::new();
        let old = fx.root().join("Foo");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("A"), "original").unwrap();

        let transport =
            FakeTransport::new().with_file("http://host/Foo.zip", plugin_zip("Foo", b"v2"));
        let wrong = "0".repeat(64);
        let line = fx.command_line(
            &["-clean", "-unzipTo"],
            &[format!("Foo http://host/Foo.zip {wrong}")],
        );
        let status =
            fx.orchestrator(transport, true).run(&parse_command_line(&line).unwrap()).await.unwrap();

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(std::fs::read_to_string(old.join("A")).unwrap(), "original");
        assert!(!module_path(&fx.root(), "Foo").exists());
        assert_eq!(fx.prompt.messages().len(), 1);
        assert_eq!(fx.process.launches().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_without_module_rolls_back() {
        let fx = Fixture::new();
        let old = fx.root().join("Bar");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("A"), "original").unwrap();

        let body = zip_bytes(&[ZipItem::File("unrelated.txt", b"x")]);
        let transport = FakeTransport::new().with_file("http://host/Bar.zip", body);
        let line = fx.command_line(&["-clean", "-unzipTo"], &["Bar http://host/Bar.zip".to_string()]);
        fx.orchestrator(transport, false).run(&parse_command_line(&line).unwrap()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&old).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("A")]);
        assert!(fx.prompt.messages().is_empty());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_specs() {
        let fx = Fixture::new();
        let transport =
            FakeTransport::new().with_file("http://host/Good.zip", plugin_zip("Good", b"ok"));
        let short_hash = "abc123";
        let line = fx.command_line(
            &["-unzipTo"],
            &[
                format!("Bad http://host/Bad.zip {short_hash}"),
                "Gone http://host/Gone.zip".to_string(),
                "Good http://host/Good.zip".to_string(),
            ],
        );
        let status =
            fx.orchestrator(transport, true).run(&parse_command_line(&line).unwrap()).await.unwrap();

        assert_eq!(status, ExitStatus::Success);
        assert!(!fx.root().join("Bad").exists());
        assert!(!fx.root().join("Gone").exists());
        assert!(module_path(&fx.root(), "Good").exists());

        // Only the 404 for Gone is reported; the malformed spec is skipped quietly.
        let messages = fx.prompt.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("http://host/Gone.zip"));
        assert_eq!(fx.process.launches().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_install_of_bad_archive_leaves_nothing() {
        let fx = Fixture::new();
        let transport =
            FakeTransport::new().with_file("http://host/Foo.zip", b"definitely not a zip".to_vec());
        let line = fx.command_line(&["-unzipTo"], &["Foo http://host/Foo.zip".to_string()]);
        fx.orchestrator(transport, false).run(&parse_command_line(&line).unwrap()).await.unwrap();

        assert!(!fx.root().join("Foo").exists());
    }
}
