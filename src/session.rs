//! Per-run session state shared between the pipeline and the user interface.
//!
//! The downloader polls the flags between chunks; the interface side (a
//! Ctrl-C handler in the console build) sets them. Ctrl-C only means
//! "cancel" while a transfer is running. Anywhere else it ends the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::{MessageId, Messages};
use crate::host::{ProgressSink, UserPrompt};

/// Cooperative abort and pause flags for one updater run.
#[derive(Debug, Default)]
pub struct SessionContext {
    abort: AtomicBool,
    pause: AtomicBool,
    transferring: AtomicBool,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the current transfer to stop.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Hold chunk writes until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Clear both flags before the next transfer.
    pub fn reset(&self) {
        self.abort.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
    }

    /// Mark a transfer as running until the returned guard is dropped.
    #[must_use]
    pub fn begin_transfer(&self) -> TransferGuard<'_> {
        self.transferring.store(true, Ordering::SeqCst);
        TransferGuard {
            session: self,
        }
    }

    #[must_use]
    pub fn is_transferring(&self) -> bool {
        self.transferring.load(Ordering::SeqCst)
    }
}

/// Clears the "transfer running" mark on drop.
#[derive(Debug)]
pub struct TransferGuard<'a> {
    session: &'a SessionContext,
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.session.transferring.store(false, Ordering::SeqCst);
    }
}

/// What one Ctrl-C led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Nothing was downloading; the run should end.
    Exit,
    /// The running transfer was told to stop.
    Abort,
    /// The user chose to keep downloading.
    Resume,
}

/// React to one Ctrl-C.
///
/// During a transfer the download is paused and the user is asked whether to
/// abort, with the progress display suspended while the question is up. Silent
/// runs abort without asking.
pub async fn handle_interrupt(
    session: &SessionContext,
    prompt: &Arc<dyn UserPrompt>,
    progress: &Arc<dyn ProgressSink>,
    question: &str,
    silent: bool,
) -> InterruptAction {
    if !session.is_transferring() {
        return InterruptAction::Exit;
    }
    if silent {
        session.request_abort();
        return InterruptAction::Abort;
    }

    session.pause();
    let prompt = Arc::clone(prompt);
    let progress = Arc::clone(progress);
    let question = question.to_string();
    // Console prompts block on stdin.
    let abort = tokio::task::spawn_blocking(move || {
        let mut abort = false;
        progress.suspend(&mut || abort = prompt.confirm(&question));
        abort
    })
    .await
    .unwrap_or(false);

    if abort {
        session.request_abort();
    }
    session.resume();
    if abort { InterruptAction::Abort } else { InterruptAction::Resume }
}

/// Turn Ctrl-C into the download "cancel" button.
///
/// Returns on the first Ctrl-C received while no transfer is running, so the
/// caller can end the run.
pub async fn watch_interrupts(
    session: Arc<SessionContext>,
    prompt: Arc<dyn UserPrompt>,
    progress: Arc<dyn ProgressSink>,
    messages: Messages,
    silent: bool,
) {
    let question = messages.get(MessageId::AbortOrNot);
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            return std::future::pending().await;
        }
        match handle_interrupt(&session, &prompt, &progress, &question, silent).await {
            InterruptAction::Exit => {
                info!("Interrupted");
                return;
            }
            InterruptAction::Abort => info!("Download aborted by user"),
            InterruptAction::Resume => debug!("Resuming download"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let session = SessionContext::new();
        assert!(!session.is_abort_requested());
        assert!(!session.is_paused());

        session.pause();
        assert!(session.is_paused());
        session.resume();
        assert!(!session.is_paused());

        session.request_abort();
        assert!(session.is_abort_requested());

        session.pause();
        session.reset();
        assert!(!session.is_abort_requested());
        assert!(!session.is_paused());
    }

    #[test]
    fn test_transfer_guard() {
        let session = SessionContext::new();
        assert!(!session.is_transferring());
        {
            let _transfer = session.begin_transfer();
            assert!(session.is_transferring());
            session.reset();
            assert!(session.is_transferring());
        }
        assert!(!session.is_transferring());
    }

    mod interrupts {
        use super::*;
        use crate::test_utils::{RecordingProgress, RecordingPrompt};

        struct Fixture {
            prompt: Arc<RecordingPrompt>,
            progress: Arc<RecordingProgress>,
        }

        impl Fixture {
            fn new(abort: bool) -> Self {
                Self {
                    prompt: Arc::new(RecordingPrompt::default().with_confirm(abort)),
                    progress: Arc::new(RecordingProgress::default()),
                }
            }

            async fn interrupt(&self, session: &SessionContext, silent: bool) -> InterruptAction {
                let prompt: Arc<dyn UserPrompt> = self.prompt.clone();
                let progress: Arc<dyn ProgressSink> = self.progress.clone();
                handle_interrupt(session, &prompt, &progress, "Abort?", silent).await
            }
        }

        #[tokio::test]
        async fn test_outside_a_transfer_ends_the_run() {
            let fixture = Fixture::new(true);
            let session = SessionContext::new();

            assert_eq!(fixture.interrupt(&session, false).await, InterruptAction::Exit);
            assert!(fixture.prompt.questions().is_empty());
            assert!(!session.is_abort_requested());
        }

        #[tokio::test]
        async fn test_confirmed_abort_stops_the_transfer() {
            let fixture = Fixture::new(true);
            let session = SessionContext::new();
            let _transfer = session.begin_transfer();

            assert_eq!(fixture.interrupt(&session, false).await, InterruptAction::Abort);
            assert_eq!(fixture.prompt.questions(), vec!["Abort?".to_string()]);
            assert_eq!(fixture.progress.suspensions(), 1);
            assert!(session.is_abort_requested());
            assert!(!session.is_paused());
        }

        #[tokio::test]
        async fn test_declined_abort_resumes() {
            let fixture = Fixture::new(false);
            let session = SessionContext::new();
            let _transfer = session.begin_transfer();

            assert_eq!(fixture.interrupt(&session, false).await, InterruptAction::Resume);
            assert!(!session.is_abort_requested());
            assert!(!session.is_paused());
        }

        #[tokio::test]
        async fn test_silent_aborts_without_asking() {
            let fixture = Fixture::new(false);
            let session = SessionContext::new();
            let _transfer = session.begin_transfer();

            assert_eq!(fixture.interrupt(&session, true).await, InterruptAction::Abort);
            assert!(fixture.prompt.questions().is_empty());
            assert_eq!(fixture.progress.suspensions(), 0);
            assert!(session.is_abort_requested());
        }
    }
}
