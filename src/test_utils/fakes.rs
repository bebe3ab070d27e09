//! Recording fakes for the transport and host collaborators.

use anyhow::Result;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{ExtraCommand, ProxySettings};
use crate::host::{ProcessController, ProgressSink, UpdateAnswer, UserPrompt};
use crate::transport::{ByteStream, HttpRequest, Transport, TransportError};

const CHUNK_SIZE: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`Transport`].
///
/// `get_text` answers every URL with the configured body, or a connection
/// error when there is none. `get_stream` serves registered files in
/// [`CHUNK_SIZE`]-byte chunks and answers 404 for anything else.
#[derive(Debug, Default)]
pub struct FakeTransport {
    text: Option<String>,
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, url: impl Into<String>, content: Vec<u8>) -> Self {
        self.files.insert(url.into(), content);
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    fn record(&self, request: &HttpRequest) {
        lock(&self.requests).push(request.clone());
    }
}

impl Transport for FakeTransport {
    async fn get_text(&self, request: &HttpRequest) -> Result<String, TransportError> {
        self.record(request);
        self.text
            .clone()
            .ok_or_else(|| TransportError::Connection(format!("connection refused: {}", request.url)))
    }

    async fn get_stream(&self, request: &HttpRequest) -> Result<ByteStream, TransportError> {
        self.record(request);
        let content = self.files.get(&request.url).ok_or_else(|| TransportError::Status {
            url: request.url.clone(),
            status: 404,
        })?;

        let chunks: Vec<Result<Vec<u8>, TransportError>> =
            content.chunks(CHUNK_SIZE).map(|chunk| Ok(chunk.to_vec())).collect();
        Ok(ByteStream {
            total: Some(content.len() as u64),
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}

/// [`ProgressSink`] that remembers every report.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<(u8, String)>>,
    finished: AtomicBool,
    suspensions: AtomicUsize,
}

impl RecordingProgress {
    #[must_use]
    pub fn reports(&self) -> Vec<(u8, String)> {
        lock(&self.reports).clone()
    }

    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// How many times the display was suspended for other output.
    #[must_use]
    pub fn suspensions(&self) -> usize {
        self.suspensions.load(Ordering::SeqCst)
    }
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, percent: u8, label: &str) {
        lock(&self.reports).push((percent, label.to_string()));
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        self.suspensions.fetch_add(1, Ordering::SeqCst);
        f();
    }
}

/// [`UserPrompt`] with scripted answers.
///
/// Says yes to updates and to confirmations, and cancels the proxy editor,
/// unless told otherwise.
#[derive(Debug)]
pub struct RecordingPrompt {
    answer: UpdateAnswer,
    confirm: bool,
    proxy: Option<ProxySettings>,
    messages: Mutex<Vec<String>>,
    questions: Mutex<Vec<String>>,
    third_labels: Mutex<Vec<Option<String>>>,
}

impl Default for RecordingPrompt {
    fn default() -> Self {
        Self {
            answer: UpdateAnswer::Yes,
            confirm: true,
            proxy: None,
            messages: Mutex::new(Vec::new()),
            questions: Mutex::new(Vec::new()),
            third_labels: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingPrompt {
    #[must_use]
    pub fn with_answer(mut self, answer: UpdateAnswer) -> Self {
        self.answer = answer;
        self
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    /// Settings the proxy editor returns.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Texts passed to `show_message`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Texts passed to `confirm`, in order.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        lock(&self.questions).clone()
    }

    /// Third-button labels offered by each `ask_update` call.
    #[must_use]
    pub fn third_labels(&self) -> Vec<Option<String>> {
        lock(&self.third_labels).clone()
    }
}

impl UserPrompt for RecordingPrompt {
    fn show_message(&self, text: &str) {
        lock(&self.messages).push(text.to_string());
    }

    fn ask_update(&self, _text: &str, third_label: Option<&str>) -> UpdateAnswer {
        lock(&self.third_labels).push(third_label.map(str::to_string));
        self.answer
    }

    fn confirm(&self, text: &str) -> bool {
        lock(&self.questions).push(text.to_string());
        self.confirm
    }

    fn edit_proxy(&self, _current: &ProxySettings) -> Option<ProxySettings> {
        self.proxy.clone()
    }
}

/// A launch recorded by [`RecordingProcess`]: program, arguments, visibility.
pub type Launch = (PathBuf, Vec<String>, bool);

/// [`ProcessController`] over a set of pretend-running identifiers.
///
/// A close request stops the process immediately.
#[derive(Debug, Default)]
pub struct RecordingProcess {
    running: Mutex<HashSet<String>>,
    launches: Mutex<Vec<Launch>>,
    closes: Mutex<Vec<String>>,
    notifications: Mutex<Vec<(String, u32)>>,
}

impl RecordingProcess {
    pub fn set_running(&self, identifier: &str) {
        lock(&self.running).insert(identifier.to_string());
    }

    /// Launched programs, in order.
    #[must_use]
    pub fn launches(&self) -> Vec<PathBuf> {
        lock(&self.launches).iter().map(|(path, _, _)| path.clone()).collect()
    }

    #[must_use]
    pub fn launch_details(&self) -> Vec<Launch> {
        lock(&self.launches).clone()
    }

    #[must_use]
    pub fn closes(&self) -> Vec<String> {
        lock(&self.closes).clone()
    }

    /// `(identifier, command code)` pairs delivered through `notify`.
    #[must_use]
    pub fn notifications(&self) -> Vec<(String, u32)> {
        lock(&self.notifications).clone()
    }
}

impl ProcessController for RecordingProcess {
    fn is_running(&self, identifier: &str) -> bool {
        lock(&self.running).contains(identifier)
    }

    fn request_close(&self, identifier: &str) -> Result<()> {
        lock(&self.closes).push(identifier.to_string());
        lock(&self.running).remove(identifier);
        Ok(())
    }

    fn notify(&self, identifier: &str, command: &ExtraCommand) -> Result<()> {
        lock(&self.notifications).push((identifier.to_string(), command.code));
        Ok(())
    }

    fn launch(&self, path: &Path, args: &[String], visible: bool) -> Result<()> {
        lock(&self.launches).push((path.to_path_buf(), args.to_vec(), visible));
        Ok(())
    }
}
