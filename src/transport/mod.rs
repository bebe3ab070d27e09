//! HTTP transport abstraction.
//!
//! The version checker and the downloader only need two operations: fetch a
//! small text body and stream a binary body. Both go through [`Transport`] so
//! the pipeline can run against an in-memory fake in tests and against
//! [`ReqwestTransport`] in production.

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

use futures::stream::BoxStream;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The request could not be sent or the body could not be read.
    #[error("{0}")]
    Connection(String),
}

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    /// Query parameters appended to `url`, in order.
    pub query: Vec<(String, String)>,
    pub user_agent: Option<String>,
    /// Whole-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            user_agent: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A streamed response body.
pub struct ByteStream {
    /// Announced body length, when the server sent one.
    pub total: Option<u64>,
    pub body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream").field("total", &self.total).finish_non_exhaustive()
    }
}

/// HTTP client capability used by the update pipeline.
///
/// Redirects are followed by the implementation.
pub trait Transport: Send + Sync {
    /// Fetch a whole response body as text.
    fn get_text(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Start a request and return its body as a stream of chunks.
    fn get_stream(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;
}
