//! [`Transport`] backed by `reqwest`.

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::debug;

use super::{ByteStream, HttpRequest, Transport, TransportError};
use crate::config::ProxySettings;

/// Async `reqwest` client with optional proxy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client, routing every request through `proxy` when one is configured.
    pub fn new(proxy: &ProxySettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(url) = proxy.url() {
            debug!("Using proxy {}", url);
            let proxy = reqwest::Proxy::all(&url)
                .with_context(|| format!("Invalid proxy address: {url}"))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
        })
    }

    fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(&request.url).query(&request.query);
        if let Some(agent) = &request.user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, agent);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn send(&self, request: &HttpRequest) -> Result<reqwest::Response, TransportError> {
        let response = self.build(request).send().await.map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn connection_error(error: reqwest::Error) -> TransportError {
    // reqwest's Display omits the underlying cause.
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TransportError::Connection(message)
}

impl Transport for ReqwestTransport {
    async fn get_text(&self, request: &HttpRequest) -> Result<String, TransportError> {
        let response = self.send(request).await?;
        response.text().await.map_err(connection_error)
    }

    async fn get_stream(&self, request: &HttpRequest) -> Result<ByteStream, TransportError> {
        let response = self.send(request).await?;
        let total = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(connection_error))
            .boxed();

        Ok(ByteStream {
            total,
            body,
        })
    }
}
