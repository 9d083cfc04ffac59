//! Streaming HTTP transport for annotation requests

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use lyra_common::api::{AnnotateRequest, ErrorBody, ANNOTATE_PATH};
use std::time::Duration;

use crate::error::ClientError;

/// Raw body reads, in arrival order
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

/// Opens an annotation stream
#[async_trait]
pub trait AnnotateTransport: Send + Sync {
    /// Send the request; resolves once the response headers arrive
    async fn open(&self, request: &AnnotateRequest) -> Result<ByteStream, ClientError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// No overall request timeout is set: a stream stays open for as long as annotation runs.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnnotateTransport for HttpTransport {
    async fn open(&self, request: &AnnotateRequest) -> Result<ByteStream, ClientError> {
        let url = format!("{}{}", self.base_url, ANNOTATE_PATH);
        tracing::debug!(url = %url, "Opening annotation stream");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|read| {
                read.map(|bytes| bytes.to_vec())
                    .map_err(|e| ClientError::Transport(e.to_string()))
            })
            .boxed())
    }
}
