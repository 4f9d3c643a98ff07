//! Where response bytes come from.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use datachat_core::config::AgentConfig;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::error::StreamError;
use crate::request::AgentRunRequest;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Opens one response stream per user turn.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn open(&self, request: &AgentRunRequest) -> Result<ByteStream, StreamError>;

    /// Short label for banners and logs.
    fn describe(&self) -> String;
}

/// Posts to the agent server's `/api/run_sse` endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(agent: &AgentConfig) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(agent.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: agent.run_sse_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn open(&self, request: &AgentRunRequest) -> Result<ByteStream, StreamError> {
        debug!(
            url = %self.url,
            session_id = request.session_id.as_deref().unwrap_or("(new)"),
            parts = request.new_message.parts.len(),
            "Opening agent stream"
        );

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StreamError::Status { status, body });
        }

        Ok(Box::pin(
            resp.bytes_stream().map(|chunk| chunk.map_err(StreamError::from)),
        ))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
