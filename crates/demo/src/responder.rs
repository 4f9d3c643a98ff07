//! Offline stand-in for the agent server.
//!
//! Answers from a [`CannedCatalog`] after a random delay and emits the reply
//! as a single SSE frame, so the rest of the client runs unchanged.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use datachat_core::config::DemoConfig;
use datachat_core::StreamEnvelope;
use datachat_stream::request::MessagePart;
use datachat_stream::{AgentRunRequest, AgentTransport, ByteStream, StreamError};
use rand::Rng;
use tracing::debug;

use crate::catalog::{CannedCatalog, NOT_FOUND_TEXT};
use crate::payload::CannedPayload;
use crate::render::render_html;

/// Inclusive bounds for the simulated thinking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DelayWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min == max {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl From<&DemoConfig> for DelayWindow {
    fn from(config: &DemoConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

pub struct CannedResponder {
    catalog: CannedCatalog,
    delay: DelayWindow,
}

impl CannedResponder {
    pub fn new(catalog: CannedCatalog, delay: DelayWindow) -> Self {
        Self { catalog, delay }
    }

    pub fn catalog(&self) -> &CannedCatalog {
        &self.catalog
    }

    /// The payload for `input`, or the not-found text.
    pub fn reply(&self, input: &str) -> CannedPayload {
        match self.catalog.find(input) {
            Some(entry) => entry.payload.clone(),
            None => CannedPayload::text(NOT_FOUND_TEXT),
        }
    }

    pub fn reply_html(&self, input: &str) -> String {
        render_html(&self.reply(input))
    }

    /// Wait out the delay, then answer.
    pub async fn respond(&self, input: &str) -> String {
        tokio::time::sleep(self.delay.sample()).await;
        self.reply_html(input)
    }
}

fn first_text(request: &AgentRunRequest) -> &str {
    request
        .new_message
        .parts
        .iter()
        .find_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            MessagePart::InlineData { .. } => None,
        })
        .unwrap_or("")
}

#[async_trait]
impl AgentTransport for CannedResponder {
    async fn open(&self, request: &AgentRunRequest) -> Result<ByteStream, StreamError> {
        let input = first_text(request);
        let hit = self.catalog.find(input).is_some();
        debug!(hit, input, "Demo lookup");

        let html = self.respond(input).await;
        let envelope = serde_json::to_string(&StreamEnvelope::text(html))
            .map_err(|e| StreamError::Read(e.to_string()))?;
        let frame = Bytes::from(format!("data: {}\n\n", envelope));
        Ok(Box::pin(futures::stream::once(async move { Ok(frame) })))
    }

    fn describe(&self) -> String {
        format!("demo ({} canned answers)", self.catalog.len())
    }
}
