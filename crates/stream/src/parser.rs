//! Turns one SSE frame into an envelope.

use datachat_core::StreamEnvelope;
use tracing::{trace, warn};

/// Marker every envelope-bearing frame starts with.
pub const DATA_PREFIX: &str = "data: ";

/// Longest frame excerpt written to the log on a parse failure.
const LOG_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Envelope(StreamEnvelope),
    /// Not a `data: ` frame (comment, `event:` line, keep-alive, blank).
    Ignored,
    /// A `data: ` frame whose payload is not a valid envelope.
    Malformed,
}

/// Parse a single frame. Malformed payloads are logged and reported, never
/// returned as errors, so one bad frame cannot end the stream.
pub fn parse_frame(frame: &str) -> FrameOutcome {
    let Some(json) = frame.strip_prefix(DATA_PREFIX) else {
        trace!(len = frame.len(), "Ignoring non-data SSE frame");
        return FrameOutcome::Ignored;
    };

    match serde_json::from_str::<StreamEnvelope>(json) {
        Ok(envelope) => FrameOutcome::Envelope(envelope),
        Err(e) => {
            let excerpt: String = json.chars().take(LOG_EXCERPT_CHARS).collect();
            warn!(error = %e, data = %excerpt, "Failed to parse SSE data as envelope");
            FrameOutcome::Malformed
        }
    }
}
