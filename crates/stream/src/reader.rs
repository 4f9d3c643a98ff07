//! Byte stream -> envelope stream adapter.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use datachat_core::StreamEnvelope;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::decoder::Utf8Decoder;
use crate::error::StreamError;
use crate::frame::FrameBuffer;
use crate::parser::{parse_frame, FrameOutcome};

/// Frame counters for one stream, useful for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub envelopes: usize,
    pub ignored: usize,
    pub malformed: usize,
}

/// Parses a chunked SSE byte stream into [`StreamEnvelope`]s.
///
/// SSE format:
/// ```text
/// data: {"session_id":"4f1c..."}
///
/// data: {"content":{"parts":[{"text":"Hello"}]}}
///
/// ```
///
/// Chunk boundaries are irrelevant: text is decoded incrementally and only
/// frames terminated by a blank line are parsed until the source ends, at
/// which point any leftover text is parsed as a final frame. A read error is
/// yielded once and ends the stream.
pub struct EnvelopeStream<S> {
    inner: S,
    decoder: Utf8Decoder,
    frames: FrameBuffer,
    ready: VecDeque<StreamEnvelope>,
    stats: FrameStats,
    finished: bool,
}

impl<S> EnvelopeStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8Decoder::new(),
            frames: FrameBuffer::new(),
            ready: VecDeque::new(),
            stats: FrameStats::default(),
            finished: false,
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    fn accept(&mut self, frames: Vec<String>) {
        for frame in frames {
            match parse_frame(&frame) {
                FrameOutcome::Envelope(envelope) => {
                    self.stats.envelopes += 1;
                    self.ready.push_back(envelope);
                }
                FrameOutcome::Ignored => self.stats.ignored += 1,
                FrameOutcome::Malformed => self.stats.malformed += 1,
            }
        }
    }

    fn drain_source(&mut self) {
        let tail = self.decoder.finish();
        let mut frames = self.frames.push(&tail);
        frames.extend(self.frames.finish());
        self.accept(frames);
        debug!(
            envelopes = self.stats.envelopes,
            ignored = self.stats.ignored,
            malformed = self.stats.malformed,
            "SSE source exhausted"
        );
    }
}

impl<S> Stream for EnvelopeStream<S>
where
    S: Stream<Item = Result<Bytes, StreamError>> + Unpin,
{
    type Item = Result<StreamEnvelope, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(envelope) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(envelope)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let text = this.decoder.decode(&chunk);
                    let frames = this.frames.push(&text);
                    this.accept(frames);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    this.drain_source();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
