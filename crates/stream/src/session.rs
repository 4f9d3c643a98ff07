//! Drives one chat conversation: sends turns and folds the streamed
//! envelopes into [`ChatState`].

use std::sync::Arc;

use datachat_core::config::AgentConfig;
use datachat_core::{Action, ChatError, ChatState};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::reader::EnvelopeStream;
use crate::request::{AgentRunRequest, Attachment};
use crate::transport::AgentTransport;

/// How a turn's response ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Stream exhausted; `envelopes` were applied.
    Closed { envelopes: usize },
    /// Transport or read failure; the bot message shows the connection error.
    Failed { reason: String },
}

pub struct ChatSession {
    transport: Arc<dyn AgentTransport>,
    agent: AgentConfig,
    state: ChatState,
    staged: Vec<Attachment>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn AgentTransport>, agent: AgentConfig) -> Self {
        Self {
            transport,
            agent,
            state: ChatState::new(),
            staged: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: ChatState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn transport(&self) -> &dyn AgentTransport {
        self.transport.as_ref()
    }

    /// Apply a non-streaming action such as [`Action::NewChat`].
    pub fn dispatch(&mut self, action: Action) -> Result<&ChatState, ChatError> {
        self.state = self.state.reduce(action)?;
        Ok(&self.state)
    }

    /// Queue a file for the next message.
    pub fn stage_attachment(&mut self, attachment: Attachment) {
        self.staged.push(attachment);
    }

    pub fn staged_attachments(&self) -> &[Attachment] {
        &self.staged
    }

    /// Send one user message and consume the response stream to its end.
    ///
    /// `on_update` sees every intermediate state. Transport failures are not
    /// errors here: they close the turn as [`TurnOutcome::Failed`]. The only
    /// errors are rejected sends (busy or empty). Dropping the returned future
    /// mid-stream fails the open response, so the session stays usable.
    pub async fn send<F>(&mut self, text: &str, mut on_update: F) -> Result<TurnOutcome, ChatError>
    where
        F: FnMut(&ChatState),
    {
        let mut turn = OpenTurn::begin(&mut self.state, text)?;
        on_update(turn.state());

        let mut request = AgentRunRequest::new(&self.agent, turn.state().session_id(), text);
        for attachment in self.staged.drain(..) {
            debug!(file = %attachment.file_name, mime = %attachment.mime_type, "Attaching file");
            request = request.with_attachment(&attachment);
        }

        let outcome = match self.transport.open(&request).await {
            Ok(bytes) => {
                let mut envelopes = EnvelopeStream::new(bytes);
                let mut applied = 0usize;
                let mut failure = None;
                while let Some(item) = envelopes.next().await {
                    match item {
                        Ok(envelope) => {
                            turn.apply(Action::EnvelopeApplied(envelope))?;
                            applied += 1;
                            on_update(turn.state());
                        }
                        Err(e) => {
                            failure = Some(e.to_string());
                            break;
                        }
                    }
                }
                match failure {
                    Some(reason) => TurnOutcome::Failed { reason },
                    None => TurnOutcome::Closed { envelopes: applied },
                }
            }
            Err(e) => TurnOutcome::Failed {
                reason: e.to_string(),
            },
        };

        let closing = match &outcome {
            TurnOutcome::Closed { envelopes } => {
                info!(envelopes, session_id = turn.state().session_id().unwrap_or(""), "Turn complete");
                Action::StreamClosed
            }
            TurnOutcome::Failed { reason } => Action::StreamFailed {
                reason: reason.clone(),
            },
        };
        turn.finish(closing)?;
        on_update(&self.state);

        Ok(outcome)
    }
}

/// Reason recorded when a turn is abandoned before its stream ends.
pub const CANCELLED_REASON: &str = "cancelled";

/// A response in flight. If it is dropped before [`OpenTurn::finish`], the
/// response is failed so the next send is not rejected as busy.
struct OpenTurn<'a> {
    state: &'a mut ChatState,
    finished: bool,
}

impl<'a> OpenTurn<'a> {
    fn begin(state: &'a mut ChatState, text: &str) -> Result<Self, ChatError> {
        *state = state.reduce(Action::UserSent {
            text: text.to_string(),
        })?;
        Ok(Self {
            state,
            finished: false,
        })
    }

    fn state(&self) -> &ChatState {
        self.state
    }

    fn apply(&mut self, action: Action) -> Result<(), ChatError> {
        *self.state = self.state.reduce(action)?;
        Ok(())
    }

    fn finish(mut self, action: Action) -> Result<(), ChatError> {
        self.apply(action)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for OpenTurn<'_> {
    fn drop(&mut self) {
        if self.finished || !self.state.is_typing() {
            return;
        }
        warn!("Turn dropped before its stream ended");
        if let Ok(next) = self.state.reduce(Action::StreamFailed {
            reason: CANCELLED_REASON.to_string(),
        }) {
            *self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::transport::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use datachat_core::{ResponsePhase, CONNECTION_ERROR_TEXT};
    use std::sync::Mutex;

    /// Replays fixed chunks and records the requests it saw.
    struct ScriptedTransport {
        chunks: Vec<Result<&'static str, &'static str>>,
        fail_open: bool,
        requests: Mutex<Vec<AgentRunRequest>>,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<Result<&'static str, &'static str>>) -> Self {
            Self {
                chunks,
                fail_open: false,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentTransport for ScriptedTransport {
        async fn open(&self, request: &AgentRunRequest) -> Result<ByteStream, StreamError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_open {
                return Err(StreamError::Read("connection refused".into()));
            }
            let items: Vec<Result<Bytes, StreamError>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(text) => Ok(Bytes::from(text.to_string())),
                    Err(reason) => Err(StreamError::Read(reason.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn agent() -> AgentConfig {
        AgentConfig {
            base_url: "http://test".into(),
            app_name: "data_agent_chatbot".into(),
            user_id: "local_user".into(),
            connect_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_turn_accumulates_and_closes() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok("data: {\"session_id\":\"s-9\"}\n\ndata: {\"content\":{\"parts\":[{\"text\":\"Hi\"}]}}\n\n"),
            Ok("data: {\"content\":{\"parts\":[{\"text\":\" there\"}]}}\n\n"),
        ]));
        let mut session = ChatSession::new(transport.clone(), agent());

        let mut typing_seen = Vec::new();
        let outcome = session
            .send("hello", |state| typing_seen.push(state.is_typing()))
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Closed { envelopes: 3 });
        assert_eq!(typing_seen, vec![true, true, true, true, false]);

        let state = session.state();
        assert_eq!(state.phase(), ResponsePhase::Closed);
        assert_eq!(state.messages().last().unwrap().text, "Hi there");
        assert_eq!(state.session_id(), Some("s-9"));
    }

    #[tokio::test]
    async fn test_session_id_sent_on_next_turn() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(
            "data: {\"session_id\":\"s-1\"}\n\n",
        )]));
        let mut session = ChatSession::new(transport.clone(), agent());

        session.send("one", |_| {}).await.unwrap();
        session.send("two", |_| {}).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn test_read_failure_before_any_envelope() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err("reset by peer")]));
        let mut session = ChatSession::new(transport, agent());

        let outcome = session.send("hello", |_| {}).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed { ref reason } if reason.contains("reset by peer")));

        let last = session.state().messages().last().unwrap();
        assert_eq!(last.text, CONNECTION_ERROR_TEXT);
        assert!(last.logs.is_empty());
        assert_eq!(session.state().phase(), ResponsePhase::Failed);
    }

    #[tokio::test]
    async fn test_open_failure_is_not_fatal() {
        let mut transport = ScriptedTransport::new(vec![Ok(
            "data: {\"content\":{\"parts\":[{\"text\":\"ok\"}]}}\n\n",
        )]);
        transport.fail_open = true;
        let mut session = ChatSession::new(Arc::new(transport), agent());

        let outcome = session.send("first", |_| {}).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        // A later send is still accepted.
        assert!(session.send("second", |_| {}).await.is_ok());
        assert_eq!(session.state().messages().len(), 5);
    }

    #[tokio::test]
    async fn test_error_envelope_keeps_streaming() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(concat!(
            "data: {\"content\":{\"parts\":[{\"text\":\"a\"}]}}\n\n",
            "data: {\"error\":\"boom\"}\n\n",
            "data: {\"content\":{\"parts\":[{\"text\":\"b\"}]}}\n\n",
        ))]));
        let mut session = ChatSession::new(transport, agent());
        session.send("go", |_| {}).await.unwrap();
        assert_eq!(
            session.state().messages().last().unwrap().text,
            "a\n[Error: boom]b"
        );
    }

    #[tokio::test]
    async fn test_staged_attachment_sent_once() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut session = ChatSession::new(transport.clone(), agent());
        session.stage_attachment(Attachment::new("data.csv", b"x,y".to_vec()));
        assert_eq!(session.staged_attachments().len(), 1);

        session.send("analyze", |_| {}).await.unwrap();
        session.send("again", |_| {}).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].new_message.parts.len(), 2);
        assert_eq!(requests[1].new_message.parts.len(), 1);
        assert!(session.staged_attachments().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut session = ChatSession::new(transport.clone(), agent());
        assert!(matches!(
            session.send("  ", |_| {}).await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    /// Stalls forever on the first turn, answers normally afterwards.
    struct StallOnceTransport {
        opened: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl AgentTransport for StallOnceTransport {
        async fn open(&self, _request: &AgentRunRequest) -> Result<ByteStream, StreamError> {
            let n = self.opened.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                let first = futures::stream::iter(vec![Ok::<_, StreamError>(Bytes::from(
                    "data: {\"content\":{\"parts\":[{\"text\":\"part\"}]}}\n\n",
                ))]);
                return Ok(Box::pin(first.chain(futures::stream::pending())));
            }
            Ok(Box::pin(futures::stream::iter(vec![Ok(Bytes::from(
                "data: {\"content\":{\"parts\":[{\"text\":\"ok\"}]}}\n\n",
            ))])))
        }

        fn describe(&self) -> String {
            "stall-once".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_turn_does_not_leave_session_busy() {
        let transport = Arc::new(StallOnceTransport {
            opened: std::sync::atomic::AtomicUsize::new(0),
        });
        let mut session = ChatSession::new(transport, agent());

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            session.send("hi", |_| {}),
        )
        .await;
        assert!(timed_out.is_err());

        assert_eq!(session.state().phase(), ResponsePhase::Failed);
        assert_eq!(session.state().messages().last().unwrap().text, CONNECTION_ERROR_TEXT);

        let outcome = session.send("again", |_| {}).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Closed { envelopes: 1 });
        assert_eq!(session.state().messages().last().unwrap().text, "ok");
        assert!(session.dispatch(Action::NewChat).is_ok());
        assert!(session.dispatch(Action::ClearHistory).is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_new_chat() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut session = ChatSession::new(transport, agent());
        session.send("first question", |_| {}).await.unwrap();
        let state = session.dispatch(Action::NewChat).unwrap();
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.messages().len(), 1);
    }
}
