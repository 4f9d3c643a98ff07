//! Chat state container.
//!
//! All mutation goes through [`ChatState::reduce`], which returns a fresh
//! state and leaves the previous one untouched. Only the last bot message is
//! ever rewritten, and only while a response is open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::envelope::StreamEnvelope;
use crate::error::ChatError;
use crate::message::{ChatMessage, Sender, NEW_CHAT_GREETING, WELCOME_TEXT};

/// Longest history title kept from a conversation's first message.
const HISTORY_TITLE_CHARS: usize = 40;

/// Lifecycle of the most recent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePhase {
    /// Nothing has been sent yet in this conversation.
    Idle,
    /// Placeholder created, no envelope applied yet.
    Open,
    Accumulating,
    /// Stream exhausted normally.
    Closed,
    /// Transport or read failure.
    Failed,
}

impl ResponsePhase {
    pub fn is_streaming(self) -> bool {
        matches!(self, ResponsePhase::Open | ResponsePhase::Accumulating)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    UserSent { text: String },
    EnvelopeApplied(StreamEnvelope),
    StreamClosed,
    StreamFailed { reason: String },
    /// Archive the conversation and start over with a greeting.
    NewChat,
    /// Forget archived conversations and start over.
    ClearHistory,
}

/// A past conversation listed in the history sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    messages: Vec<ChatMessage>,
    session_id: Option<String>,
    phase: ResponsePhase,
    history: Vec<HistoryEntry>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::bot(WELCOME_TEXT)],
            session_id: None,
            phase: ResponsePhase::Idle,
            history: Vec::new(),
        }
    }

    /// Start from an existing backend session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn phase(&self) -> ResponsePhase {
        self.phase
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// True while a response is open; drives the typing indicator and the
    /// busy check on new sends.
    pub fn is_typing(&self) -> bool {
        self.phase.is_streaming()
    }

    /// The bot message currently being written, if a response is open.
    pub fn active_message(&self) -> Option<&ChatMessage> {
        if self.is_typing() {
            self.messages.last()
        } else {
            None
        }
    }

    /// Apply an action, producing the next state.
    ///
    /// Errors leave `self` as it was: sending or resetting while a response
    /// is streaming yields [`ChatError::Busy`], and stream actions with no
    /// open response yield [`ChatError::NoActiveResponse`].
    pub fn reduce(&self, action: Action) -> Result<ChatState, ChatError> {
        match action {
            Action::UserSent { text } => {
                self.ensure_idle()?;
                if text.trim().is_empty() {
                    return Err(ChatError::EmptyMessage);
                }
                let mut next = self.clone();
                next.messages.push(ChatMessage::user(text));
                next.messages.push(ChatMessage::placeholder());
                next.phase = ResponsePhase::Open;
                debug!(messages = next.messages.len(), "Response opened");
                Ok(next)
            }
            Action::EnvelopeApplied(envelope) => {
                self.ensure_streaming()?;
                let mut next = self.clone();
                next.replace_active(|msg| msg.apply(&envelope));
                if let Some(id) = envelope.session_id.filter(|s| !s.is_empty()) {
                    next.session_id = Some(id);
                }
                next.phase = ResponsePhase::Accumulating;
                Ok(next)
            }
            Action::StreamClosed => {
                self.ensure_streaming()?;
                let mut next = self.clone();
                next.phase = ResponsePhase::Closed;
                debug!("Response closed");
                Ok(next)
            }
            Action::StreamFailed { reason } => {
                self.ensure_streaming()?;
                warn!(reason = %reason, "Response stream failed");
                let mut next = self.clone();
                next.replace_active(ChatMessage::failed);
                next.phase = ResponsePhase::Failed;
                Ok(next)
            }
            Action::NewChat => {
                self.ensure_idle()?;
                let mut history = self.history.clone();
                if let Some(title) = self.conversation_title() {
                    history.push(HistoryEntry {
                        title,
                        archived_at: Utc::now(),
                    });
                }
                Ok(ChatState {
                    messages: vec![ChatMessage::bot(NEW_CHAT_GREETING)],
                    session_id: None,
                    phase: ResponsePhase::Idle,
                    history,
                })
            }
            Action::ClearHistory => {
                self.ensure_idle()?;
                Ok(ChatState {
                    messages: vec![ChatMessage::bot(NEW_CHAT_GREETING)],
                    session_id: None,
                    phase: ResponsePhase::Idle,
                    history: Vec::new(),
                })
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), ChatError> {
        if self.is_typing() {
            Err(ChatError::Busy)
        } else {
            Ok(())
        }
    }

    fn ensure_streaming(&self) -> Result<(), ChatError> {
        if self.is_typing() {
            Ok(())
        } else {
            Err(ChatError::NoActiveResponse)
        }
    }

    fn replace_active(&mut self, f: impl FnOnce(&ChatMessage) -> ChatMessage) {
        if let Some(last) = self.messages.last_mut() {
            *last = f(&*last);
        }
    }

    /// Title for the history list: the first user message, shortened.
    fn conversation_title(&self) -> Option<String> {
        let first = self
            .messages
            .iter()
            .find(|m| m.sender == Sender::User)?;
        let mut title: String = first.text.trim().chars().take(HISTORY_TITLE_CHARS).collect();
        if first.text.trim().chars().count() > HISTORY_TITLE_CHARS {
            title.push_str("...");
        }
        Some(title)
    }
}
