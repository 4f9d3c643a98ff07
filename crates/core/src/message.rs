//! Chat messages and the response accumulator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{Part, StreamEnvelope};

/// Replaces a bot message whose stream failed.
pub const CONNECTION_ERROR_TEXT: &str = "Sorry, I encountered a connection error.";

/// First message of a fresh client.
pub const WELCOME_TEXT: &str = "Hello! How can I help you today?";

/// First message after starting a new chat or clearing history.
pub const NEW_CHAT_GREETING: &str = "안녕하세요, 무엇을 도와드릴까요?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single chat bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    /// Tool call, code and execution output lines, in arrival order.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Backend session this message was produced in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ref: Option<String>,
    /// Artifact name -> latest version announced while streaming.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into())
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text.into())
    }

    /// Empty bot message that a response stream accumulates into.
    pub fn placeholder() -> Self {
        Self::bot(String::new())
    }

    fn new(sender: Sender, text: String) -> Self {
        Self {
            text,
            sender,
            logs: Vec::new(),
            session_ref: None,
            artifacts: BTreeMap::new(),
        }
    }

    /// Fold one envelope into a copy of this message.
    ///
    /// Text parts concatenate, tool/code parts append log lines in part order,
    /// and an `error` field is appended to the text as an annotation.
    pub fn apply(&self, envelope: &StreamEnvelope) -> ChatMessage {
        let mut next = self.clone();

        if let Some(session_id) = envelope.session_id.as_deref().filter(|s| !s.is_empty()) {
            next.session_ref = Some(session_id.to_string());
        }

        for part in envelope.parts() {
            match part {
                Part::Text { text } => next.text.push_str(text),
                Part::Other => {}
                _ => {
                    if let Some(line) = part.log_line() {
                        next.logs.push(line);
                    }
                }
            }
        }

        if let Some(error) = envelope.error.as_deref().filter(|e| !e.is_empty()) {
            next.text.push_str(&format!("\n[Error: {}]", error));
        }

        if let Some(actions) = &envelope.actions {
            for (name, version) in &actions.artifact_delta {
                next.artifacts.insert(name.clone(), version_label(version));
            }
        }

        next
    }

    /// Copy of this message with its text replaced by the connection error.
    pub fn failed(&self) -> ChatMessage {
        ChatMessage {
            text: CONNECTION_ERROR_TEXT.to_string(),
            ..self.clone()
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

fn version_label(version: &Value) -> String {
    match version {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{CodeExecutionResult, ExecutableCode, FunctionCall};
    use serde_json::json;

    fn parse(json: &str) -> StreamEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_text_accumulates() {
        let msg = ChatMessage::placeholder()
            .apply(&parse(r#"{"content":{"parts":[{"text":"Hi"}]}}"#))
            .apply(&parse(r#"{"content":{"parts":[{"text":" there"}]}}"#));
        assert_eq!(msg.text, "Hi there");
        assert!(msg.logs.is_empty());
    }

    #[test]
    fn test_error_is_appended_not_terminal() {
        let msg = ChatMessage::placeholder()
            .apply(&StreamEnvelope::text("partial"))
            .apply(&parse(r#"{"error":"boom"}"#))
            .apply(&StreamEnvelope::text(" more"));
        assert_eq!(msg.text, "partial\n[Error: boom] more");
    }

    #[test]
    fn test_parts_apply_in_order() {
        let env = StreamEnvelope::with_parts(vec![
            Part::Text { text: "Checking. ".into() },
            Part::FunctionCall(FunctionCall {
                name: "list_tables".into(),
                args: json!({}),
            }),
            Part::ExecutableCode(ExecutableCode {
                code: "df.head()".into(),
                language: None,
            }),
            Part::CodeExecutionResult(CodeExecutionResult {
                outcome: "OUTCOME_OK".into(),
                output: "ok".into(),
            }),
            Part::Text { text: "Done.".into() },
        ]);

        let msg = ChatMessage::placeholder().apply(&env);
        assert_eq!(msg.text, "Checking. Done.");
        assert_eq!(
            msg.logs,
            vec![
                "🛠️ Tool Call: list_tables\nArgs: {}".to_string(),
                "💻 Code:\ndf.head()".to_string(),
                "⚙️ Output [OUTCOME_OK]:\nok".to_string(),
            ]
        );
    }

    #[test]
    fn test_logs_are_not_deduplicated() {
        let env = parse(r#"{"content":{"parts":[{"executable_code":{"code":"x"}}]}}"#);
        let msg = ChatMessage::placeholder().apply(&env).apply(&env);
        assert_eq!(msg.logs.len(), 2);
        assert_eq!(msg.logs[0], msg.logs[1]);
    }

    #[test]
    fn test_session_last_write_wins() {
        let msg = ChatMessage::placeholder()
            .apply(&StreamEnvelope::session("s-1"))
            .apply(&StreamEnvelope::session("s-2"))
            .apply(&StreamEnvelope::session(""));
        assert_eq!(msg.session_ref.as_deref(), Some("s-2"));
        assert!(msg.text.is_empty());
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let original = ChatMessage::placeholder();
        let next = original.apply(&StreamEnvelope::text("hello"));
        assert!(original.text.is_empty());
        assert_eq!(next.text, "hello");
    }

    #[test]
    fn test_artifacts_recorded() {
        let msg = ChatMessage::placeholder()
            .apply(&parse(r#"{"actions":{"artifact_delta":{"chart.png":"0"}}}"#))
            .apply(&parse(r#"{"actions":{"artifact_delta":{"chart.png":1}}}"#));
        assert_eq!(msg.artifacts["chart.png"], "1");
        assert!(msg.text.is_empty());
        assert!(msg.logs.is_empty());
    }

    #[test]
    fn test_failed_replaces_text_keeps_logs() {
        let msg = ChatMessage::placeholder()
            .apply(&parse(r#"{"content":{"parts":[{"text":"half"},{"executable_code":{"code":"1"}}]}}"#))
            .failed();
        assert_eq!(msg.text, CONNECTION_ERROR_TEXT);
        assert_eq!(msg.logs.len(), 1);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["sender"], "user");
    }
}
