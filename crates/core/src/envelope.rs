//! Wire types for the agent's event stream.
//!
//! Every SSE frame carries one JSON [`StreamEnvelope`]. The backend dumps its
//! runner events with `exclude_none`, so any field may be missing and unknown
//! fields (`author`, `invocation_id`, `partial`, ...) are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed JSON object carried by a single SSE event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Side-channel signals, currently only artifact version bumps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
}

impl StreamEnvelope {
    /// Envelope announcing the backend session.
    pub fn session(id: impl Into<String>) -> Self {
        Self {
            session_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Envelope carrying a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_parts(vec![Part::Text { text: text.into() }])
    }

    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            content: Some(Content {
                role: None,
                parts: Some(parts),
            }),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Parts of the content block, empty when the envelope has none.
    pub fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .and_then(|c| c.parts.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actions {
    /// Artifact name -> version. Versions arrive as strings from the SSE
    /// bridge and as integers from the raw runner, so keep them untyped here.
    #[serde(default)]
    pub artifact_delta: BTreeMap<String, Value>,
}

/// One unit of agent output within an envelope.
///
/// The wire format is an object with one populated key. The variant is chosen
/// once while deserializing; a part that carries none of the known keys (a
/// thought signature, inline data, ...) becomes [`Part::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPart", into = "RawPart")]
pub enum Part {
    Text { text: String },
    FunctionCall(FunctionCall),
    ExecutableCode(ExecutableCode),
    CodeExecutionResult(CodeExecutionResult),
    Other,
}

impl Part {
    /// Log line this part contributes to a bot message, if any.
    pub fn log_line(&self) -> Option<String> {
        match self {
            Part::FunctionCall(call) => Some(format!(
                "🛠️ Tool Call: {}\nArgs: {}",
                call.name,
                serde_json::to_string(&call.args).unwrap_or_else(|_| call.args.to_string())
            )),
            Part::ExecutableCode(code) => Some(format!("💻 Code:\n{}", code.code)),
            Part::CodeExecutionResult(result) => Some(format!(
                "⚙️ Output [{}]:\n{}",
                result.outcome, result.output
            )),
            Part::Text { .. } | Part::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutableCode {
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeExecutionResult {
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub output: String,
}

/// Shape of a part as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        alias = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<FunctionCall>,
    #[serde(
        default,
        alias = "executableCode",
        skip_serializing_if = "Option::is_none"
    )]
    executable_code: Option<ExecutableCode>,
    #[serde(
        default,
        alias = "codeExecutionResult",
        skip_serializing_if = "Option::is_none"
    )]
    code_execution_result: Option<CodeExecutionResult>,
}

impl From<RawPart> for Part {
    fn from(raw: RawPart) -> Self {
        // An empty text key next to a tool call must not hide the call.
        if let Some(text) = raw.text.filter(|t| !t.is_empty()) {
            Part::Text { text }
        } else if let Some(call) = raw.function_call {
            Part::FunctionCall(call)
        } else if let Some(code) = raw.executable_code {
            Part::ExecutableCode(code)
        } else if let Some(result) = raw.code_execution_result {
            Part::CodeExecutionResult(result)
        } else {
            Part::Other
        }
    }
}

impl From<Part> for RawPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text { text } => RawPart {
                text: Some(text),
                ..RawPart::default()
            },
            Part::FunctionCall(call) => RawPart {
                function_call: Some(call),
                ..RawPart::default()
            },
            Part::ExecutableCode(code) => RawPart {
                executable_code: Some(code),
                ..RawPart::default()
            },
            Part::CodeExecutionResult(result) => RawPart {
                code_execution_result: Some(result),
                ..RawPart::default()
            },
            Part::Other => RawPart::default(),
        }
    }
}
