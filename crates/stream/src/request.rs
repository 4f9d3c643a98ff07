//! Request body for the agent's `run_sse` endpoint.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use datachat_core::config::AgentConfig;
use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Largest file accepted as an inline attachment.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunRequest {
    pub app_name: String,
    pub user_id: String,
    /// `null` on the first turn; the backend then creates a session and
    /// announces it in the first envelope.
    pub session_id: Option<String>,
    pub new_message: NewMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub parts: Vec<MessagePart>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded).
    pub data: String,
}

impl AgentRunRequest {
    pub fn new(agent: &AgentConfig, session_id: Option<&str>, text: &str) -> Self {
        Self {
            app_name: agent.app_name.clone(),
            user_id: agent.user_id.clone(),
            session_id: session_id.map(str::to_string),
            new_message: NewMessage {
                parts: vec![MessagePart::Text {
                    text: text.to_string(),
                }],
                role: "user".to_string(),
            },
        }
    }

    pub fn with_attachment(mut self, attachment: &Attachment) -> Self {
        self.new_message.parts.push(MessagePart::InlineData {
            inline_data: attachment.to_inline_data(),
        });
        self
    }
}

/// A file sent alongside a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for_path(Path::new(&file_name)).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, StreamError> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(StreamError::Attachment(format!("{} is not a file", path.display())));
        }
        if meta.len() > MAX_ATTACHMENT_BYTES as u64 {
            return Err(StreamError::Attachment(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                meta.len(),
                MAX_ATTACHMENT_BYTES
            )));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StreamError::Attachment(format!("{} is not a file", path.display())))?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn to_inline_data(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: STANDARD.encode(&self.bytes),
        }
    }
}

/// MIME type by file extension, for the formats the data agent understands.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "json" => "application/json",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    }
}
