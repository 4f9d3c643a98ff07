#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("agent returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream read failed: {0}")]
    Read(String),
    #[error("attachment error: {0}")]
    Attachment(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
