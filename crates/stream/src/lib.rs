//! Agent event-stream ingestion.
//!
//! Bytes from the agent's `text/event-stream` response flow through
//! [`Utf8Decoder`] and [`FrameBuffer`] into [`parse_frame`], surfacing as a
//! stream of [`StreamEnvelope`](datachat_core::StreamEnvelope)s that
//! [`ChatSession`] folds into chat state.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod parser;
pub mod reader;
pub mod request;
pub mod session;
pub mod transport;

pub use decoder::Utf8Decoder;
pub use error::StreamError;
pub use frame::FrameBuffer;
pub use parser::{parse_frame, FrameOutcome};
pub use reader::EnvelopeStream;
pub use request::{AgentRunRequest, Attachment};
pub use session::{ChatSession, TurnOutcome};
pub use transport::{AgentTransport, ByteStream, HttpTransport};
