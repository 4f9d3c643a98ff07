//! Offline demo mode: canned answers for a fixed set of questions.

pub mod catalog;
pub mod payload;
pub mod render;
pub mod responder;

pub use catalog::{CannedCatalog, CannedEntry, NOT_FOUND_TEXT};
pub use payload::{CannedPayload, DualTableMarkers, TitledTable};
pub use render::render_html;
pub use responder::{CannedResponder, DelayWindow};
