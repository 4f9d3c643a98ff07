pub mod config;
pub mod envelope;
pub mod error;
pub mod message;
pub mod state;

pub use config::Config;
pub use envelope::*;
pub use error::*;
pub use message::*;
pub use state::*;
