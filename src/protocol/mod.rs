//! Chat protocol types
//!
//! `types` holds what browsers send to and receive from the proxy;
//! `messages` holds the OpenAI-compatible wire format spoken upstream.

mod messages;
mod types;

pub use messages::*;
pub use types::*;
