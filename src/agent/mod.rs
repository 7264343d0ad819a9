//! Conversation responder
//!
//! Turns the windowed history plus the new user text into a reply from a
//! chat-completion model.

mod chat;
mod responder;

pub use chat::ChatClient;
pub use responder::{FALLBACK_REPLY, Responder};
