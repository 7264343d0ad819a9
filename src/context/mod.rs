//! Context building for bot conversations
//!
//! Combines:
//! - A fixed prompt preamble
//! - The windowed conversation history
//! - The new user input

mod builder;
mod window;

pub use builder::{BuiltContext, ContextBuilder, ContextConfig};
pub use window::window;
