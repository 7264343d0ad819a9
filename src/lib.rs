//! Murmur - a voice-capable chat-bot backend
//!
//! This library stitches together the services behind the bot:
//! - Conversation history (per-user append-only logs, windowed reads)
//! - Reply generation via an `OpenAI`-compatible chat API
//! - Voice messages (ffmpeg transcoding, Whisper STT, `ElevenLabs` TTS)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │           HTTP API (axum)   │   CLI (clap)           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Pipeline                          │
//! │  Transcription → Responder → History → Synthesis     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                External services                     │
//! │   Chat API  │  Whisper  │  ElevenLabs  │  SQLite     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod voice;

pub use agent::{ChatClient, FALLBACK_REPLY, Responder};
pub use config::Config;
pub use context::{ContextBuilder, ContextConfig, window};
pub use db::{DbConn, DbPool, HistoryRepo, Turn, UserRepo};
pub use error::{Error, Result};
pub use outcome::Outcome;
pub use pipeline::{Inbound, InboundContent, Pipeline, Reply};
pub use voice::{TRANSCRIPTION_FALLBACK, TextToSpeech, Transcription};
