//! One pass per inbound message: transcribe, respond, persist, speak

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::agent::{ChatClient, Responder};
use crate::config::Config;
use crate::context::{ContextBuilder, ContextConfig};
use crate::db::{DbPool, HistoryRepo, Turn, UserRepo};
use crate::outcome::Outcome;
use crate::voice::{FfmpegTranscoder, SpeechToText, TextToSpeech, Transcription};
use crate::{Error, Result};

/// What the user sent
#[derive(Debug, Clone)]
pub enum InboundContent {
    /// A typed message
    Text(String),
    /// A recorded clip on disk, in its source container
    Voice(PathBuf),
}

/// An inbound message from one user
#[derive(Debug, Clone)]
pub struct Inbound {
    pub user_id: String,
    /// Display name used to label the user's line in the prompt
    pub user_name: String,
    pub content: InboundContent,
    /// Render the reply as audio too
    pub speak: bool,
}

impl Inbound {
    /// A text message
    #[must_use]
    pub fn text(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            content: InboundContent::Text(text.into()),
            speak: false,
        }
    }

    /// A voice message stored at `path`
    #[must_use]
    pub fn voice(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            content: InboundContent::Voice(path.into()),
            speak: false,
        }
    }

    /// Ask for a synthesized reply
    #[must_use]
    pub const fn speak(mut self, speak: bool) -> Self {
        self.speak = speak;
        self
    }
}

/// Result of handling one message
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    /// Text to show the user
    pub text: String,
    /// Transcript of a voice message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Synthesized reply audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    /// The exchange was written to the conversation log
    pub saved: bool,
    /// `text` is a fixed fallback rather than a real reply
    pub fallback: bool,
}

/// Message pipeline shared by the CLI and the HTTP API
pub struct Pipeline {
    history: HistoryRepo,
    users: UserRepo,
    responder: Responder,
    transcription: Option<Transcription>,
    speech: Option<TextToSpeech>,
}

impl Pipeline {
    /// Create a text-only pipeline
    #[must_use]
    pub const fn new(history: HistoryRepo, users: UserRepo, responder: Responder) -> Self {
        Self {
            history,
            users,
            responder,
            transcription: None,
            speech: None,
        }
    }

    /// Enable voice messages
    #[must_use]
    pub fn with_transcription(mut self, transcription: Transcription) -> Self {
        self.transcription = Some(transcription);
        self
    }

    /// Enable synthesized replies
    #[must_use]
    pub fn with_speech(mut self, speech: TextToSpeech) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Wire every adapter from configuration
    ///
    /// Transcription is left disabled when ffmpeg cannot be found, synthesis
    /// when no `ElevenLabs` key is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the `OpenAI` key
    /// is missing
    pub fn from_config(config: &Config, pool: DbPool) -> Result<Self> {
        let client = config.http_client()?;
        let history = HistoryRepo::new(pool.clone());
        let users = UserRepo::new(pool);

        let chat = ChatClient::new(client.clone(), config.api_keys.openai.clone(), &config.llm)?;
        let context = ContextBuilder::new(ContextConfig::from(&config.llm));
        let responder = Responder::new(chat, context, history.clone());

        let stt = SpeechToText::new_whisper(
            client.clone(),
            config.api_keys.openai.clone(),
            &config.llm.base_url,
            config.voice.stt_model.clone(),
            config.voice.stt_language.clone(),
        )?;
        let mut pipeline = Self::new(history, users, responder);
        match FfmpegTranscoder::locate(config.voice.ffmpeg.clone()) {
            Some(transcoder) => {
                pipeline = pipeline.with_transcription(Transcription::new(Arc::new(transcoder), stt));
            }
            None => tracing::warn!("ffmpeg unavailable, voice messages disabled"),
        }

        if config.api_keys.elevenlabs.is_none() {
            tracing::info!("ELEVENLABS_API_KEY not set, synthesized replies disabled");
            return Ok(pipeline);
        }

        let speech =
            TextToSpeech::new_elevenlabs(client, config.api_keys.elevenlabs.clone(), &config.voice)?;
        Ok(pipeline.with_speech(speech))
    }

    /// Whether voice messages can be handled
    #[must_use]
    pub const fn accepts_voice(&self) -> bool {
        self.transcription.is_some()
    }

    /// Whether replies can be synthesized
    #[must_use]
    pub const fn can_speak(&self) -> bool {
        self.speech.is_some()
    }

    /// Conversation history backing this pipeline
    #[must_use]
    pub const fn history(&self) -> &HistoryRepo {
        &self.history
    }

    /// Handle one inbound message
    ///
    /// Upstream failures never fail the call: they show up as `fallback`,
    /// `saved: false` or a missing `audio`.
    ///
    /// # Errors
    ///
    /// Returns error if the user id is empty, a voice message arrives with
    /// transcription disabled, or the clip cannot be transcoded
    pub async fn handle(&self, inbound: Inbound) -> Result<Reply> {
        let Inbound {
            user_id,
            user_name,
            content,
            speak,
        } = inbound;

        if user_id.trim().is_empty() {
            return Err(Error::InvalidUserId(user_id));
        }

        let display_name = Some(user_name.as_str()).filter(|n| !n.is_empty());
        if let Err(e) = self.users.upsert(&user_id, display_name) {
            tracing::warn!(user_id = %user_id, error = %e, "failed to record user");
        }

        let (text, transcript) = match content {
            InboundContent::Text(text) => (text, None),
            InboundContent::Voice(path) => {
                let transcription = self.transcription.as_ref().ok_or_else(|| {
                    Error::Config("voice messages are not enabled".to_string())
                })?;

                match transcription.transcribe(&path).await? {
                    Outcome::Success(text) => {
                        tracing::debug!(user_id = %user_id, chars = text.len(), "transcribed voice message");
                        (text.clone(), Some(text))
                    }
                    Outcome::Fallback { value, .. } => {
                        return Ok(Reply {
                            text: value,
                            transcript: None,
                            audio: None,
                            saved: false,
                            fallback: true,
                        });
                    }
                }
            }
        };

        let outcome = self.responder.respond(&user_id, &user_name, &text).await;
        let fallback = outcome.is_fallback();
        let reply = outcome.into_inner();

        let saved = if fallback {
            tracing::debug!(user_id = %user_id, "not saving failed exchange");
            false
        } else {
            self.history
                .append_turns(&user_id, &[Turn::user(text), Turn::bot(reply.clone())])
        };

        let audio = match (&self.speech, speak) {
            (Some(speech), true) => speech.synthesize(&user_id, &reply).await.into_inner(),
            (None, true) => {
                tracing::debug!(user_id = %user_id, "speech requested but synthesis is disabled");
                None
            }
            (_, false) => None,
        };

        Ok(Reply {
            text: reply,
            transcript,
            audio,
            saved,
            fallback,
        })
    }
}
