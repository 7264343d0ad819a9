//! Configuration management for murmur
//!
//! Settings are resolved once at start-up, in order of precedence:
//! environment variables, the TOML config file, built-in defaults.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use self::file::MurmurConfigFile;
use crate::{Error, Result};

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default number of past turns fed back to the model
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Connection string selecting an in-memory store
pub const MEMORY_STORE_URL: &str = ":memory:";

/// murmur configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database by default)
    pub data_dir: PathBuf,

    /// API keys
    pub api_keys: ApiKeys,

    /// Chat-completion configuration
    pub llm: LlmConfig,

    /// Conversation store configuration
    pub store: StoreConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// HTTP server and client configuration
    pub server: ServerConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (chat completions and Whisper)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (speech synthesis)
    pub elevenlabs: Option<SecretString>,
}

/// Chat-completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Base URL of the chat-completion API (without `/chat/completions`)
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Preamble placed before the dialogue in every prompt
    pub default_prompt: String,

    /// Label for bot turns
    pub ai_prefix: String,

    /// Label for user turns in history
    pub human_prefix: String,

    /// Number of past turns fed back to the model
    pub history_window: usize,
}

/// Conversation store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection string: a directory, or `:memory:`
    pub url: String,

    /// Database name; the file is `<url>/<name>.db`
    pub name: String,
}

impl StoreConfig {
    /// Resolve the database file path, `None` for an in-memory store
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.url == MEMORY_STORE_URL {
            return None;
        }

        let dir = self.url.strip_prefix("sqlite://").unwrap_or(&self.url);
        Some(PathBuf::from(dir).join(format!("{}.db", self.name)))
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// Transcription language (ISO 639-1)
    pub stt_language: String,

    /// Explicit ffmpeg binary, otherwise looked up on `PATH`
    pub ffmpeg: Option<PathBuf>,

    /// Base URL of the TTS API
    pub tts_base_url: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS model identifier
    pub tts_model: String,

    /// Voice stability (0.0 to 1.0)
    pub stability: f32,

    /// Voice similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,

    /// Directory for synthesized replies, one subdirectory per user
    pub output_dir: PathBuf,

    /// Directory for uploaded voice messages, one subdirectory per user
    pub input_dir: PathBuf,

    /// File name of the synthesized reply
    pub file_name: String,
}

/// HTTP server and client configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Timeout applied to every upstream HTTP request
    pub http_timeout: Duration,
}

/// Return the platform data directory (`~/.local/share/murmur` on Linux)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "omni", "murmur")
        .map_or_else(|| PathBuf::from(".murmur"), |d| d.data_dir().to_path_buf())
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn load() -> Result<Self> {
        let file = file::load_config_file();
        Self::from_sources(&file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and a variable lookup
    ///
    /// `lookup` takes precedence over `file`, which takes precedence over defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed or is out of range
    pub fn from_sources<F>(file: &MurmurConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_keys = ApiKeys {
            openai: var("OPENAI_API_KEY")
                .or_else(|| file.api_keys.openai.clone())
                .map(SecretString::from),
            elevenlabs: var("ELEVENLABS_API_KEY")
                .or_else(|| file.api_keys.elevenlabs.clone())
                .map(SecretString::from),
        };

        let history_window = parse_or(
            "MURMUR_HISTORY_WINDOW",
            var("MURMUR_HISTORY_WINDOW"),
            file.llm.history_window,
            DEFAULT_HISTORY_WINDOW,
        )?;
        if history_window == 0 {
            return Err(Error::Config(
                "MURMUR_HISTORY_WINDOW must be at least 1".to_string(),
            ));
        }

        // DEFAULT_PROMPT keeps surrounding whitespace and may be empty
        let default_prompt = lookup("DEFAULT_PROMPT")
            .or_else(|| file.llm.default_prompt.clone())
            .unwrap_or_else(|| "Default Prompt: ".to_string());

        let llm = LlmConfig {
            model: var("OPENAI_MODEL")
                .or_else(|| file.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: var("OPENAI_BASE_URL")
                .or_else(|| file.llm.base_url.clone())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            temperature: parse_or(
                "MURMUR_TEMPERATURE",
                var("MURMUR_TEMPERATURE"),
                file.llm.temperature,
                0.75,
            )?,
            default_prompt,
            ai_prefix: var("AI_PREFIX")
                .or_else(|| file.llm.ai_prefix.clone())
                .unwrap_or_else(|| "AI".to_string()),
            human_prefix: var("HUMAN_PREFIX")
                .or_else(|| file.llm.human_prefix.clone())
                .unwrap_or_else(|| "User".to_string()),
            history_window,
        };

        let data_dir = default_data_dir();

        let store = StoreConfig {
            url: var("DATABASE_URL")
                .or_else(|| file.store.url.clone())
                .unwrap_or_else(|| data_dir.to_string_lossy().into_owned()),
            name: var("DATABASE_NAME")
                .or_else(|| file.store.name.clone())
                .unwrap_or_else(|| "murmur".to_string()),
        };

        let voice = VoiceConfig {
            stt_model: var("MURMUR_STT_MODEL")
                .or_else(|| file.voice.stt_model.clone())
                .unwrap_or_else(|| "whisper-1".to_string()),
            stt_language: var("MURMUR_STT_LANGUAGE")
                .or_else(|| file.voice.stt_language.clone())
                .unwrap_or_else(|| "en".to_string()),
            ffmpeg: var("MURMUR_FFMPEG")
                .or_else(|| file.voice.ffmpeg.clone())
                .map(PathBuf::from),
            tts_base_url: var("ELEVENLABS_BASE_URL")
                .or_else(|| file.voice.tts_base_url.clone())
                .unwrap_or_else(|| "https://api.elevenlabs.io".to_string()),
            tts_voice: var("MURMUR_TTS_VOICE")
                .or_else(|| file.voice.tts_voice.clone())
                .unwrap_or_else(|| "MF3mGyEYCl7XYWbV9V6O".to_string()),
            tts_model: var("MURMUR_TTS_MODEL")
                .or_else(|| file.voice.tts_model.clone())
                .unwrap_or_else(|| "eleven_monolingual_v1".to_string()),
            stability: parse_or(
                "MURMUR_TTS_STABILITY",
                var("MURMUR_TTS_STABILITY"),
                file.voice.stability,
                0.5,
            )?,
            similarity_boost: parse_or(
                "MURMUR_TTS_SIMILARITY",
                var("MURMUR_TTS_SIMILARITY"),
                file.voice.similarity_boost,
                0.5,
            )?,
            output_dir: var("MURMUR_AUDIO_OUTPUT_DIR")
                .or_else(|| file.voice.output_dir.clone())
                .map_or_else(|| PathBuf::from("audio_outputs"), PathBuf::from),
            input_dir: var("MURMUR_AUDIO_INPUT_DIR")
                .or_else(|| file.voice.input_dir.clone())
                .map_or_else(|| PathBuf::from("audio_inputs"), PathBuf::from),
            file_name: var("MURMUR_TTS_FILE_NAME")
                .or_else(|| file.voice.file_name.clone())
                .unwrap_or_else(|| "reply.mp3".to_string()),
        };

        let server = ServerConfig {
            port: parse_or("MURMUR_PORT", var("MURMUR_PORT"), file.server.port, 8080)?,
            http_timeout: Duration::from_secs(parse_or(
                "MURMUR_HTTP_TIMEOUT_SECS",
                var("MURMUR_HTTP_TIMEOUT_SECS"),
                file.server.http_timeout_secs,
                60,
            )?),
        };

        Ok(Self {
            data_dir,
            api_keys,
            llm,
            store,
            voice,
            server,
        })
    }

    /// Build the shared HTTP client used by every upstream adapter
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be constructed
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.server.http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))
    }
}

/// Parse an environment value, else take the file value, else the default
fn parse_or<T: FromStr>(
    key: &str,
    raw: Option<String>,
    from_file: Option<T>,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid value for {key} ({raw:?}): {e}"))),
        None => Ok(from_file.unwrap_or(default)),
    }
}
