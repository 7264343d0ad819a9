//! TOML configuration file loading
//!
//! Supports `~/.config/murmur/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MurmurConfigFile {
    /// Chat-completion configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Conversation store configuration
    #[serde(default)]
    pub store: StoreFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,

    /// Base URL of the chat-completion API
    pub base_url: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Preamble placed before the dialogue in every prompt
    pub default_prompt: Option<String>,

    /// Label for bot turns in the prompt
    pub ai_prefix: Option<String>,

    /// Label for user turns in the prompt
    pub human_prefix: Option<String>,

    /// Number of past turns fed back to the model
    pub history_window: Option<usize>,
}

/// Conversation store configuration
#[derive(Debug, Default, Deserialize)]
pub struct StoreFileConfig {
    /// Connection string (directory holding the database, or ":memory:")
    pub url: Option<String>,

    /// Database name
    pub name: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Transcription language (ISO 639-1)
    pub stt_language: Option<String>,

    /// Path to the ffmpeg binary
    pub ffmpeg: Option<String>,

    /// Base URL of the TTS API
    pub tts_base_url: Option<String>,

    /// TTS voice identifier
    pub tts_voice: Option<String>,

    /// TTS model (e.g. "eleven_monolingual_v1")
    pub tts_model: Option<String>,

    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,

    /// Directory for synthesized replies
    pub output_dir: Option<String>,

    /// Directory for uploaded voice messages
    pub input_dir: Option<String>,

    /// File name of the synthesized reply within a user's directory
    pub file_name: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Per-request timeout for upstream HTTP calls
    pub http_timeout_secs: Option<u64>,
}

/// Load the TOML config file from `MURMUR_CONFIG` or the standard path
///
/// Returns `MurmurConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MurmurConfigFile {
    let path = std::env::var("MURMUR_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    match path {
        Some(path) => load_from(&path),
        None => MurmurConfigFile::default(),
    }
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_from(path: &Path) -> MurmurConfigFile {
    if !path.exists() {
        return MurmurConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MurmurConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MurmurConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/murmur/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("murmur").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let config = load_from(Path::new("/nonexistent/murmur/config.toml"));
        assert!(config.llm.model.is_none());
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [llm]
            model = "gpt-4o"
            history_window = 8

            [voice]
            tts_voice = "custom-voice"
            "#,
        )
        .unwrap();

        let config = load_from(&path);
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.llm.history_window, Some(8));
        assert_eq!(config.voice.tts_voice.as_deref(), Some("custom-voice"));
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_unparsable_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nmodel = ").unwrap();

        let config = load_from(&path);
        assert!(config.llm.model.is_none());
    }
}
