//! Text-to-speech (TTS) processing

use std::path::{Path, PathBuf};

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;

use crate::config::VoiceConfig;
use crate::outcome::Outcome;
use crate::{Error, Result};

/// Synthesizes speech from text with `ElevenLabs` and stores it per user
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    voice_id: String,
    model: String,
    stability: f32,
    similarity_boost: f32,
    output_dir: PathBuf,
    file_name: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(
        client: reqwest::Client,
        api_key: Option<SecretString>,
        config: &VoiceConfig,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("ElevenLabs API key required for TTS".to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.tts_base_url.trim_end_matches('/').to_string(),
            voice_id: config.tts_voice.clone(),
            model: config.tts_model.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            output_dir: config.output_dir.clone(),
            file_name: config.file_name.clone(),
        })
    }

    /// Where the reply audio for `user_id` is written
    ///
    /// # Errors
    ///
    /// Returns error if the user id is not a safe path component
    pub fn output_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(super::user_dir(&self.output_dir, user_id)?.join(&self.file_name))
    }

    /// Synthesize `text` for a user, returning the audio path or `None`
    ///
    /// Never fails: any error is logged and surfaces as a `None` fallback.
    pub async fn synthesize(&self, user_id: &str, text: &str) -> Outcome<Option<PathBuf>> {
        let result = self.synthesize_to_file(user_id, text).await.map(Some);
        Outcome::capture("synthesis", result, || None)
    }

    /// Synthesize `text` and stream the audio into the user's directory
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the file cannot be written
    pub async fn synthesize_to_file(&self, user_id: &str, text: &str) -> Result<PathBuf> {
        #[derive(serde::Serialize)]
        struct VoiceSettings {
            stability: f32,
            similarity_boost: f32,
        }

        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            voice_settings: VoiceSettings,
        }

        let path = self.output_path(user_id)?;

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Write beside the target, then swap it in
        let partial = path.with_file_name(format!("{}.part", self.file_name));
        let written = match write_stream(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &path).await?;

        tracing::info!(user_id, path = %path.display(), bytes = written, "synthesized reply");
        Ok(path)
    }
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<usize> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}
