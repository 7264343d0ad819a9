//! Speech-to-text (STT) processing

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use super::Transcoder;
use crate::outcome::Outcome;
use crate::{Error, Result};

/// Text returned in place of a transcript when the STT service fails
pub const TRANSCRIPTION_FALLBACK: &str = "Sorry, there was an error processing the audio.";

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech to text with an `OpenAI` Whisper-compatible API
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    language: String,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(
        client: reqwest::Client,
        api_key: Option<SecretString>,
        base_url: &str,
        model: String,
        language: String,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key required for Whisper".to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            language,
        })
    }

    /// Transcribe an MP3 file to text
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or transcription fails
    pub async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let audio = tokio::fs::read(path).await?;
        tracing::debug!(
            path = %path.display(),
            audio_bytes = audio.len(),
            "starting Whisper transcription"
        );

        let file_name = path
            .file_name()
            .map_or_else(|| "audio.mp3".to_string(), |n| n.to_string_lossy().into_owned());

        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        tracing::info!(path = %path.display(), "transcription successful");
        Ok(result.text)
    }
}

/// Voice-message transcription: transcode to MP3, then STT
pub struct Transcription {
    transcoder: Arc<dyn Transcoder>,
    stt: SpeechToText,
}

impl Transcription {
    /// Create a new transcription pipeline
    #[must_use]
    pub fn new(transcoder: Arc<dyn Transcoder>, stt: SpeechToText) -> Self {
        Self { transcoder, stt }
    }

    /// Transcribe a recorded clip
    ///
    /// The clip is transcoded to an `.mp3` next to it. On success both files
    /// are deleted. When the STT call fails the caller receives
    /// [`TRANSCRIPTION_FALLBACK`] and both files are kept for diagnosis.
    ///
    /// # Errors
    ///
    /// Returns error if transcoding fails; no cleanup happens in that case
    pub async fn transcribe(&self, source: &Path) -> Result<Outcome<String>> {
        let mp3 = source.with_extension("mp3");
        if mp3 == source {
            return Err(Error::Transcode(format!(
                "source is already MP3: {}",
                source.display()
            )));
        }

        self.transcoder.transcode(source, &mp3).await?;

        match self.stt.transcribe_file(&mp3).await {
            Ok(text) => {
                remove_audio(&mp3).await;
                remove_audio(source).await;
                tracing::info!("audio files deleted after successful transcription");
                Ok(Outcome::Success(text))
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    "audio files kept because transcription failed"
                );
                Ok(Outcome::capture("transcription", Err(e), || {
                    TRANSCRIPTION_FALLBACK.to_string()
                }))
            }
        }
    }
}

async fn remove_audio(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to delete audio file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_requires_key() {
        let result = SpeechToText::new_whisper(
            reqwest::Client::new(),
            None,
            "https://api.openai.com/v1",
            "whisper-1".to_string(),
            "en".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
