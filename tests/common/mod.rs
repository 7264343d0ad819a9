//! Shared test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use murmur::agent::{ChatClient, Responder};
use murmur::config::{LlmConfig, VoiceConfig};
use murmur::context::{ContextBuilder, ContextConfig};
use murmur::db::{self, HistoryRepo, UserRepo};
use murmur::voice::{SpeechToText, TextToSpeech, Transcoder, Transcription};
use murmur::{DbPool, Error, Pipeline, Result};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

pub fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

/// Chat configuration pointing at a mock server
pub fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        model: "test-model".to_string(),
        base_url: base_url.to_string(),
        temperature: 0.75,
        default_prompt: "Default Prompt: ".to_string(),
        ai_prefix: "AI".to_string(),
        human_prefix: "User".to_string(),
        history_window: 5,
    }
}

/// Voice configuration pointing at a mock server and temp directories
pub fn voice_config(tts_base_url: &str, root: &Path) -> VoiceConfig {
    VoiceConfig {
        stt_model: "whisper-1".to_string(),
        stt_language: "en".to_string(),
        ffmpeg: None,
        tts_base_url: tts_base_url.to_string(),
        tts_voice: "test-voice".to_string(),
        tts_model: "eleven_monolingual_v1".to_string(),
        stability: 0.5,
        similarity_boost: 0.5,
        output_dir: root.join("audio_outputs"),
        input_dir: root.join("audio_inputs"),
        file_name: "reply.mp3".to_string(),
    }
}

/// Mount a chat-completion mock that answers with `reply`
pub async fn mount_chat_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop"
            }]
        })))
        .mount(server)
        .await;
}

/// Mount a chat-completion mock that always fails
pub async fn mount_chat_failure(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(server)
        .await;
}

/// Mount a Whisper mock that answers with `text`
pub async fn mount_transcript(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
        .mount(server)
        .await;
}

/// Responder talking to `base_url`
pub fn responder(pool: &DbPool, base_url: &str) -> Responder {
    let config = llm_config(base_url);
    let chat = ChatClient::new(reqwest::Client::new(), secret("sk-test"), &config)
        .expect("chat client");
    Responder::new(
        chat,
        ContextBuilder::new(ContextConfig::from(&config)),
        HistoryRepo::new(pool.clone()),
    )
}

/// Text-only pipeline talking to `base_url`
pub fn text_pipeline(pool: &DbPool, base_url: &str) -> Pipeline {
    Pipeline::new(
        HistoryRepo::new(pool.clone()),
        UserRepo::new(pool.clone()),
        responder(pool, base_url),
    )
}

/// Whisper client talking to `base_url`
pub fn whisper(base_url: &str) -> SpeechToText {
    SpeechToText::new_whisper(
        reqwest::Client::new(),
        secret("sk-test"),
        base_url,
        "whisper-1".to_string(),
        "en".to_string(),
    )
    .expect("whisper client")
}

/// Transcription with the given transcoder, talking to `base_url`
pub fn transcription(transcoder: impl Transcoder + 'static, base_url: &str) -> Transcription {
    Transcription::new(Arc::new(transcoder), whisper(base_url))
}

/// `ElevenLabs` client talking to `base_url`, writing under `root`
pub fn speech(base_url: &str, root: &Path) -> TextToSpeech {
    TextToSpeech::new_elevenlabs(
        reqwest::Client::new(),
        secret("xi-test"),
        &voice_config(base_url, root),
    )
    .expect("tts client")
}

/// Write a fake recorded clip
pub fn write_clip(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"OggS fake opus payload").expect("write clip");
    path
}

/// Transcoder that copies the input verbatim
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Transcoder that always fails
pub struct BrokenTranscoder;

#[async_trait]
impl Transcoder for BrokenTranscoder {
    async fn transcode(&self, _input: &Path, _output: &Path) -> Result<()> {
        Err(Error::Transcode("ffmpeg exited with code 1: invalid data".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Prompt text of every chat request a mock server received
pub async fn received_prompts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).expect("json body");
            body["messages"][0]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
