//! HTTP API server for murmur

pub mod error;
pub mod health;
pub mod history;
pub mod messages;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{Config, DEFAULT_HISTORY_WINDOW};
use crate::db::{DbPool, HistoryRepo};
use crate::pipeline::Pipeline;
use crate::Result;

pub use error::ApiError;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub pipeline: Arc<Pipeline>,
    pub history: HistoryRepo,
    /// Default number of turns returned by the history endpoint
    pub history_window: usize,
    /// Where uploaded voice messages are stored, one directory per user
    pub audio_input_dir: PathBuf,
    /// Where synthesized replies are written and served from
    pub audio_output_dir: PathBuf,
}

/// Builder for the API server
pub struct ApiServerBuilder {
    db: DbPool,
    pipeline: Arc<Pipeline>,
    port: u16,
    history_window: usize,
    audio_input_dir: PathBuf,
    audio_output_dir: PathBuf,
}

impl ApiServerBuilder {
    #[must_use]
    pub fn new(db: DbPool, pipeline: Arc<Pipeline>, port: u16) -> Self {
        Self {
            db,
            pipeline,
            port,
            history_window: DEFAULT_HISTORY_WINDOW,
            audio_input_dir: PathBuf::from("audio_inputs"),
            audio_output_dir: PathBuf::from("audio_outputs"),
        }
    }

    /// Take window size and audio directories from configuration
    #[must_use]
    pub fn config(mut self, config: &Config) -> Self {
        self.history_window = config.llm.history_window;
        self.audio_input_dir.clone_from(&config.voice.input_dir);
        self.audio_output_dir.clone_from(&config.voice.output_dir);
        self
    }

    #[must_use]
    pub const fn history_window(mut self, size: usize) -> Self {
        self.history_window = size;
        self
    }

    #[must_use]
    pub fn audio_dirs(mut self, input: PathBuf, output: PathBuf) -> Self {
        self.audio_input_dir = input;
        self.audio_output_dir = output;
        self
    }

    #[must_use]
    pub fn build(self) -> ApiServer {
        let history = self.pipeline.history().clone();

        let state = Arc::new(ApiState {
            db: self.db,
            pipeline: self.pipeline,
            history,
            history_window: self.history_window,
            audio_input_dir: self.audio_input_dir,
            audio_output_dir: self.audio_output_dir,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let audio = ServeDir::new(&self.state.audio_output_dir);

        Router::new()
            .merge(messages::router(self.state.clone()))
            .merge(voice::router(self.state.clone()))
            .merge(history::router(self.state.clone()))
            .nest_service("/audio", audio)
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            voice = self.state.pipeline.accepts_voice(),
            speech = self.state.pipeline.can_speak(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
