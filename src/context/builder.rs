//! Context builder for assembling the conversation prompt

use crate::config::LlmConfig;
use crate::db::{HistoryRepo, Turn};
use crate::Result;

/// Configuration for context building
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Maximum number of past turns to include
    pub max_turns: usize,
    /// Preamble placed before the dialogue
    pub default_prompt: String,
    /// Label for bot turns
    pub ai_prefix: String,
    /// Label for user turns in history
    pub human_prefix: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: crate::config::DEFAULT_HISTORY_WINDOW,
            default_prompt: String::new(),
            ai_prefix: "AI".to_string(),
            human_prefix: "User".to_string(),
        }
    }
}

impl From<&LlmConfig> for ContextConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_turns: config.history_window,
            default_prompt: config.default_prompt.clone(),
            ai_prefix: config.ai_prefix.clone(),
            human_prefix: config.human_prefix.clone(),
        }
    }
}

/// Built context ready to be rendered for the model
#[derive(Debug, Clone)]
pub struct BuiltContext {
    /// Recent turns, oldest first
    pub turns: Vec<Turn>,
    config: ContextConfig,
}

impl BuiltContext {
    /// Render the dialogue history, one `<label>: <text>` line per turn
    #[must_use]
    pub fn format_history(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                let label = match turn {
                    Turn::User(_) => &self.config.human_prefix,
                    Turn::Bot(_) => &self.config.ai_prefix,
                };
                format!("{label}: {}", turn.text())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format the full prompt for the current message
    ///
    /// The user's line is labelled with their display name; an empty name
    /// falls back to the human prefix.
    #[must_use]
    pub fn format_prompt(&self, user_name: &str, input: &str) -> String {
        let speaker = if user_name.trim().is_empty() {
            self.config.human_prefix.as_str()
        } else {
            user_name
        };

        format!(
            "{}\nOur current dialogue:\n{}\n{speaker}: {input}\n{}:",
            self.config.default_prompt,
            self.format_history(),
            self.config.ai_prefix,
        )
    }
}

/// Builds context for bot conversations
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create a new context builder
    #[must_use]
    pub const fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Window size used when reading history
    #[must_use]
    pub const fn max_turns(&self) -> usize {
        self.config.max_turns
    }

    /// Build context from explicit turns (already windowed or not)
    #[must_use]
    pub fn from_turns(&self, turns: &[Turn]) -> BuiltContext {
        BuiltContext {
            turns: super::window(turns, self.config.max_turns).to_vec(),
            config: self.config.clone(),
        }
    }

    /// Build context for a user from stored history
    ///
    /// A user with no stored history gets an empty dialogue.
    ///
    /// # Errors
    ///
    /// Returns error if database operations fail
    pub fn build(&self, user_id: &str, history: &HistoryRepo) -> Result<BuiltContext> {
        let turns = history.window(user_id, self.config.max_turns)?;

        if turns.is_empty() {
            tracing::info!(user_id, "no previous conversation history found");
        }

        Ok(BuiltContext {
            turns,
            config: self.config.clone(),
        })
    }
}
