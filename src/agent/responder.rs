//! Reply generation with a fixed apology on failure

use super::ChatClient;
use crate::context::ContextBuilder;
use crate::db::HistoryRepo;
use crate::outcome::Outcome;
use crate::Result;

/// Reply sent to the user when the model cannot be reached
pub const FALLBACK_REPLY: &str = "I'm sorry, there was an error processing your request.";

/// Produces bot replies from windowed history and the new user text
pub struct Responder {
    chat: ChatClient,
    context: ContextBuilder,
    history: HistoryRepo,
}

impl Responder {
    /// Create a new responder
    #[must_use]
    pub const fn new(chat: ChatClient, context: ContextBuilder, history: HistoryRepo) -> Self {
        Self {
            chat,
            context,
            history,
        }
    }

    /// Generate a reply for `text`
    ///
    /// Never fails: history lookup or upstream errors are logged and the
    /// caller receives [`FALLBACK_REPLY`] as an [`Outcome::Fallback`].
    pub async fn respond(&self, user_id: &str, user_name: &str, text: &str) -> Outcome<String> {
        let result = self.try_respond(user_id, user_name, text).await;
        Outcome::capture("responder", result, || FALLBACK_REPLY.to_string())
    }

    async fn try_respond(&self, user_id: &str, user_name: &str, text: &str) -> Result<String> {
        let context = self.context.build(user_id, &self.history)?;
        let prompt = context.format_prompt(user_name, text);

        let reply = self.chat.complete(&prompt).await?;

        tracing::debug!(
            user_id,
            model = self.chat.model(),
            history_turns = context.turns.len(),
            "generated response"
        );
        Ok(reply)
    }
}
