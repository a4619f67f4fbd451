mod builder;
mod state;
#[cfg(test)]
mod tests;

use serde::Serialize;
use streamchat_actor::Actor;
use tokio::sync::watch;

use crate::conversation::Conversation;
use crate::transcript::{Stage, StreamStatus, SubmitError};
pub use builder::SessionBuilder;
use state::{Clear, SelectModel, SessionState, Snapshot, Submit};

/// Everything an observer needs to render the chat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// The transcript, oldest message first.
    pub conversation: Conversation,
    /// Whether a reply is streaming or the last one failed.
    pub status: StreamStatus,
    /// The reducer stage, finer grained than `status`.
    pub stage: Stage,
    /// The model used by the next submit.
    pub selected_model: String,
}

/// A chat session, which owns one conversation and streams model replies
/// into it.
///
/// All intents are handled in order by a single task. Requests to the
/// model run in the background and post their increments back to that
/// task, so the session stays responsive while a reply is streaming.
/// Dropping the session stops it.
pub struct ChatSession {
    handle: Actor<SessionState>,
    updates: watch::Receiver<SessionSnapshot>,
}

impl ChatSession {
    /// Appends `text` as a user message and starts streaming the reply
    /// from the selected model.
    ///
    /// Resolves once the text has been accepted or rejected, not when the
    /// reply ends.
    pub async fn submit<S: Into<String>>(&self, text: S) -> Result<(), SubmitError> {
        self.handle
            .call(Submit(text.into()))
            .await
            .map_err(|_| SubmitError::Closed)?
    }

    /// Submits one of the suggested prompts.
    #[inline]
    pub async fn pick_suggestion<S: Into<String>>(
        &self,
        text: S,
    ) -> Result<(), SubmitError> {
        self.submit(text).await
    }

    /// Empties the conversation and drops any error. A reply that is still
    /// streaming is ignored from now on.
    pub fn clear(&self) {
        if self.handle.send(Clear).is_err() {
            warn!("session has stopped, clear is ignored");
        }
    }

    /// Selects the model for the next submit. Empty ids are ignored.
    pub fn select_model<S: Into<String>>(&self, model: S) {
        if self.handle.send(SelectModel(model.into())).is_err() {
            warn!("session has stopped, model selection is ignored");
        }
    }

    /// Returns the state after every intent sent so far has been handled.
    pub async fn snapshot(&self) -> SessionSnapshot {
        match self.handle.call(Snapshot).await {
            Ok(snapshot) => snapshot,
            Err(_) => self.updates.borrow().clone(),
        }
    }

    /// Returns a receiver that sees a new snapshot on every transition.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.clone()
    }
}

impl ChatSession {
    fn spawn_from_builder(builder: SessionBuilder) -> Self {
        let SessionBuilder {
            model_client,
            model,
            on_update,
        } = builder;

        let state = SessionState::new(model_client, model, on_update);
        let updates = state.updates();
        let handle = Actor::spawn(state, Some("session"));
        Self { handle, updates }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.handle.stop();
    }
}
