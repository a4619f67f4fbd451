use streamchat_model::ModelProvider;

use super::{ChatSession, SessionSnapshot};
use crate::model_client::ModelClient;

/// [`ChatSession`] builder.
pub struct SessionBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) model: String,
    pub(crate) on_update: Vec<Box<dyn Fn(&SessionSnapshot) + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            model: String::new(),
            on_update: vec![],
        }
    }

    /// Sets the model selected when the session starts.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Attaches a callback invoked with the new snapshot on every
    /// transition. Callbacks run in the order they were attached, on the
    /// session's task, so they must not block.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> Self {
        self.on_update.push(Box::new(on_update));
        self
    }

    /// Builds the session. Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> ChatSession {
        ChatSession::spawn_from_builder(self)
    }
}
