use streamchat_core::{
    ChatSession, SessionBuilder as CoreSessionBuilder, SessionSnapshot,
};
use streamchat_model::ModelProvider;
use streamchat_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::presets;

/// The relay route conversations are posted to.
pub const RELAY_ENDPOINT: &str = "/api/chat";

/// A session builder.
///
/// Sessions start with [`presets::DEFAULT_MODEL`] selected.
pub struct SessionBuilder {
    inner: CoreSessionBuilder,
}

impl SessionBuilder {
    /// Creates a builder for sessions that talk to the relay at
    /// `relay_url`, for example `http://127.0.0.1:3000`.
    ///
    /// The relay holds the backend credentials, so none are sent from
    /// here.
    pub fn with_relay_url<S: Into<String>>(relay_url: S) -> Self {
        let config = OpenAIConfigBuilder::with_base_url(relay_url)
            .with_endpoint(RELAY_ENDPOINT)
            .build();
        debug!("talking to the relay at {}", config.url());
        Self::with_model_provider(OpenAIProvider::new(config))
    }

    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let inner = CoreSessionBuilder::with_model_provider(provider)
            .with_model(presets::DEFAULT_MODEL);
        Self { inner }
    }

    /// Selects a model other than the default one at start.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.inner = self.inner.with_model(model);
        self
    }

    /// Attaches a callback to be invoked on every state change.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> Self {
        self.inner = self.inner.on_update(on_update);
        self
    }

    /// Builds a new session. Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> ChatSession {
        self.inner.build()
    }
}
