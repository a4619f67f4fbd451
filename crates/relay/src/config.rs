use std::fmt::{self, Debug};

use streamchat_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

/// The model used when a request leaves `model` empty.
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";

/// Where the relay forwards conversations to.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RelayConfig {
    upstream_url: String,
    api_key: String,
    default_model: String,
}

impl RelayConfig {
    /// Creates a configuration for an OpenAI-compatible upstream, for
    /// example `https://api.together.xyz/v1`.
    #[inline]
    pub fn new<U: Into<String>, K: Into<String>>(upstream_url: U, api_key: K) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            api_key: api_key.into(),
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Sets the model used when a request does not name one.
    #[inline]
    pub fn with_default_model<S: Into<String>>(mut self, model: S) -> Self {
        self.default_model = model.into();
        self
    }

    /// Returns the upstream base URL.
    #[inline]
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Returns the model used when a request does not name one.
    #[inline]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub(crate) fn provider(&self) -> OpenAIProvider {
        let config = OpenAIConfigBuilder::with_base_url(&self.upstream_url)
            .with_api_key(&self.api_key)
            .build();
        OpenAIProvider::new(config)
    }
}

impl Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("upstream_url", &self.upstream_url)
            .field("api_key", &"<deducted>")
            .field("default_model", &self.default_model)
            .finish()
    }
}
