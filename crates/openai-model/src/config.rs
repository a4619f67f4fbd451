use std::fmt::Debug;

use streamchat_model::IncrementMode;

const DEFAULT_ENDPOINT: &str = "/chat/completions";

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    base_url: String,
    api_key: Option<String>,
    endpoint: Option<String>,
    increment_mode: IncrementMode,
}

impl OpenAIConfigBuilder {
    /// Creates a builder targeting the given base URL, for example
    /// `https://api.together.xyz/v1` or the address of a relay.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            endpoint: None,
            increment_mode: IncrementMode::Cumulative,
        }
    }

    /// Sets the API key sent as a bearer token.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the path appended to the base URL. Defaults to
    /// `/chat/completions`.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets what the text of emitted increments carries.
    #[inline]
    pub fn with_increment_mode(mut self, mode: IncrementMode) -> Self {
        self.increment_mode = mode;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OpenAIConfig {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        OpenAIConfig {
            url,
            api_key: self.api_key.filter(|key| !key.is_empty()),
            increment_mode: self.increment_mode,
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("endpoint", &self.endpoint)
            .field("increment_mode", &self.increment_mode)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) increment_mode: IncrementMode,
}

impl OpenAIConfig {
    /// Returns the full URL requests are posted to.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("increment_mode", &self.increment_mode)
            .finish()
    }
}
