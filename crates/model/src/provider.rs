use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::{IncrementMode, ModelResponse};

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which forwards one
/// conversation to a completion backend and exposes its streamed reply.
///
/// Once the provider is created, it should behave like a stateless object.
/// Every call issues exactly one outbound request and retries nothing;
/// retry policy, if any, belongs to the caller.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a request to the model.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;

    /// Returns how the text of [`crate::ModelResponseEvent::Increment`]
    /// events should be interpreted.
    #[inline]
    fn increment_mode(&self) -> IncrementMode {
        IncrementMode::Cumulative
    }
}
