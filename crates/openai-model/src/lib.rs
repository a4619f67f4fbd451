//! A model provider for OpenAI-compatible streaming chat completions.
//!
//! The same provider talks to a hosted backend (base URL plus API key) and
//! to the relay route, which passes the backend's event stream through
//! untouched.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use streamchat_model::{
    ErrorKind, IncrementMode, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
pub use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<StatusCode>,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status: None,
        }
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status of the failed response, if the server
    /// answered at all.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Sends the request and returns the raw streaming response once the
    /// server has answered with a success status.
    ///
    /// The body is left unread, callers that only pass bytes along (like
    /// the relay) use this instead of [`ModelProvider::send_request`].
    pub fn open(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Response, Error>> + Send + 'static {
        let mut builder = self
            .client
            .post(&self.config.url)
            .header(header::ACCEPT, "text/event-stream")
            .json(&proto::create_request(req));
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let resp_fut = builder.send();

        async move {
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(format!("{err}"), ErrorKind::Network));
                }
            };

            let status = resp.status();
            if !status.is_success() {
                // An unreadable error body still leaves the status to report.
                let body = resp.text().await.unwrap_or_default();
                let message = proto::error_message(&status.to_string(), &body);
                debug!("provider rejected the request: {status} {message}");
                return Err(Error::new(message, ErrorKind::Provider)
                    .with_status(status));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if let Some(content_type) = content_type {
                let is_event_stream = content_type
                    .parse()
                    .map(|m: Mime| m.subtype().as_str() == "event-stream")
                    .unwrap_or(false);
                if !is_event_stream {
                    return Err(Error::new(
                        format!("Unexpected content type: {content_type}"),
                        ErrorKind::InvalidResponse,
                    )
                    .with_status(status));
                }
            }

            Ok(resp)
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let open_fut = self.open(req);
        let mode = self.config.increment_mode;
        async move {
            // Here we got a successful response.
            let resp = open_fut.await?;
            let sse = Sse::new(Chunks::from_response(resp));
            Ok(OpenAIResponse::from_sse(sse, mode))
        }
    }

    #[inline]
    fn increment_mode(&self) -> IncrementMode {
        self.config.increment_mode
    }
}
