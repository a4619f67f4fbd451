//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use streamchat_model::{
    ErrorKind, IncrementMode, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent, Role,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

/// Error type for [`TestModelProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
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

/// The streaming side of [`TestModelProvider`].
pub struct TestModelResponse {
    preset: PresetResponse,
    delay: Duration,
    event_idx: usize,
    finished: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.finished {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let Some(event) = this.preset.events.get(this.event_idx) else {
            this.finished = true;
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ))));
        };
        this.event_idx += 1;

        match event {
            PresetEvent::Increment(text) => {
                Poll::Ready(Ok(Some(ModelResponseEvent::Increment(text.clone()))))
            }
            PresetEvent::Interrupt(message) => {
                this.finished = true;
                Poll::Ready(Err(Error::new(
                    message.clone(),
                    ErrorKind::StreamInterrupted,
                )))
            }
        }
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each user turn. The response is selected by the
/// number of user messages in the request, so the first user message gets
/// the first response, and so on. If there are no enough responses in the
/// script, a provider error is returned.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Vec<PresetResponse>>,
    delay: Option<Duration>,
    increment_mode: IncrementMode,
}

impl TestModelProvider {
    /// Appends the response for the next user turn.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        Arc::make_mut(&mut self.script).push(preset);
    }

    /// Sets the delay before every event. Defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Declares how increments in the script should be read.
    #[inline]
    pub fn set_increment_mode(&mut self, mode: IncrementMode) {
        self.increment_mode = mode;
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let turn = req
            .messages
            .iter()
            .filter(|msg| msg.role == Role::User)
            .count();
        let result = match turn.checked_sub(1).and_then(|idx| self.script.get(idx))
        {
            None => Err(Error::new("no enough steps", ErrorKind::Provider)),
            Some(PresetResponse {
                failure: Some(PresetFailure::Network(message)),
                ..
            }) => Err(Error::new(message.clone(), ErrorKind::Network)),
            Some(PresetResponse {
                failure: Some(PresetFailure::Provider(message)),
                ..
            }) => Err(Error::new(message.clone(), ErrorKind::Provider)),
            Some(preset) => Ok(TestModelResponse {
                preset: preset.clone(),
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                event_idx: 0,
                finished: false,
                sleep: None,
            }),
        };
        future::ready(result)
    }

    #[inline]
    fn increment_mode(&self) -> IncrementMode {
        self.increment_mode
    }
}
