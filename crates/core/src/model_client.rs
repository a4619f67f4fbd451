use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use streamchat_model::{
    IncrementMode, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

use crate::transcript::StreamFailure;

type SendRequestResult = Result<ModelClientResponse, StreamFailure>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    increment_mode: IncrementMode,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let increment_mode = provider.increment_mode();
        // Erase `P` so the session doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req, on_increment| {
            trace!(
                "sending {} messages to {}",
                req.messages.len(),
                req.model
            );
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_increment).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            increment_mode,
        }
    }

    /// Returns how the increments passed to `on_increment` should be read.
    #[inline]
    pub fn increment_mode(&self) -> IncrementMode {
        self.increment_mode
    }

    /// Sends a request and streams every increment of the reply to
    /// `on_increment`, in arrival order.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_increment: impl Fn(String) + Send + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, Box::new(on_increment)).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The reason the model finished generating, if it told us.
    pub finish_reason: Option<ModelFinishReason>,
}

fn to_failure<E: ModelProviderError>(err: E) -> StreamFailure {
    StreamFailure::new(err.kind(), err.to_string())
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_increment: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            debug!("request failed: {err}");
            return Err(to_failure(err));
        }
    };

    let mut finish_reason = None;
    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                debug!("stream failed: {err}");
                return Err(to_failure(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::Increment(text) => on_increment(text),
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request with {finish_reason:?}");
    Ok(ModelClientResponse { finish_reason })
}
