use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use streamchat_model::{
    ErrorKind, IncrementMode, ModelFinishReason, ModelResponse,
    ModelResponseEvent,
};

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{self, ChatCompletionChunk, ErrorBody};

struct PartialState {
    sse: Sse,
    mode: IncrementMode,
    id: Option<String>,
    content: String,
    done: bool,
    // Set when a chunk carries both text and a finish reason, the text is
    // emitted first and the reason on the next poll.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse, mode: IncrementMode) -> Self {
        let partial_state = PartialState {
            sse,
            mode,
            id: None,
            content: String::new(),
            done: false,
            pending_finish_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    let mut increment = None;
    while !partial_state.done {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(SseError::ChunksError(err)) => {
                return Err(Error::new(
                    format!("stream interrupted: {err}"),
                    ErrorKind::StreamInterrupted,
                ));
            }
            Err(SseError::InvalidPayload) => {
                return Err(Error::new(
                    "stream is not valid UTF-8",
                    ErrorKind::InvalidResponse,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.done = true;
            break;
        }

        let chunk = match serde_json::from_str::<ChatCompletionChunk>(&sse_event)
        {
            Ok(chunk) => chunk,
            Err(err) => {
                // Providers report failures that happen after the headers
                // were sent as an error payload inside the stream.
                if let Ok(body) = serde_json::from_str::<ErrorBody>(&sse_event) {
                    return Err(Error::new(body.into_message(), ErrorKind::Provider));
                }
                return Err(Error::new(
                    format!("malformed chunk: {err}"),
                    ErrorKind::InvalidResponse,
                ));
            }
        };
        if let Some(id) = &chunk.id {
            if partial_state.id.get_or_insert_with(|| id.clone()) != id {
                return Err(Error::new(
                    "chunk id mismatch",
                    ErrorKind::InvalidResponse,
                ));
            }
        }

        // Usage-only chunks carry no choices.
        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            partial_state.content.push_str(&content);
            increment = Some(match partial_state.mode {
                IncrementMode::Cumulative => partial_state.content.clone(),
                IncrementMode::Delta => content,
            });
        }
        if let Some(reason) = choice.finish_reason {
            partial_state.pending_finish_reason =
                Some(proto::finish_reason(&reason));
        }

        if increment.is_some() || partial_state.pending_finish_reason.is_some()
        {
            break;
        }
    }

    // Always emit the text before the finish reason.
    if let Some(text) = increment {
        return Ok((Some(ModelResponseEvent::Increment(text)), partial_state));
    }
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    Ok((None, partial_state))
}
