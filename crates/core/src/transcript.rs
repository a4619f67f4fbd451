//! The transcript reducer.
//!
//! [`Transcript`] is a plain state machine with no I/O. It decides what a
//! submit, an increment, the end of a stream or a clear does to the
//! conversation, and hands back the request that has to be sent. Driving
//! the request and feeding its events back in is the job of the session.
//!
//! ```text
//!            submit                first increment
//!   Idle ──────────────► Sending ─────────────────► Streaming ──┐ increment
//!    ▲                      │                          │  ▲     │
//!    │        end of stream │ error     end of stream  │  └─────┘
//!    ├──────────────────────┘   │   ┌──────────────────┘
//!    │                          ▼   │ error
//!    │   clear (any state)   Errored ◄──
//!    └───────────────────────  │ submit ──► Sending
//! ```

#[cfg(test)]
mod proptests;

use std::error::Error;
use std::fmt::{self, Display};

use serde::Serialize;
use streamchat_model::{ErrorKind, IncrementMode, ModelRequest, Role};

use crate::conversation::{Conversation, Message};

/// Identifies one send. Bumped on every submit and every clear, so that
/// events of a send that is no longer current can be told apart.
pub type Generation = u64;

/// The reducer's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing in flight.
    #[default]
    Idle,
    /// A request was sent, no text has arrived yet.
    Sending,
    /// At least one increment was folded into the assistant message.
    Streaming,
    /// The last send failed.
    Errored,
}

impl Stage {
    /// Returns `true` while a send is in flight.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Stage::Sending | Stage::Streaming)
    }
}

/// The status shown next to the transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum StreamStatus {
    /// Ready for the next submit.
    #[default]
    Idle,
    /// A send is in flight.
    Pending,
    /// The last send failed, with a human-readable reason.
    Error(String),
}

/// Why a submit was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitError {
    /// The text is empty or only whitespace.
    Empty,
    /// Another send is still in flight.
    Busy,
    /// The session is no longer running.
    Closed,
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Empty => write!(f, "message is empty"),
            SubmitError::Busy => write!(f, "a reply is still streaming"),
            SubmitError::Closed => write!(f, "the session has stopped"),
        }
    }
}

impl Error for SubmitError {}

/// A send that ended with an error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamFailure {
    kind: ErrorKind,
    message: String,
}

impl StreamFailure {
    /// Creates a failure of the given kind.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns what went wrong.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message reported by the transport or the provider.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for StreamFailure {}

/// A request the caller has to send, tagged with its generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSend {
    /// Pass this back with every event of the send.
    pub generation: Generation,
    /// The full conversation so far, including the new user message.
    pub request: ModelRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct InFlight {
    generation: Generation,
    model: String,
}

/// The in-memory transcript of one conversation and the state machine
/// that folds streamed replies into it.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    conversation: Conversation,
    stage: Stage,
    error: Option<String>,
    generation: Generation,
    in_flight: Option<InFlight>,
    increment_mode: IncrementMode,
}

impl Transcript {
    /// Creates an empty transcript that reads increments in the given
    /// mode.
    #[inline]
    pub fn new(increment_mode: IncrementMode) -> Self {
        Self {
            increment_mode,
            ..Default::default()
        }
    }

    /// Returns the conversation.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the current stage.
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns the generation of the most recent submit or clear.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns the status derived from the current stage.
    pub fn status(&self) -> StreamStatus {
        match self.stage {
            Stage::Idle => StreamStatus::Idle,
            Stage::Sending | Stage::Streaming => StreamStatus::Pending,
            Stage::Errored => StreamStatus::Error(
                self.error.clone().unwrap_or_default(),
            ),
        }
    }

    /// Appends a user message and starts a send with `model`.
    ///
    /// Rejected without any change when the text is blank or another send
    /// is still in flight. A previous error is cleared before the send
    /// starts.
    pub fn submit(
        &mut self,
        text: &str,
        model: &str,
    ) -> Result<PendingSend, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.stage.is_in_flight() {
            return Err(SubmitError::Busy);
        }

        self.error = None;
        self.conversation
            .messages
            .push(Message::user(text.to_owned()));
        self.generation += 1;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            model: model.to_owned(),
        });
        self.stage = Stage::Sending;

        Ok(PendingSend {
            generation: self.generation,
            request: ModelRequest {
                messages: self.conversation.to_chat_messages(),
                model: model.to_owned(),
            },
        })
    }

    /// Folds one increment of the send tagged `generation` into the
    /// trailing assistant message, creating it on the first increment.
    ///
    /// Returns `false` if the increment was discarded because it belongs
    /// to a send that is no longer current.
    pub fn apply_increment(&mut self, generation: Generation, text: &str) -> bool {
        let Some(in_flight) = self.current(generation) else {
            trace!("discarding stale increment of generation {generation}");
            return false;
        };

        match self.stage {
            Stage::Sending => {
                let model = in_flight.model.clone();
                self.conversation
                    .messages
                    .push(Message::assistant(text.to_owned(), model));
                self.stage = Stage::Streaming;
                true
            }
            Stage::Streaming => {
                let Some(last) = self
                    .conversation
                    .messages
                    .last_mut()
                    .filter(|msg| msg.role == Role::Assistant)
                else {
                    warn!("streaming without a trailing assistant message");
                    return false;
                };
                match self.increment_mode {
                    IncrementMode::Cumulative => {
                        last.content.clear();
                        last.content.push_str(text);
                    }
                    IncrementMode::Delta => last.content.push_str(text),
                }
                true
            }
            Stage::Idle | Stage::Errored => false,
        }
    }

    /// Ends the send tagged `generation`, freezing the transcript.
    ///
    /// A failure leaves every message in place, including a partially
    /// streamed reply. Returns `false` for stale generations.
    pub fn finish(
        &mut self,
        generation: Generation,
        outcome: Result<(), StreamFailure>,
    ) -> bool {
        if self.current(generation).is_none() {
            trace!("discarding stale completion of generation {generation}");
            return false;
        }

        self.in_flight = None;
        match outcome {
            Ok(()) => {
                self.stage = Stage::Idle;
            }
            Err(failure) => {
                self.error = Some(failure.to_string());
                self.stage = Stage::Errored;
            }
        }
        true
    }

    /// Empties the transcript and drops any error.
    ///
    /// A send still in flight keeps running, but everything it delivers
    /// afterwards is discarded.
    pub fn clear(&mut self) {
        self.conversation.messages.clear();
        self.error = None;
        self.in_flight = None;
        self.stage = Stage::Idle;
        self.generation += 1;
    }

    #[inline]
    fn current(&self, generation: Generation) -> Option<&InFlight> {
        self.in_flight
            .as_ref()
            .filter(|in_flight| in_flight.generation == generation)
    }
}
