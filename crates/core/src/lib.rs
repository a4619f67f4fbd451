//! Core logic: the transcript reducer, the session that drives it and the
//! type-erased client it talks to the model through.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod model_client;
mod session;
pub mod transcript;

pub use conversation::{Conversation, Message};
pub use session::{ChatSession, SessionBuilder, SessionSnapshot};
pub use streamchat_model::Role;
pub use transcript::{Stage, StreamFailure, StreamStatus, SubmitError};
