//! A minimal streaming chat client.
//!
//! Conversations go through the relay, which holds the backend
//! credentials, and replies are folded into the transcript as they
//! stream in. The crate includes a CLI for using in the terminal, and the
//! session can be embedded in other front ends through
//! [`ChatSession::subscribe`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod presets;
mod session;

pub use session::{RELAY_ENDPOINT, SessionBuilder};
pub use streamchat_core::{
    ChatSession, Conversation, Message, Role, SessionSnapshot, Stage,
    StreamStatus, SubmitError,
};
