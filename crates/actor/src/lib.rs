//! A lightweight single-task actor, used as the event loop that owns a
//! piece of state and mutates it one message at a time.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::{Message, Request};
