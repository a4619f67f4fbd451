//! The contract between a chat transcript and whatever produces the
//! assistant's replies.
//!
//! This crate establishes an unified protocol for sending a conversation
//! to a completion backend and reading back its streamed output, so that
//! the transcript logic never needs to know whether it talks to a relay,
//! a hosted provider, or a scripted fake.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
