use std::error::Error;
use std::fmt::{self, Display};

/// Returned when a message is sent to an actor whose loop has exited, or
/// when the actor went away before replying to a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActorDeadError;

impl Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the actor has stopped")
    }
}

impl Error for ActorDeadError {}
