use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transport failed before any bytes of a response arrived.
    Network,
    /// The provider answered with a non-success status.
    Provider,
    /// The transport dropped after the response had started.
    StreamInterrupted,
    /// The provider sent something that is not a valid stream.
    InvalidResponse,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "Network error"),
            ErrorKind::Provider => write!(f, "Provider error"),
            ErrorKind::StreamInterrupted => write!(f, "Stream interrupted"),
            ErrorKind::InvalidResponse => write!(f, "Invalid response"),
        }
    }
}
