use thiserror::Error;

use crate::types::RowId;

/// A failed request, normalized at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never produced a response (connection refused, DNS, reset).
    #[error("network error: {0}")]
    Network(String),
    /// The collaborator answered, but not with success.
    #[error("{0}")]
    Server(String),
}

/// Which side of the wire a [`GatewayError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Server,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Server(_) => ErrorKind::Server,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network(m) | Self::Server(m) => m,
        }
    }
}

/// A transition the controller refused to start.
///
/// Rejection is backpressure, not failure: callers retry once the in-flight
/// request completes. Nothing here is ever sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("a panel request is already in flight")]
    Busy,
    #[error("no panel is open")]
    NotOpen,
    #[error("no form is open")]
    NoForm,
    #[error("deletion of row {0} was not confirmed")]
    NotConfirmed(RowId),
    #[error("row {0} is not in the list")]
    UnknownRow(RowId),
}
