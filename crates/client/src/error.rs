use std::time::Duration;

use courier_bus::BusError;
use courier_contract::Failure;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a client call.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying bus failed.
    #[error("bus error: {0}")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A contract could not be encoded or decoded.
    #[error(transparent)]
    Contract(#[from] courier_contract::Error),

    /// A middleware handler aborted the call.
    #[error(transparent)]
    Middleware(#[from] courier_middleware::Error),

    /// The server answered with a failure.
    #[error("remote call failed with {}: {}", .0.code(), .0.message())]
    RequestFailure(Failure),

    /// No reply arrived in time.
    #[error("call to {func} timed out after {timeout:?}")]
    Timeout {
        /// Name of the remote function.
        func: String,
        /// The configured timeout.
        timeout: Duration,
    },
}

impl Error {
    pub(crate) fn bus<E>(error: E) -> Self
    where
        E: BusError,
    {
        Self::Bus(Box::new(error))
    }
}
