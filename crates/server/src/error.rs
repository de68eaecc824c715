use courier_bus::BusError;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a server.
#[derive(Debug, Error)]
pub enum Error {
    /// The listen loop is already running.
    #[error("server is already running")]
    AlreadyRunning,

    /// The underlying bus failed.
    #[error("bus error: {0}")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A contract could not be encoded.
    #[error(transparent)]
    Contract(#[from] courier_contract::Error),

    /// A middleware handler aborted the request.
    #[error(transparent)]
    Middleware(#[from] courier_middleware::Error),
}

impl Error {
    pub(crate) fn bus<E>(error: E) -> Self
    where
        E: BusError,
    {
        Self::Bus(Box::new(error))
    }
}
