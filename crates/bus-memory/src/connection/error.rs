use courier_bus::BusError;
use thiserror::Error;

/// Errors that can occur on the in-memory bus.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The channel name is invalid.
    #[error("invalid channel `{0}` - tokens must be non-empty and wildcards must stand alone")]
    InvalidChannel(String),
}

impl BusError for Error {}
