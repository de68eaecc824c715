use courier_bus::BusError;
use thiserror::Error;

/// Errors that can occur on a NATS bus.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not connect to the server.
    #[error("failed to connect to nats: {0}")]
    Connect(String),

    /// Could not publish a payload.
    #[error("failed to publish: {0}")]
    Publish(String),

    /// Could not register a subscription.
    #[error("failed to subscribe: {0}")]
    Subscribe(String),
}

impl BusError for Error {}
