//! NATS implementation of the bus crate, using core (non-persistent) publish/subscribe.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Connections to a NATS server.
pub mod connection;

pub use connection::{Error, NatsConnection};

use async_nats::Client as AsyncNatsClient;
use async_trait::async_trait;
use courier_bus::Bus;
use tracing::info;

/// Options for connecting to NATS.
#[derive(Clone, Debug)]
pub struct NatsBusOptions {
    /// Server address, e.g. `nats://localhost:4222`.
    pub url: String,
}

impl Default for NatsBusOptions {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

/// A bus backed by a NATS client. Connections share the client's socket but each has its
/// own inbox and subscriptions.
#[derive(Clone, Debug)]
pub struct NatsBus {
    client: AsyncNatsClient,
}

impl NatsBus {
    /// Wraps an already connected NATS client.
    #[must_use]
    pub const fn new(client: AsyncNatsClient) -> Self {
        Self { client }
    }

    /// Connects to the server named in the options.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn connect_with(options: NatsBusOptions) -> Result<Self, Error> {
        let client = async_nats::connect(options.url.as_str())
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        info!(url = %options.url, "connected to nats");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Bus for NatsBus {
    type Error = Error;
    type Connection = NatsConnection;

    async fn connect(&self) -> Result<NatsConnection, Error> {
        Ok(NatsConnection::new(self.client.clone()))
    }
}
