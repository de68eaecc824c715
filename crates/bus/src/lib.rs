//! Abstract interface for the publish/subscribe bus underneath the RPC layer.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Connections publish, subscribe and receive messages.
pub mod connection;

/// Messages delivered to connections.
pub mod message;

pub use connection::{Connection, DEFAULT_POLL_INTERVAL};
pub use message::{Message, MessageKind};

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for bus errors
pub trait BusError: Error + Send + Sync + 'static {}

/// A trait representing a bus that hands out connections.
#[async_trait]
pub trait Bus
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the bus.
    type Error: BusError;

    /// The connection type handed out by the bus.
    type Connection: Connection<Error = Self::Error>;

    /// Opens a new connection with its own inbox and subscriptions.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;
}
