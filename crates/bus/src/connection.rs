use crate::BusError;
use crate::message::Message;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::{Instant, sleep};

/// Interval between checks when a connection can only poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A trait representing a single connection to the bus.
///
/// A connection owns one inbox. Every channel it subscribes to delivers into that inbox,
/// along with confirmations for each subscribe and unsubscribe.
#[async_trait]
pub trait Connection
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the connection.
    type Error: BusError;

    /// Publishes a payload on a channel. Delivery is at-most-once.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), Self::Error>;

    /// Subscribes the inbox to a channel.
    async fn subscribe(&self, channel: &str) -> Result<(), Self::Error>;

    /// Removes a channel subscription from the inbox.
    async fn unsubscribe(&self, channel: &str) -> Result<(), Self::Error>;

    /// Takes the next delivery from the inbox without waiting.
    async fn poll_message(&self) -> Result<Option<Message>, Self::Error>;

    /// Waits up to `wait` for the next delivery.
    ///
    /// The default implementation polls every [`DEFAULT_POLL_INTERVAL`]. Backends with a
    /// native receive should override it.
    async fn recv_message(&self, wait: Duration) -> Result<Option<Message>, Self::Error> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(message) = self.poll_message().await? {
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            sleep(DEFAULT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}
