mod error;

use crate::Hub;
use crate::subject;
pub use error::Error;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use courier_bus::{Connection, Message};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::timeout;
use tracing::debug;

/// A connection to an in-memory bus.
///
/// Dropping the connection removes every subscription it still holds.
#[derive(Debug)]
pub struct MemoryConnection {
    hub: Arc<Hub>,
    id: u64,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<Message>>,
    sender: mpsc::UnboundedSender<Message>,
    subscribed: Mutex<HashSet<String>>,
}

impl MemoryConnection {
    pub(crate) fn new(hub: Arc<Hub>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            id: hub.next_connection_id(),
            hub,
            receiver: AsyncMutex::new(receiver),
            sender,
            subscribed: Mutex::new(HashSet::new()),
        }
    }

    /// Channel patterns this connection is subscribed to, sorted.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut subscriptions: Vec<String> = self.subscribed.lock().iter().cloned().collect();
        subscriptions.sort();
        subscriptions
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    type Error = Error;

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), Error> {
        subject::validate_channel(channel)?;
        self.hub.publish(channel, &payload);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<(), Error> {
        subject::validate_pattern(channel)?;

        self.hub.insert(channel, self.id, self.sender.clone());
        self.subscribed.lock().insert(channel.to_string());
        debug!(connection = self.id, channel, "subscribed");

        // The receiver lives as long as self, so this cannot fail.
        let _ = self.sender.send(Message::subscribed(channel));
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), Error> {
        self.hub.remove(channel, self.id);
        self.subscribed.lock().remove(channel);
        debug!(connection = self.id, channel, "unsubscribed");

        let _ = self.sender.send(Message::unsubscribed(channel));
        Ok(())
    }

    async fn poll_message(&self) -> Result<Option<Message>, Error> {
        Ok(self.receiver.lock().await.try_recv().ok())
    }

    async fn recv_message(&self, wait: Duration) -> Result<Option<Message>, Error> {
        let mut receiver = self.receiver.lock().await;
        Ok(timeout(wait, receiver.recv()).await.unwrap_or(None))
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        for channel in self.subscribed.get_mut().drain() {
            self.hub.remove(&channel, self.id);
        }
    }
}
