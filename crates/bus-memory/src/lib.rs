//! In-memory implementation of the bus crate.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Connections to the in-memory bus.
pub mod connection;

/// Channel validation and wildcard matching.
pub mod subject;

pub use connection::{Error, MemoryConnection};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use courier_bus::{Bus, Message};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

type Inbox = mpsc::UnboundedSender<Message>;
type Inboxes = HashMap<u64, Inbox>;

/// Routing state shared by every connection of one bus.
#[derive(Debug, Default)]
struct Hub {
    next_connection_id: AtomicU64,
    subscriptions: Mutex<HashMap<String, Inboxes>>,
}

impl Hub {
    fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    fn insert(&self, pattern: &str, connection_id: u64, inbox: Inbox) {
        self.subscriptions
            .lock()
            .entry(pattern.to_string())
            .or_default()
            .insert(connection_id, inbox);
    }

    fn remove(&self, pattern: &str, connection_id: u64) {
        let mut subscriptions = self.subscriptions.lock();
        if let Some(inboxes) = subscriptions.get_mut(pattern) {
            inboxes.remove(&connection_id);
            if inboxes.is_empty() {
                subscriptions.remove(pattern);
            }
        }
    }

    fn publish(&self, channel: &str, payload: &Bytes) -> usize {
        let subscriptions = self.subscriptions.lock();
        let mut delivered = 0;

        for (pattern, inboxes) in subscriptions.iter() {
            if !subject::matches(pattern, channel) {
                continue;
            }
            for inbox in inboxes.values() {
                if inbox.send(Message::new(channel, payload.clone())).is_ok() {
                    delivered += 1;
                }
            }
        }

        trace!(channel, delivered, "published to in-memory bus");
        delivered
    }
}

/// An in-process bus. Clones share the same routing state.
#[derive(Clone, Debug, Default)]
pub struct MemoryBus {
    hub: Arc<Hub>,
}

impl MemoryBus {
    /// Creates a new, empty in-memory bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel patterns that currently have at least one subscriber, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.hub.subscriptions.lock().keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Number of connections subscribed to exactly this channel pattern.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.hub
            .subscriptions
            .lock()
            .get(channel)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl Bus for MemoryBus {
    type Error = Error;
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, Error> {
        Ok(MemoryConnection::new(self.hub.clone()))
    }
}
