mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_nats::Client as AsyncNatsClient;
use async_trait::async_trait;
use bytes::Bytes;
use courier_bus::{Connection, Message};
use futures::StreamExt;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// A connection to a NATS server.
///
/// Every subscription is forwarded into one inbox by a tracked task. Dropping the connection
/// cancels those tasks, which unsubscribe from the server on their way out.
#[derive(Debug)]
pub struct NatsConnection {
    client: AsyncNatsClient,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<Message>>,
    sender: mpsc::UnboundedSender<Message>,
    subscriptions: Mutex<HashMap<String, CancellationToken>>,
    task_tracker: TaskTracker,
}

impl NatsConnection {
    pub(crate) fn new(client: AsyncNatsClient) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            client,
            receiver: AsyncMutex::new(receiver),
            sender,
            subscriptions: Mutex::new(HashMap::new()),
            task_tracker: TaskTracker::new(),
        }
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Connection for NatsConnection {
    type Error = Error;

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), Error> {
        self.client
            .publish(channel.to_string(), payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))
    }

    async fn subscribe(&self, channel: &str) -> Result<(), Error> {
        let mut subscriber = self
            .client
            .subscribe(channel.to_string())
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        let stop_token = CancellationToken::new();
        if let Some(previous) = self
            .subscriptions()
            .insert(channel.to_string(), stop_token.clone())
        {
            previous.cancel();
        }

        let sender = self.sender.clone();
        let channel_name = channel.to_string();
        self.task_tracker.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = stop_token.cancelled() => {
                        if let Err(e) = subscriber.unsubscribe().await {
                            warn!(channel = %channel_name, "failed to unsubscribe: {}", e);
                        }
                        break;
                    }
                    message = subscriber.next() => {
                        let Some(message) = message else {
                            debug!(channel = %channel_name, "subscription closed by server");
                            break;
                        };
                        if sender
                            .send(Message::new(message.subject.to_string(), message.payload))
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        debug!(channel, "subscribed");
        let _ = self.sender.send(Message::subscribed(channel));
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), Error> {
        if let Some(stop_token) = self.subscriptions().remove(channel) {
            stop_token.cancel();
        }

        debug!(channel, "unsubscribed");
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

impl Drop for NatsConnection {
    fn drop(&mut self) {
        for (_, stop_token) in self.subscriptions().drain() {
            stop_token.cancel();
        }
        self.task_tracker.close();
    }
}
