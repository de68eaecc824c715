use crate::error::{Error, Result};

use std::sync::Arc;

use courier_bus::Connection;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// A call-scoped subscription to a response channel.
///
/// Call [`Subscription::release`] to unsubscribe in place. If the guard is dropped unreleased,
/// for example because the call future was cancelled, the unsubscribe is spawned on the
/// current runtime and the connection goes with it.
#[derive(Debug)]
pub struct Subscription<C>
where
    C: Connection,
{
    connection: Arc<C>,
    channel: String,
    released: bool,
}

impl<C> Subscription<C>
where
    C: Connection,
{
    pub async fn open(connection: C, channel: &str) -> Result<Self> {
        connection.subscribe(channel).await.map_err(Error::bus)?;
        debug!(channel, "subscribed to response channel");

        Ok(Self {
            connection: Arc::new(connection),
            channel: channel.to_string(),
            released: false,
        })
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub async fn release(mut self) {
        self.released = true;
        unsubscribe(self.connection.as_ref(), &self.channel).await;
    }
}

impl<C> Drop for Subscription<C>
where
    C: Connection,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let connection = Arc::clone(&self.connection);
        let channel = std::mem::take(&mut self.channel);
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                unsubscribe(connection.as_ref(), &channel).await;
            });
        }
    }
}

async fn unsubscribe<C>(connection: &C, channel: &str)
where
    C: Connection,
{
    match connection.unsubscribe(channel).await {
        Ok(()) => debug!(channel, "released response channel"),
        Err(e) => warn!(channel, "failed to release response channel: {}", e),
    }
}
