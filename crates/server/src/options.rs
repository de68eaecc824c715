use std::time::Duration;

use courier_bus::DEFAULT_POLL_INTERVAL;

/// Options for a server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Longest single wait on the service channel between checks of the running flag.
    pub poll_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServerOptions {
    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
