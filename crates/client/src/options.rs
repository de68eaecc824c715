use std::time::Duration;

use courier_bus::DEFAULT_POLL_INTERVAL;

/// Options for a client.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// How long a call may wait for its reply. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Whether a failure reply is returned as [`crate::Error::RequestFailure`] rather than
    /// as [`crate::Reply::Failure`].
    pub raise_on_failure: bool,

    /// Longest single wait on the response channel between deadline checks.
    pub poll_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            raise_on_failure: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientOptions {
    /// Sets the call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets whether failure replies are raised as errors.
    #[must_use]
    pub const fn with_raise_on_failure(mut self, raise_on_failure: bool) -> Self {
        self.raise_on_failure = raise_on_failure;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
