//! Server side of the RPC layer.
//!
//! A [`Server`] listens on one service channel, resolves each incoming [`Request`] against a
//! [`Registry`], and publishes a [`Response`] or [`Failure`] on the channel named by the
//! request's digest. Requests are handled one at a time, in arrival order.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod options;
mod registry;

pub use error::{Error, Result};
pub use options::ServerOptions;
pub use registry::{Function, FunctionRegistry, Registry};

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use courier_bus::{Bus, Connection};
use courier_contract::codec::{self, Decoded};
use courier_contract::{Contract, Digest, Failure, FailureCode, Request, Response};
use courier_middleware::{Handler, Pipeline};
use futures::FutureExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

/// Builds a [`Server`].
#[derive(Debug)]
pub struct ServerBuilder<R>
where
    R: Registry,
{
    channel: String,
    registry: R,
    pipeline: Pipeline,
    options: ServerOptions,
}

impl<R> ServerBuilder<R>
where
    R: Registry,
{
    /// Starts a builder for a server on the service channel.
    pub fn new<K>(channel: K, registry: R) -> Self
    where
        K: Into<String>,
    {
        Self {
            channel: channel.into(),
            registry,
            pipeline: Pipeline::new(),
            options: ServerOptions::default(),
        }
    }

    /// Adds a handler run on every incoming request before it is invoked.
    #[must_use]
    pub fn register_before<H>(mut self, handler: H) -> Self
    where
        H: Handler,
    {
        self.pipeline.register_before(handler);
        self
    }

    /// Adds a handler run on every outgoing response before it is published.
    #[must_use]
    pub fn register_after<H>(mut self, handler: H) -> Self
    where
        H: Handler,
    {
        self.pipeline.register_after(handler);
        self
    }

    /// Sets the server options.
    #[must_use]
    pub const fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Connects to the bus and builds the server. The server does not listen until
    /// [`Server::run`] or [`Server::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus refuses a connection.
    pub async fn build<B>(self, bus: &B) -> Result<Server<B, R>>
    where
        B: Bus,
    {
        let connection = bus.connect().await.map_err(Error::bus)?;

        let task_tracker = TaskTracker::new();
        task_tracker.close();

        Ok(Server {
            inner: Arc::new(Inner {
                channel: self.channel,
                connection,
                registry: self.registry,
                pipeline: self.pipeline,
                options: self.options,
                running: AtomicBool::new(false),
                task_tracker,
            }),
        })
    }
}

struct Inner<B, R>
where
    B: Bus,
    R: Registry,
{
    channel: String,
    connection: B::Connection,
    registry: R,
    pipeline: Pipeline,
    options: ServerOptions,
    running: AtomicBool,
    task_tracker: TaskTracker,
}

/// Serves the functions of a registry on one service channel.
///
/// Clones share the same connection and running state.
pub struct Server<B, R>
where
    B: Bus,
    R: Registry,
{
    inner: Arc<Inner<B, R>>,
}

impl<B, R> Clone for Server<B, R>
where
    B: Bus,
    R: Registry,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, R> fmt::Debug for Server<B, R>
where
    B: Bus,
    R: Registry,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("channel", &self.inner.channel)
            .field("running", &self.is_running())
            .field("pipeline", &self.inner.pipeline)
            .finish_non_exhaustive()
    }
}

impl<B, R> Server<B, R>
where
    B: Bus,
    R: Registry,
{
    /// Creates a server with no middleware and default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus refuses a connection.
    pub async fn new<K>(bus: &B, channel: K, registry: R) -> Result<Self>
    where
        K: Into<String>,
    {
        ServerBuilder::new(channel, registry).build(bus).await
    }

    /// The service channel.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Whether the listen loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Listens on the service channel until [`Server::close`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is already running or the bus fails. Errors handling
    /// a single request are logged and do not stop the loop.
    pub async fn run(&self) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        self.listen().await
    }

    /// Runs the listen loop on a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is already running.
    pub fn start(&self) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        let server = self.clone();
        self.inner.task_tracker.spawn(async move {
            if let Err(e) = server.listen().await {
                error!("server stopped: {}", e);
            }
        });

        Ok(())
    }

    /// Stops listening. The loop notices after its current receive.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus fails to unsubscribe.
    pub async fn close(&self) -> Result<()> {
        self.inner.running.store(false, Ordering::SeqCst);

        self.inner
            .connection
            .unsubscribe(&self.inner.channel)
            .await
            .map_err(Error::bus)
    }

    /// Waits for a loop started with [`Server::start`] to finish.
    pub async fn wait(&self) {
        self.inner.task_tracker.wait().await;
    }

    /// Closes the server and waits for its background loop to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus fails to unsubscribe.
    pub async fn shutdown(&self) -> Result<()> {
        debug!(channel = %self.inner.channel, "shutting down server");

        self.close().await?;
        self.wait().await;

        Ok(())
    }

    #[instrument(skip(self), fields(channel = %self.inner.channel))]
    async fn listen(&self) -> Result<()> {
        let result = self.receive_requests().await;
        self.inner.running.store(false, Ordering::SeqCst);

        info!("stopped listening");
        result
    }

    async fn receive_requests(&self) -> Result<()> {
        let inner = &self.inner;

        inner
            .connection
            .subscribe(&inner.channel)
            .await
            .map_err(Error::bus)?;
        info!("listening");

        while inner.running.load(Ordering::SeqCst) {
            let Some(message) = inner
                .connection
                .recv_message(inner.options.poll_interval)
                .await
                .map_err(Error::bus)?
            else {
                continue;
            };

            if !message.is_payload() {
                continue;
            }

            let request = match codec::decode(&message.payload, None) {
                Ok(Decoded::Accepted(Contract::Request(request))) => request,
                Ok(_) => {
                    debug!("discarded non-request contract");
                    continue;
                }
                Err(e) => {
                    debug!("discarded malformed payload: {}", e);
                    continue;
                }
            };

            if let Err(e) = self.dispatch(request).await {
                error!("failed to dispatch request: {}", e);
            }
        }

        // Covers a close that landed before the subscribe above.
        inner
            .connection
            .unsubscribe(&inner.channel)
            .await
            .map_err(Error::bus)
    }

    /// Handles one request, publishing its reply on the channel named by its digest.
    ///
    /// Function errors and panics are answered with an exception failure. Unknown functions
    /// are answered with a no-handler failure.
    ///
    /// # Errors
    ///
    /// Returns an error if middleware aborts the request, in which case nothing is
    /// published, or if the reply cannot be published.
    #[instrument(skip(self, request), fields(func = %request.func(), digest = %request.digest()))]
    pub async fn dispatch(&self, request: Request) -> Result<()> {
        let inner = &self.inner;

        let request = inner.pipeline.execute_before_request(request)?;
        let digest = request.digest().clone();

        let Some(function) = inner.registry.resolve(request.func()) else {
            let message = format!("no handler for {}", request.func());
            warn!("{}", message);

            let failure = Failure::new(digest.clone(), FailureCode::NoHandler, message);
            return self.publish(&digest, Contract::from(failure)).await;
        };

        let (_, args, kwargs) = request.into_parts();
        let reply = match AssertUnwindSafe(function.call(args, kwargs))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => {
                let response = Response::new(digest.clone(), value);
                Contract::from(inner.pipeline.execute_after_response(response)?)
            }
            Ok(Err(e)) => {
                debug!("function failed: {}", e);
                Contract::from(Failure::new(
                    digest.clone(),
                    FailureCode::Exception,
                    e.to_string(),
                ))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("function panicked: {}", message);
                Contract::from(Failure::new(
                    digest.clone(),
                    FailureCode::Exception,
                    message,
                ))
            }
        };

        self.publish(&digest, reply).await
    }

    async fn publish(&self, digest: &Digest, reply: Contract) -> Result<()> {
        let payload = codec::encode(&reply)?;

        self.inner
            .connection
            .publish(digest.as_str(), payload)
            .await
            .map_err(Error::bus)?;

        debug!(kind = %reply.contract_type(), "published reply");
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "function panicked".to_string())
}
