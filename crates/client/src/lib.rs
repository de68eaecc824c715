//! Client side of the RPC layer.
//!
//! A [`Client`] publishes [`Request`]s on a service channel and waits for the matching reply
//! on a response channel named by the request's digest. Every call gets its own inbox
//! connection and response channel, so concurrent calls on one client never see each other's
//! replies.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod options;
mod subscription;

pub use error::{Error, Result};
pub use options::ClientOptions;

use subscription::Subscription;

use courier_bus::{Bus, Connection};
use courier_contract::codec::{self, Decoded};
use courier_contract::{Contract, ContractType, Failure, Kwargs, Request, Value};
use courier_middleware::{Error as MiddlewareError, Handler, Pipeline, Stage};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

/// The outcome of a call that did not raise.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// The function's return value.
    Value(Value),
    /// The reason there is no return value.
    Failure(Failure),
}

impl Reply {
    /// The return value, or the failure as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestFailure`] if the reply is a failure.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Failure(failure) => Err(Error::RequestFailure(failure)),
        }
    }

    /// The return value converted into a Rust type.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply is a failure or the value does not have the shape of `T`.
    pub fn deserialize<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        Ok(courier_contract::from_value(&self.into_value()?)?)
    }

    /// The failure, if the reply is one.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Value(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Calls functions served on one service channel.
#[derive(Debug)]
pub struct Client<B>
where
    B: Bus,
{
    bus: B,
    channel: String,
    publisher: B::Connection,
    pipeline: Pipeline,
    options: ClientOptions,
}

impl<B> Client<B>
where
    B: Bus,
{
    /// Creates a client for the service channel with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus refuses a connection.
    pub async fn new<K>(bus: B, channel: K) -> Result<Self>
    where
        K: Into<String>,
    {
        Self::with_options(bus, channel, ClientOptions::default()).await
    }

    /// Creates a client for the service channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus refuses a connection.
    pub async fn with_options<K>(bus: B, channel: K, options: ClientOptions) -> Result<Self>
    where
        K: Into<String>,
    {
        let publisher = bus.connect().await.map_err(Error::bus)?;

        Ok(Self {
            bus,
            channel: channel.into(),
            publisher,
            pipeline: Pipeline::new(),
            options,
        })
    }

    /// Adds a handler run on every outgoing request.
    pub fn register_before<H>(&mut self, handler: H)
    where
        H: Handler,
    {
        self.pipeline.register_before(handler);
    }

    /// Adds a handler run on every incoming reply.
    pub fn register_after<H>(&mut self, handler: H)
    where
        H: Handler,
    {
        self.pipeline.register_after(handler);
    }

    /// The service channel requests are published on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The client's options.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Calls a remote function and waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if middleware aborts the call, the bus fails, the timeout passes, or
    /// the reply is a failure and the client raises on failure.
    #[instrument(skip(self, args, kwargs), fields(channel = %self.channel))]
    pub async fn call(&self, func: &str, args: Vec<Value>, kwargs: Kwargs) -> Result<Reply> {
        let started = Instant::now();
        let request = self
            .pipeline
            .execute_before_request(Request::new(func, args, kwargs))?;

        let inbox = self.bus.connect().await.map_err(Error::bus)?;
        let subscription = Subscription::open(inbox, request.digest().as_str()).await?;

        let result = self.exchange(&subscription, request, started).await;
        subscription.release().await;
        result
    }

    /// Calls a remote function with positional arguments only, returning its value.
    ///
    /// Failure replies are always returned as errors.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub async fn invoke(&self, func: &str, args: Vec<Value>) -> Result<Value> {
        self.call(func, args, Kwargs::new()).await?.into_value()
    }

    /// A handle for calling one remote function repeatedly.
    pub fn function<K>(&self, name: K) -> RemoteFunction<'_, B>
    where
        K: Into<String>,
    {
        RemoteFunction {
            client: self,
            name: name.into(),
        }
    }

    async fn exchange(
        &self,
        subscription: &Subscription<B::Connection>,
        request: Request,
        started: Instant,
    ) -> Result<Reply> {
        let func = request.func().to_string();
        let digest = request.digest().clone();

        let payload = codec::encode(&Contract::Request(request))?;
        self.publisher
            .publish(&self.channel, payload)
            .await
            .map_err(Error::bus)?;
        debug!(%digest, "published request");

        let deadline = self
            .options
            .timeout
            .and_then(|timeout| started.checked_add(timeout).map(|at| (at, timeout)));

        loop {
            let wait = match deadline {
                Some((at, timeout)) => {
                    let now = Instant::now();
                    if now >= at {
                        debug!(%digest, "call timed out");
                        return Err(Error::Timeout { func, timeout });
                    }
                    self.options.poll_interval.min(at - now)
                }
                None => self.options.poll_interval,
            };

            let Some(message) = subscription
                .connection()
                .recv_message(wait)
                .await
                .map_err(Error::bus)?
            else {
                continue;
            };

            if !message.is_payload() {
                continue;
            }

            match codec::decode(&message.payload, Some(&digest)) {
                Ok(Decoded::Accepted(Contract::Request(_))) => {
                    debug!(%digest, "discarded request on response channel");
                }
                Ok(Decoded::Accepted(reply)) => return self.resolve(reply),
                Ok(Decoded::NotMatching) => trace!(%digest, "discarded reply to another request"),
                Err(e) => debug!(%digest, "discarded malformed reply: {}", e),
            }
        }
    }

    fn resolve(&self, reply: Contract) -> Result<Reply> {
        let expected = reply.contract_type();

        match self.pipeline.execute_after(reply)? {
            Contract::Response(response) => Ok(Reply::Value(response.into_body())),
            Contract::Failure(failure) if self.options.raise_on_failure => {
                Err(Error::RequestFailure(failure))
            }
            Contract::Failure(failure) => Ok(Reply::Failure(failure)),
            Contract::Request(_) => Err(MiddlewareError::UnexpectedContract {
                stage: Stage::After,
                expected,
                actual: ContractType::Request,
            }
            .into()),
        }
    }
}

/// A named handle on one remote function.
#[derive(Debug)]
pub struct RemoteFunction<'a, B>
where
    B: Bus,
{
    client: &'a Client<B>,
    name: String,
}

impl<B> RemoteFunction<'_, B>
where
    B: Bus,
{
    /// Name of the remote function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the function with positional arguments.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub async fn call(&self, args: Vec<Value>) -> Result<Reply> {
        self.client.call(&self.name, args, Kwargs::new()).await
    }

    /// Calls the function with positional and keyword arguments.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub async fn call_with(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<Reply> {
        self.client.call(&self.name, args, kwargs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use bytes::Bytes;
    use courier_bus_memory::MemoryBus;
    use courier_contract::{FailureCode, Response, args, kwargs};
    use courier_middleware::BoxError;
    use tokio::task::JoinHandle;
    use tracing_test::traced_test;

    const SERVICE: &str = "clock-service";

    fn encode(contract: impl Into<Contract>) -> Bytes {
        codec::encode(&contract.into()).unwrap()
    }

    /// Answers the next request on the service channel with the given payloads.
    async fn serve_once<F>(bus: &MemoryBus, reply: F) -> JoinHandle<Request>
    where
        F: FnOnce(&Request) -> Vec<Bytes> + Send + 'static,
    {
        let connection = bus.connect().await.unwrap();
        connection.subscribe(SERVICE).await.unwrap();

        tokio::spawn(async move {
            loop {
                let message = connection
                    .recv_message(Duration::from_secs(5))
                    .await
                    .unwrap()
                    .expect("no request arrived");
                if !message.is_payload() {
                    continue;
                }

                let Contract::Request(request) = Contract::try_from(message.payload).unwrap()
                else {
                    panic!("expected a request");
                };
                for payload in reply(&request) {
                    connection
                        .publish(request.digest().as_str(), payload)
                        .await
                        .unwrap();
                }
                return request;
            }
        })
    }

    #[tokio::test]
    async fn test_call_returns_value() {
        let bus = MemoryBus::new();
        let server = serve_once(&bus, |request| {
            vec![encode(Response::new(
                request.digest().clone(),
                Value::from("12:00"),
            ))]
        })
        .await;

        let client = Client::new(bus.clone(), SERVICE).await.unwrap();
        let value = client
            .call("clock", args![], kwargs! { "zone" => "utc" })
            .await
            .unwrap();

        assert_eq!(value, Reply::Value(Value::from("12:00")));

        let request = server.await.unwrap();
        assert_eq!(request.func(), "clock");
        assert_eq!(request.kwargs().get("zone"), Some(&Value::from("utc")));
    }

    #[tokio::test]
    async fn test_foreign_and_malformed_replies_are_skipped() {
        let bus = MemoryBus::new();
        serve_once(&bus, |request| {
            let stranger = Request::new("clock", args![], kwargs! {});
            vec![
                encode(Response::new(stranger.digest().clone(), Value::from("11:00"))),
                Bytes::from_static(b"not a contract"),
                encode(stranger),
                encode(Failure::new(
                    request.digest().clone(),
                    FailureCode::Exception,
                    "boom",
                )),
            ]
        })
        .await;

        let options = ClientOptions::default().with_raise_on_failure(false);
        let client = Client::with_options(bus.clone(), SERVICE, options)
            .await
            .unwrap();
        let reply = client.function("clock").call(args![]).await.unwrap();

        let failure = reply.failure().unwrap();
        assert_eq!(failure.code(), FailureCode::Exception);
        assert_eq!(failure.message(), "boom");
    }

    #[tokio::test]
    async fn test_failure_raises_by_default() {
        let bus = MemoryBus::new();
        serve_once(&bus, |request| {
            vec![encode(Failure::new(
                request.digest().clone(),
                FailureCode::NoHandler,
                "no handler for missing",
            ))]
        })
        .await;

        let client = Client::new(bus.clone(), SERVICE).await.unwrap();
        let error = client.invoke("missing", args![]).await.unwrap_err();

        let Error::RequestFailure(failure) = error else {
            panic!("expected a request failure, got {error:?}");
        };
        assert_eq!(failure.code(), FailureCode::NoHandler);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_timeout_releases_subscription() {
        let bus = MemoryBus::new();
        let options = ClientOptions::default().with_timeout(Duration::from_millis(10));
        let client = Client::with_options(bus.clone(), SERVICE, options)
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let error = client.invoke("clock", args![]).await.unwrap_err();

        assert!(matches!(
            error,
            Error::Timeout { ref func, timeout } if func == "clock" && timeout == Duration::from_millis(10)
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(bus.channels().is_empty());
        assert!(logs_contain("call timed out"));
    }

    #[tokio::test]
    async fn test_cancelled_call_releases_subscription() {
        let bus = MemoryBus::new();
        let client = Client::new(bus.clone(), SERVICE).await.unwrap();

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), client.invoke("clock", args![])).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(bus.channels().is_empty());
    }

    #[tokio::test]
    async fn test_before_middleware_abort_publishes_nothing() {
        let bus = MemoryBus::new();
        let spy = bus.connect().await.unwrap();
        spy.subscribe(">").await.unwrap();

        let mut client = Client::new(bus.clone(), SERVICE).await.unwrap();
        client.register_before(|_: Contract| -> std::result::Result<Option<Contract>, BoxError> {
            Ok(None)
        });

        let error = client.invoke("clock", args![]).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Middleware(MiddlewareError::NoContract {
                stage: Stage::Before,
                index: 0
            })
        ));

        let confirmation = spy.poll_message().await.unwrap().unwrap();
        assert!(!confirmation.is_payload());
        assert!(spy.poll_message().await.unwrap().is_none());
        assert_eq!(bus.channels(), vec![">".to_string()]);
    }

    #[tokio::test]
    async fn test_after_middleware_sees_replies() {
        let bus = MemoryBus::new();
        serve_once(&bus, |request| {
            vec![encode(Response::new(request.digest().clone(), Value::from(5)))]
        })
        .await;

        let mut client = Client::new(bus.clone(), SERVICE).await.unwrap();
        client.register_before(|mut contract: Contract| -> std::result::Result<Option<Contract>, BoxError> {
            contract
                .headers_mut()
                .insert("caller".to_string(), Value::from("test"));
            Ok(Some(contract))
        });
        client.register_after(|contract: Contract| -> std::result::Result<Option<Contract>, BoxError> {
            let Contract::Response(mut response) = contract else {
                return Err("expected a response".into());
            };
            response.set_body(Value::from(50));
            Ok(Some(Contract::Response(response)))
        });

        let value = client.invoke("add", args![2, 3]).await.unwrap();
        assert_eq!(value, Value::from(50));
    }

    #[tokio::test]
    async fn test_reply_deserialize() {
        let bus = MemoryBus::new();
        serve_once(&bus, |request| {
            vec![encode(Response::new(request.digest().clone(), Value::from(5)))]
        })
        .await;

        let client = Client::new(bus.clone(), SERVICE).await.unwrap();
        let sum: i64 = client
            .function("add")
            .call_with(args![2], kwargs! { "b" => 3 })
            .await
            .unwrap()
            .deserialize()
            .unwrap();

        assert_eq!(sum, 5);
    }
}
