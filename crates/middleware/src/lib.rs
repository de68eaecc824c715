//! Ordered hooks that observe and rewrite contracts on their way in and out.
//!
//! A [`Pipeline`] holds a `before` and an `after` list of [`Handler`]s. Each stage folds a
//! contract through its handlers in registration order. Every handler must hand a contract
//! on; returning none or failing aborts the whole stage.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt;
use std::sync::Arc;

use courier_contract::{Contract, ContractType, Request, Response};
use tracing::debug;

/// Error type handlers may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single middleware step.
///
/// Any `Fn(Contract) -> Result<Option<Contract>, BoxError>` closure is a handler.
pub trait Handler
where
    Self: Send + Sync + 'static,
{
    /// Handles a contract, returning the contract to pass on.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the stage.
    fn handle(&self, contract: Contract) -> Result<Option<Contract>, BoxError>;
}

impl<F> Handler for F
where
    F: Fn(Contract) -> Result<Option<Contract>, BoxError> + Send + Sync + 'static,
{
    fn handle(&self, contract: Contract) -> Result<Option<Contract>, BoxError> {
        self(contract)
    }
}

/// The two points at which a pipeline runs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Before a request is sent or invoked.
    Before,
    /// After a reply is produced or received.
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Ordered `before` and `after` handler lists.
#[derive(Clone, Default)]
pub struct Pipeline {
    before: Vec<Arc<dyn Handler>>,
    after: Vec<Arc<dyn Handler>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the `before` stage.
    pub fn register_before<H>(&mut self, handler: H)
    where
        H: Handler,
    {
        self.before.push(Arc::new(handler));
    }

    /// Appends a handler to the `after` stage.
    pub fn register_after<H>(&mut self, handler: H)
    where
        H: Handler,
    {
        self.after.push(Arc::new(handler));
    }

    /// Runs the `before` stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler fails or returns no contract.
    pub fn execute_before(&self, contract: Contract) -> Result<Contract, Error> {
        Self::execute(Stage::Before, &self.before, contract)
    }

    /// Runs the `after` stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler fails or returns no contract.
    pub fn execute_after(&self, contract: Contract) -> Result<Contract, Error> {
        Self::execute(Stage::After, &self.after, contract)
    }

    /// Runs the `before` stage on a request, which must stay a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage fails or a handler swapped the contract kind.
    pub fn execute_before_request(&self, request: Request) -> Result<Request, Error> {
        match self.execute_before(Contract::Request(request))? {
            Contract::Request(request) => Ok(request),
            other => Err(Error::UnexpectedContract {
                stage: Stage::Before,
                expected: ContractType::Request,
                actual: other.contract_type(),
            }),
        }
    }

    /// Runs the `after` stage on a response, which must stay a response.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage fails or a handler swapped the contract kind.
    pub fn execute_after_response(&self, response: Response) -> Result<Response, Error> {
        match self.execute_after(Contract::Response(response))? {
            Contract::Response(response) => Ok(response),
            other => Err(Error::UnexpectedContract {
                stage: Stage::After,
                expected: ContractType::Response,
                actual: other.contract_type(),
            }),
        }
    }

    fn execute(
        stage: Stage,
        handlers: &[Arc<dyn Handler>],
        mut contract: Contract,
    ) -> Result<Contract, Error> {
        for (index, handler) in handlers.iter().enumerate() {
            contract = match handler.handle(contract) {
                Ok(Some(contract)) => contract,
                Ok(None) => {
                    debug!(%stage, index, "middleware returned no contract");
                    return Err(Error::NoContract { stage, index });
                }
                Err(source) => {
                    debug!(%stage, index, "middleware failed: {}", source);
                    return Err(Error::Handler {
                        stage,
                        index,
                        source,
                    });
                }
            };
        }

        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use courier_contract::{Failure, FailureCode, Value, args, kwargs};
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    fn request() -> Request {
        Request::new("clock", args![], kwargs! {})
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Handler {
        let log = Arc::clone(log);
        move |contract: Contract| -> Result<Option<Contract>, BoxError> {
            log.lock().push(name);
            Ok(Some(contract))
        }
    }

    struct StampHeader(&'static str);

    impl Handler for StampHeader {
        fn handle(&self, mut contract: Contract) -> Result<Option<Contract>, BoxError> {
            contract
                .headers_mut()
                .insert(self.0.to_string(), Value::from(true));
            Ok(Some(contract))
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.register_before(recorder(&log, "h1"));
        pipeline.register_before(recorder(&log, "h2"));
        pipeline.register_after(recorder(&log, "h3"));

        pipeline.execute_before(Contract::from(request())).unwrap();
        assert_eq!(*log.lock(), vec!["h1", "h2"]);

        let reply = Contract::from(Response::new(request().digest().clone(), Value::Null));
        pipeline.execute_after(reply).unwrap();
        assert_eq!(*log.lock(), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn test_handlers_rewrite_contracts() {
        let mut pipeline = Pipeline::new();
        pipeline.register_before(StampHeader("traced"));

        let request = pipeline.execute_before_request(request()).unwrap();

        assert_eq!(request.headers().get("traced"), Some(&Value::from(true)));
    }

    #[test]
    #[traced_test]
    fn test_missing_contract_aborts_stage() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.register_before(recorder(&log, "h1"));
        pipeline.register_before(|_: Contract| -> Result<Option<Contract>, BoxError> { Ok(None) });
        pipeline.register_before(recorder(&log, "h3"));

        let result = pipeline.execute_before(Contract::from(request()));

        assert!(matches!(
            result,
            Err(Error::NoContract {
                stage: Stage::Before,
                index: 1
            })
        ));
        assert_eq!(*log.lock(), vec!["h1"]);
        assert!(logs_contain("middleware returned no contract"));
    }

    #[test]
    fn test_handler_errors_propagate() {
        let mut pipeline = Pipeline::new();
        pipeline.register_after(|_: Contract| -> Result<Option<Contract>, BoxError> {
            Err("rejected".into())
        });

        let reply = Contract::from(Failure::new(
            request().digest().clone(),
            FailureCode::Exception,
            "boom",
        ));
        let error = pipeline.execute_after(reply).unwrap_err();

        assert!(matches!(
            error,
            Error::Handler {
                stage: Stage::After,
                index: 0,
                ..
            }
        ));
        assert_eq!(error.to_string(), "after middleware #0 failed: rejected");
    }

    #[test]
    fn test_swapped_contract_kind_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register_before(|contract: Contract| -> Result<Option<Contract>, BoxError> {
            Ok(Some(Contract::from(Response::new(
                contract.digest().clone(),
                Value::Null,
            ))))
        });

        let result = pipeline.execute_before_request(request());

        assert!(matches!(
            result,
            Err(Error::UnexpectedContract {
                expected: ContractType::Request,
                actual: ContractType::Response,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_pipeline_passes_contracts_through() {
        let pipeline = Pipeline::new();
        let request = request();

        assert_eq!(
            pipeline.execute_before_request(request.clone()).unwrap(),
            request
        );
    }
}
