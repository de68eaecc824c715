use crate::{BoxError, Stage};

use courier_contract::ContractType;
use thiserror::Error;

/// Errors raised while running a middleware pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler returned no contract.
    #[error("{stage} middleware #{index} returned no contract")]
    NoContract {
        /// The stage being executed.
        stage: Stage,
        /// Position of the handler in its stage.
        index: usize,
    },

    /// The pipeline produced a different kind of contract than the caller needs.
    #[error("{stage} middleware produced a {actual} where a {expected} was required")]
    UnexpectedContract {
        /// The stage that was executed.
        stage: Stage,
        /// The kind the caller needs.
        expected: ContractType,
        /// The kind the pipeline produced.
        actual: ContractType,
    },

    /// A handler failed.
    #[error("{stage} middleware #{index} failed: {source}")]
    Handler {
        /// The stage being executed.
        stage: Stage,
        /// Position of the handler in its stage.
        index: usize,
        /// The handler's error.
        #[source]
        source: BoxError,
    },
}
