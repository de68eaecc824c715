use thiserror::Error;

/// Result type alias for contract operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, encoding or decoding contracts.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The contract could not be serialized.
    #[error("failed to serialize contract: {0}")]
    Serialize(String),

    /// The payload is not a 4-field contract record.
    #[error("failed to deserialize contract: {0}")]
    Deserialize(String),

    /// The record names a contract type that does not exist.
    #[error("unknown contract type: {0}")]
    UnknownContractType(i64),

    /// A failure body names a failure code that does not exist.
    #[error("unknown failure code: {0}")]
    UnknownFailureCode(i128),

    /// A required field is missing or has the wrong shape.
    #[error("malformed {contract}: {field} {problem}")]
    Malformed {
        /// The contract kind being decoded.
        contract: &'static str,
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        problem: &'static str,
    },

    /// A value could not be converted to or from a Rust type.
    #[error("value conversion failed: {0}")]
    Value(String),
}

impl Error {
    pub(crate) const fn missing(contract: &'static str, field: &'static str) -> Self {
        Self::Malformed {
            contract,
            field,
            problem: "is missing",
        }
    }

    pub(crate) const fn mistyped(contract: &'static str, field: &'static str) -> Self {
        Self::Malformed {
            contract,
            field,
            problem: "has the wrong type",
        }
    }
}
