use crate::codec::{self, Decoded};
use crate::{Digest, Error, Failure, Headers, Request, Response};

use std::fmt;

use bytes::Bytes;

/// Discriminant of a contract on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContractType {
    /// A call of a remote function.
    Request,
    /// The return value of a call.
    Response,
    /// The reason a call has no return value.
    Failure,
}

impl ContractType {
    /// The integer tag written on the wire.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Request => 0,
            Self::Response => 1,
            Self::Failure => -1,
        }
    }

    /// Human readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Failure => "failure",
        }
    }
}

impl TryFrom<i64> for ContractType {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            -1 => Ok(Self::Failure),
            other => Err(Error::UnknownContractType(other)),
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One message exchanged over the bus.
#[derive(Clone, Debug, PartialEq)]
pub enum Contract {
    /// See [`Request`].
    Request(Request),
    /// See [`Response`].
    Response(Response),
    /// See [`Failure`].
    Failure(Failure),
}

impl Contract {
    /// The kind of this contract.
    #[must_use]
    pub const fn contract_type(&self) -> ContractType {
        match self {
            Self::Request(_) => ContractType::Request,
            Self::Response(_) => ContractType::Response,
            Self::Failure(_) => ContractType::Failure,
        }
    }

    /// The contract's own digest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        match self {
            Self::Request(request) => request.digest(),
            Self::Response(response) => response.digest(),
            Self::Failure(failure) => failure.digest(),
        }
    }

    /// The digest of the request this contract answers, if it is a reply.
    #[must_use]
    pub const fn request_digest(&self) -> Option<&Digest> {
        match self {
            Self::Request(_) => None,
            Self::Response(response) => Some(response.request_digest()),
            Self::Failure(failure) => Some(failure.request_digest()),
        }
    }

    /// Extra metadata headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Request(request) => request.headers(),
            Self::Response(response) => response.headers(),
            Self::Failure(failure) => failure.headers(),
        }
    }

    /// Mutable access to the extra metadata headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            Self::Request(request) => request.headers_mut(),
            Self::Response(response) => response.headers_mut(),
            Self::Failure(failure) => failure.headers_mut(),
        }
    }
}

impl From<Request> for Contract {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Contract {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Failure> for Contract {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

impl TryFrom<Bytes> for Contract {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Error> {
        match codec::decode(&bytes, None)? {
            Decoded::Accepted(contract) => Ok(contract),
            // Unreachable without a digest filter.
            Decoded::NotMatching => Err(Error::Deserialize("contract was filtered".to_string())),
        }
    }
}

impl TryFrom<Contract> for Bytes {
    type Error = Error;

    fn try_from(contract: Contract) -> Result<Self, Error> {
        codec::encode(&contract)
    }
}
