use crate::codec::{self, FAILURE_CODE, FAILURE_MESSAGE, REQUEST_DIGEST};
use crate::{Digest, Error, Headers, Result, Value};

use std::fmt;

/// Why a call produced no return value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureCode {
    /// The server has no function registered under the requested name.
    NoHandler,
    /// The function failed while running.
    Exception,
}

impl FailureCode {
    /// The integer tag written on the wire.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::NoHandler => 0,
            Self::Exception => 1,
        }
    }
}

impl TryFrom<i128> for FailureCode {
    type Error = Error;

    fn try_from(value: i128) -> Result<Self> {
        match value {
            0 => Ok(Self::NoHandler),
            1 => Ok(Self::Exception),
            other => Err(Error::UnknownFailureCode(other)),
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHandler => f.write_str("no handler"),
            Self::Exception => f.write_str("exception"),
        }
    }
}

/// The reason a remote call has no return value.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    digest: Digest,
    request_digest: Digest,
    code: FailureCode,
    message: String,
    headers: Headers,
}

impl Failure {
    /// Creates a failure answering the request with the given digest.
    pub fn new<M>(request_digest: Digest, code: FailureCode, message: M) -> Self
    where
        M: Into<String>,
    {
        let mut failure = Self {
            digest: Digest::from_wire(String::new()),
            request_digest,
            code,
            message: message.into(),
            headers: Headers::new(),
        };
        failure.digest = Digest::for_content(&failure.wire_headers(), &failure.wire_body());
        failure
    }

    pub(crate) fn reconstruct(digest: Digest, mut headers: Headers, body: Value) -> Result<Self> {
        const CONTRACT: &str = "failure";

        let request_digest = codec::take_header(&mut headers, CONTRACT, REQUEST_DIGEST)?;

        let Value::Map(mut body) = body else {
            return Err(Error::mistyped(CONTRACT, "body"));
        };

        let code = match codec::take_field(&mut body, FAILURE_CODE) {
            Some(Value::Integer(code)) => FailureCode::try_from(i128::from(code))?,
            Some(_) => return Err(Error::mistyped(CONTRACT, FAILURE_CODE)),
            None => return Err(Error::missing(CONTRACT, FAILURE_CODE)),
        };

        let message = match codec::take_field(&mut body, FAILURE_MESSAGE) {
            Some(Value::Text(message)) => message,
            None | Some(Value::Null) => String::new(),
            Some(_) => return Err(Error::mistyped(CONTRACT, FAILURE_MESSAGE)),
        };

        Ok(Self {
            digest,
            request_digest: Digest::from_wire(request_digest),
            code,
            message,
            headers,
        })
    }

    /// The failure's own digest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Digest of the request this failure answers.
    #[must_use]
    pub const fn request_digest(&self) -> &Digest {
        &self.request_digest
    }

    /// What kind of failure this is.
    #[must_use]
    pub const fn code(&self) -> FailureCode {
        self.code
    }

    /// Human readable explanation.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra metadata headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable extra metadata headers.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub(crate) fn wire_headers(&self) -> Headers {
        codec::wire_headers(
            REQUEST_DIGEST,
            Value::Text(self.request_digest.to_string()),
            &self.headers,
        )
    }

    pub(crate) fn wire_body(&self) -> Value {
        Value::Map(vec![
            (
                Value::Text(FAILURE_CODE.to_string()),
                Value::from(self.code.as_i64()),
            ),
            (
                Value::Text(FAILURE_MESSAGE.to_string()),
                Value::Text(self.message.clone()),
            ),
        ])
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_headers() -> Headers {
        codec::wire_headers(REQUEST_DIGEST, Value::from("abc"), &Headers::new())
    }

    #[test]
    fn test_failure_codes() {
        assert_eq!(FailureCode::try_from(0_i128).unwrap(), FailureCode::NoHandler);
        assert_eq!(FailureCode::try_from(1_i128).unwrap(), FailureCode::Exception);
        assert!(matches!(
            FailureCode::try_from(7_i128),
            Err(Error::UnknownFailureCode(7))
        ));
    }

    #[test]
    fn test_null_message_reads_as_empty() {
        let body = Value::Map(vec![
            (Value::from(FAILURE_CODE), Value::from(1)),
            (Value::from(FAILURE_MESSAGE), Value::Null),
        ]);

        let failure =
            Failure::reconstruct(Digest::from_wire("d".to_string()), failure_headers(), body)
                .unwrap();

        assert_eq!(failure.code(), FailureCode::Exception);
        assert_eq!(failure.message(), "");
        assert_eq!(failure.request_digest().as_str(), "abc");
    }

    #[test]
    fn test_missing_code_is_malformed() {
        let body = Value::Map(vec![(Value::from(FAILURE_MESSAGE), Value::from("boom"))]);

        let result =
            Failure::reconstruct(Digest::from_wire("d".to_string()), failure_headers(), body);

        assert!(matches!(
            result,
            Err(Error::Malformed {
                field: FAILURE_CODE,
                ..
            })
        ));
    }

    #[test]
    fn test_display() {
        let failure = Failure::new(
            Digest::from_wire("abc".to_string()),
            FailureCode::NoHandler,
            "no handler for missing",
        );

        assert_eq!(failure.to_string(), "no handler: no handler for missing");
    }
}
