//! Contracts travel as a 4-element CBOR array `[contract_type, digest, headers, body]`.
//!
//! Reserved headers (`func` on requests, `request_digest` on replies) and the reserved body
//! fields are written by the codec and stripped again on decode, so the headers a contract
//! exposes are only the extra metadata added by callers and middleware.

use crate::{
    Contract, ContractType, Digest, Error, Failure, Headers, Request, Response, Result, Value,
};

use bytes::Bytes;

pub(crate) const FUNC: &str = "func";
pub(crate) const REQUEST_DIGEST: &str = "request_digest";
pub(crate) const ARGS: &str = "args";
pub(crate) const KWARGS: &str = "kwargs";
pub(crate) const FAILURE_CODE: &str = "failure_code";
pub(crate) const FAILURE_MESSAGE: &str = "failure_message";

type Record = (i64, String, Headers, Value);

/// Outcome of decoding a payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    /// The payload is a contract the caller asked for.
    Accepted(Contract),
    /// The payload is a reply to some other request.
    NotMatching,
}

/// Encodes a contract into its wire form.
///
/// # Errors
///
/// Returns an error if a value in the contract cannot be serialized.
pub fn encode(contract: &Contract) -> Result<Bytes> {
    let (headers, body) = match contract {
        Contract::Request(request) => (request.wire_headers(), request.wire_body()),
        Contract::Response(response) => (response.wire_headers(), response.body().clone()),
        Contract::Failure(failure) => (failure.wire_headers(), failure.wire_body()),
    };

    let mut buffer = Vec::new();
    ciborium::into_writer(
        &(
            contract.contract_type().as_i64(),
            contract.digest().as_str(),
            &headers,
            &body,
        ),
        &mut buffer,
    )
    .map_err(|e| Error::Serialize(e.to_string()))?;

    Ok(Bytes::from(buffer))
}

/// Decodes a payload into a contract.
///
/// With an `expected_digest`, replies to any other request are reported as
/// [`Decoded::NotMatching`] before their bodies are parsed. Requests are never filtered.
///
/// # Errors
///
/// Returns an error if the payload is not a well formed contract.
pub fn decode(payload: &[u8], expected_digest: Option<&Digest>) -> Result<Decoded> {
    let (contract_type, digest, headers, body): Record =
        ciborium::from_reader(payload).map_err(|e| Error::Deserialize(e.to_string()))?;

    let contract_type = ContractType::try_from(contract_type)?;
    let digest = Digest::from_wire(digest);

    let contract = match contract_type {
        ContractType::Request => Contract::Request(Request::reconstruct(digest, headers, body)?),
        ContractType::Response | ContractType::Failure => {
            let request_digest = peek_header(&headers, contract_type.name(), REQUEST_DIGEST)?;
            if expected_digest.is_some_and(|expected| expected.as_str() != request_digest) {
                return Ok(Decoded::NotMatching);
            }

            if contract_type == ContractType::Response {
                Contract::Response(Response::reconstruct(digest, headers, body)?)
            } else {
                Contract::Failure(Failure::reconstruct(digest, headers, body)?)
            }
        }
    };

    Ok(Decoded::Accepted(contract))
}

fn peek_header<'a>(
    headers: &'a Headers,
    contract: &'static str,
    key: &'static str,
) -> Result<&'a str> {
    match headers.get(key) {
        Some(Value::Text(text)) => Ok(text),
        Some(_) => Err(Error::mistyped(contract, key)),
        None => Err(Error::missing(contract, key)),
    }
}

pub(crate) fn take_header(
    headers: &mut Headers,
    contract: &'static str,
    key: &'static str,
) -> Result<String> {
    match headers.shift_remove(key) {
        Some(Value::Text(text)) => Ok(text),
        Some(_) => Err(Error::mistyped(contract, key)),
        None => Err(Error::missing(contract, key)),
    }
}

pub(crate) fn take_field(body: &mut Vec<(Value, Value)>, key: &str) -> Option<Value> {
    let index = body
        .iter()
        .position(|(field, _)| field.as_text() == Some(key))?;
    Some(body.remove(index).1)
}

pub(crate) fn wire_headers(reserved: &'static str, value: Value, extra: &Headers) -> Headers {
    let mut headers = Headers::with_capacity(extra.len() + 1);
    headers.insert(reserved.to_string(), value);
    for (key, value) in extra {
        if key != FUNC && key != REQUEST_DIGEST {
            headers.insert(key.clone(), value.clone());
        }
    }
    headers
}
