//! Wire contracts exchanged between RPC clients and servers.
//!
//! Every message on the bus is one [`Contract`]: a [`Request`] naming a remote function, a
//! [`Response`] carrying its return value, or a [`Failure`] explaining why there is none.
//! Responses and failures carry the [`Digest`] of the request they answer, which is how a
//! client picks its own replies out of shared traffic.
//!
//! # Example
//!
//! ```
//! use courier_contract::{Contract, Decoded, Request, Response, Value, args, codec, kwargs};
//!
//! let request = Request::new("add", args![2, 3], kwargs! {});
//! let response = Response::new(request.digest().clone(), Value::from(5));
//!
//! let payload = codec::encode(&Contract::from(response)).unwrap();
//! match codec::decode(&payload, Some(request.digest())).unwrap() {
//!     Decoded::Accepted(Contract::Response(response)) => assert_eq!(response.body(), &Value::from(5)),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod codec;

mod contract;
mod digest;
mod error;
mod failure;
mod request;
mod response;

pub use codec::Decoded;
pub use contract::{Contract, ContractType};
pub use digest::Digest;
pub use error::{Error, Result};
pub use failure::{Failure, FailureCode};
pub use request::Request;
pub use response::Response;

/// Any self-describing value that can travel in a contract.
pub use ciborium::Value;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Ordered metadata attached to a contract.
pub type Headers = IndexMap<String, Value>;

/// Ordered keyword arguments of a request.
pub type Kwargs = IndexMap<String, Value>;

/// Converts any serializable type into a contract value.
///
/// # Errors
///
/// Returns an error if the type cannot be represented as a CBOR value.
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    Value::serialized(value).map_err(|e| Error::Value(e.to_string()))
}

/// Converts a contract value into any deserializable type.
///
/// # Errors
///
/// Returns an error if the value does not have the shape of `T`.
pub fn from_value<T>(value: &Value) -> Result<T>
where
    T: DeserializeOwned,
{
    value.deserialized().map_err(|e| Error::Value(e.to_string()))
}

/// Builds a positional argument list from plain values.
///
/// ```
/// let args = courier_contract::args![2, "three", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

/// Builds keyword arguments from `key => value` pairs, keeping their order.
///
/// ```
/// let kwargs = courier_contract::kwargs! { "zone" => "utc", "precise" => true };
/// assert_eq!(kwargs.keys().next().map(String::as_str), Some("zone"));
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut kwargs = $crate::Kwargs::new();
        $(kwargs.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        kwargs
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        zone: String,
        celsius: i32,
    }

    #[test]
    fn test_typed_values() {
        let reading = Reading {
            zone: "tank".to_string(),
            celsius: 24,
        };

        let value = to_value(&reading).unwrap();
        assert!(value.is_map());

        let back: Reading = from_value(&value).unwrap();
        assert_eq!(back, reading);

        assert!(from_value::<Reading>(&Value::from(3)).is_err());
    }

    #[test]
    fn test_macros() {
        assert!(args![].is_empty());
        assert_eq!(args![1, "two"], vec![Value::from(1), Value::from("two")]);

        let kwargs = kwargs! { "b" => 2, "a" => 1 };
        assert_eq!(
            kwargs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert!(kwargs! {}.is_empty());
    }
}
