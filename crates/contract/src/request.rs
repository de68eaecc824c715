use crate::codec::{self, ARGS, FUNC, KWARGS};
use crate::{Digest, Error, Headers, Kwargs, Result, Value};

/// A call of a remote function by name.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    digest: Digest,
    func: String,
    args: Vec<Value>,
    kwargs: Kwargs,
    headers: Headers,
}

impl Request {
    /// Creates a request with a freshly generated digest.
    pub fn new<F>(func: F, args: Vec<Value>, kwargs: Kwargs) -> Self
    where
        F: Into<String>,
    {
        let mut request = Self {
            digest: Digest::from_wire(String::new()),
            func: func.into(),
            args,
            kwargs,
            headers: Headers::new(),
        };
        request.digest = Digest::for_content(&request.wire_headers(), &request.wire_body());
        request
    }

    pub(crate) fn reconstruct(digest: Digest, mut headers: Headers, body: Value) -> Result<Self> {
        const CONTRACT: &str = "request";

        let func = codec::take_header(&mut headers, CONTRACT, FUNC)?;

        let Value::Map(mut body) = body else {
            return Err(Error::mistyped(CONTRACT, "body"));
        };

        let args = match codec::take_field(&mut body, ARGS) {
            Some(Value::Array(args)) => args,
            Some(_) => return Err(Error::mistyped(CONTRACT, ARGS)),
            None => return Err(Error::missing(CONTRACT, ARGS)),
        };

        let kwargs = match codec::take_field(&mut body, KWARGS) {
            Some(Value::Map(entries)) => entries
                .into_iter()
                .map(|(key, value)| match key {
                    Value::Text(key) => Ok((key, value)),
                    _ => Err(Error::mistyped(CONTRACT, KWARGS)),
                })
                .collect::<Result<Kwargs>>()?,
            None | Some(Value::Null) => Kwargs::new(),
            Some(_) => return Err(Error::mistyped(CONTRACT, KWARGS)),
        };

        Ok(Self {
            digest,
            func,
            args,
            kwargs,
            headers,
        })
    }

    /// Adds an extra metadata header.
    #[must_use]
    pub fn with_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The request's digest, which also names its response channel.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Name of the remote function.
    #[must_use]
    pub fn func(&self) -> &str {
        &self.func
    }

    /// Positional arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Mutable positional arguments.
    pub const fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    /// Keyword arguments, in the order they were given.
    #[must_use]
    pub const fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Mutable keyword arguments.
    pub const fn kwargs_mut(&mut self) -> &mut Kwargs {
        &mut self.kwargs
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

    /// Splits the request into function name, positional and keyword arguments.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Value>, Kwargs) {
        (self.func, self.args, self.kwargs)
    }

    pub(crate) fn wire_headers(&self) -> Headers {
        codec::wire_headers(FUNC, Value::Text(self.func.clone()), &self.headers)
    }

    pub(crate) fn wire_body(&self) -> Value {
        Value::Map(vec![
            (Value::Text(ARGS.to_string()), Value::Array(self.args.clone())),
            (
                Value::Text(KWARGS.to_string()),
                Value::Map(
                    self.kwargs
                        .iter()
                        .map(|(key, value)| (Value::Text(key.clone()), value.clone()))
                        .collect(),
                ),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, kwargs};

    #[test]
    fn test_new_request() {
        let request = Request::new("add", args![2, 3], kwargs! { "carry" => false })
            .with_header("trace", "abc");

        assert_eq!(request.func(), "add");
        assert_eq!(request.args(), &[Value::from(2), Value::from(3)]);
        assert_eq!(request.kwargs().get("carry"), Some(&Value::from(false)));
        assert_eq!(request.headers().get("trace"), Some(&Value::from("abc")));
        assert!(request.headers().get(FUNC).is_none());
    }

    #[test]
    fn test_digest_survives_mutation() {
        let mut request = Request::new("add", args![2, 3], kwargs! {});
        let digest = request.digest().clone();

        request.args_mut().push(Value::from(4));
        request.kwargs_mut().insert("x".to_string(), Value::from(1));

        assert_eq!(request.digest(), &digest);
    }

    #[test]
    fn test_reconstruct_rejects_bad_bodies() {
        let digest = Digest::from_wire("abc".to_string());
        let headers = codec::wire_headers(FUNC, Value::from("clock"), &Headers::new());

        let result = Request::reconstruct(digest.clone(), headers.clone(), Value::from(1));
        assert!(matches!(result, Err(Error::Malformed { field: "body", .. })));

        let result = Request::reconstruct(digest.clone(), headers.clone(), Value::Map(vec![]));
        assert!(matches!(result, Err(Error::Malformed { field: ARGS, .. })));

        let result = Request::reconstruct(digest, Headers::new(), Value::Map(vec![]));
        assert!(matches!(result, Err(Error::Malformed { field: FUNC, .. })));
    }
}
