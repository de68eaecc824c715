use crate::codec::{self, REQUEST_DIGEST};
use crate::{Digest, Headers, Result, Value};

/// The return value of a remote call.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    digest: Digest,
    request_digest: Digest,
    body: Value,
    headers: Headers,
}

impl Response {
    /// Creates a response answering the request with the given digest.
    #[must_use]
    pub fn new(request_digest: Digest, body: Value) -> Self {
        let mut response = Self {
            digest: Digest::from_wire(String::new()),
            request_digest,
            body,
            headers: Headers::new(),
        };
        response.digest = Digest::for_content(&response.wire_headers(), &response.body);
        response
    }

    pub(crate) fn reconstruct(digest: Digest, mut headers: Headers, body: Value) -> Result<Self> {
        let request_digest = codec::take_header(&mut headers, "response", REQUEST_DIGEST)?;

        Ok(Self {
            digest,
            request_digest: Digest::from_wire(request_digest),
            body,
            headers,
        })
    }

    /// The response's own digest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Digest of the request this response answers.
    #[must_use]
    pub const fn request_digest(&self) -> &Digest {
        &self.request_digest
    }

    /// The returned value.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Mutable access to the returned value.
    pub const fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Replaces the returned value.
    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// Consumes the response, yielding the returned value.
    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
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
}
