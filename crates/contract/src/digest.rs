use std::fmt;

use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::{Headers, Value};

/// Bytes of the content hash kept in a digest.
const CONTENT_HASH_LEN: usize = 8;

/// Correlation id of a contract.
///
/// A digest is a random UUID followed by a truncated SHA-256 hash of the contract's serialized
/// headers and body, rendered as lowercase hex. It is unique enough to multiplex many calls on
/// one bus and doubles as the name of the call's response channel. It is not a MAC: anyone on
/// the bus can read or forge one, so it carries no integrity or authenticity guarantee.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Digest(String);

impl Digest {
    pub(crate) fn generate(content: &[u8]) -> Self {
        let random = Uuid::new_v4();

        let mut hasher = Sha256::new();
        hasher.update(random.as_bytes());
        hasher.update(content);
        let hash = hasher.finalize();

        Self(format!(
            "{}{}",
            random.simple(),
            hex::encode(&hash[..CONTENT_HASH_LEN])
        ))
    }

    /// Generates a digest for a contract with the given wire headers and body.
    pub(crate) fn for_content(headers: &Headers, body: &Value) -> Self {
        let mut content = Vec::new();
        match ciborium::into_writer(&(headers, body), &mut content) {
            Ok(()) => Self::generate(&content),
            // The random part alone keeps the digest unique.
            Err(_) => Self::generate(&[]),
        }
    }

    pub(crate) const fn from_wire(digest: String) -> Self {
        Self(digest)
    }

    /// The digest as a string, suitable as a channel name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
