use bytes::Bytes;

/// What a delivery on a connection represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    /// Confirmation that a subscription was registered.
    Subscribe,

    /// Confirmation that a subscription was removed.
    Unsubscribe,

    /// A payload published on a subscribed channel.
    Message,
}

/// A delivery received by a connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// The kind of delivery.
    pub kind: MessageKind,

    /// The channel the delivery belongs to.
    pub channel: String,

    /// The payload (empty for confirmations).
    pub payload: Bytes,
}

impl Message {
    /// Creates a payload delivery.
    pub fn new<K>(channel: K, payload: Bytes) -> Self
    where
        K: Into<String>,
    {
        Self {
            kind: MessageKind::Message,
            channel: channel.into(),
            payload,
        }
    }

    /// Creates a subscription confirmation.
    pub fn subscribed<K>(channel: K) -> Self
    where
        K: Into<String>,
    {
        Self {
            kind: MessageKind::Subscribe,
            channel: channel.into(),
            payload: Bytes::new(),
        }
    }

    /// Creates an unsubscription confirmation.
    pub fn unsubscribed<K>(channel: K) -> Self
    where
        K: Into<String>,
    {
        Self {
            kind: MessageKind::Unsubscribe,
            channel: channel.into(),
            payload: Bytes::new(),
        }
    }

    /// Whether this delivery carries published traffic.
    #[must_use]
    pub fn is_payload(&self) -> bool {
        self.kind == MessageKind::Message
    }
}
