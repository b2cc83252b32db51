//! # Request Types
//!
//! A `Request` is one encoded wire payload tagged with the domain operation
//! that produced it. The session writes the payload and keeps only the
//! `RequestOrigin` around so inbound replies can be attributed to it.

use bytes::Bytes;

/// Domain-level tag describing why a request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Read the current menu value.
    FetchMenu,
    /// Pop the next pending message for an entity.
    RetrieveMessage,
    /// Replace the stored menu value.
    UpdateMenu,
    /// Join a channel.
    Subscribe,
    /// Leave a channel.
    Unsubscribe,
    /// Append a message to an entity's queue.
    StoreMessage,
    /// Broadcast a payload on a channel.
    Publish,
    /// Any other command.
    Generic,
}

/// Encoded request ready for `Session::send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Domain operation that produced this request.
    pub kind: RequestKind,
    /// Exact bytes to write on the wire.
    pub payload: Bytes,
    /// Caller bookkeeping (e.g. a user id); never interpreted by the session.
    pub correlation: Option<String>,
}

impl Request {
    /// Creates a request without correlation data.
    pub fn new(kind: RequestKind, payload: Bytes) -> Self {
        Request {
            kind,
            payload,
            correlation: None,
        }
    }

    /// Attaches a correlation id.
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Returns the metadata that outlives the payload once it is written.
    pub fn origin(&self) -> RequestOrigin {
        RequestOrigin {
            kind: self.kind,
            correlation: self.correlation.clone(),
        }
    }
}

/// What is left of a request after its payload hit the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub kind: RequestKind,
    pub correlation: Option<String>,
}
