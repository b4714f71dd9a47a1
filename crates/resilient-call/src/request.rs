use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Request method. GET and HEAD are reads and go through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// True for methods whose successful responses are cached.
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unsupported method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported method `{0}`")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// A call submitted to the client.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub method: Method,
    /// Absolute URL (`https://host/path`) or an opaque target identifier.
    pub target: String,
    pub payload: Option<Bytes>,
    /// Cancelling this token aborts the call at its next suspension point.
    pub cancel: CancellationToken,
    /// The call is cancelled when this instant passes.
    pub deadline: Option<Instant>,
}

impl CallRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            payload: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, target).with_payload(payload)
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Ties the call to the caller's cancellation.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now. A timeout too large to
    /// represent leaves the call without a deadline.
    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Cache key of the call: `METHOD:target`.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.method, self.target)
    }
}

/// One network attempt, as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub target: String,
    pub payload: Option<Bytes>,
    /// 1 for the first attempt of a call.
    pub attempt: usize,
}

/// What the transport received for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a [`CallResponse`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the response cache; nothing was sent.
    Cache,
    /// Fetched from the downstream after `attempts` attempts.
    Network { attempts: usize },
}

/// Successful outcome of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    /// Status of the final attempt. Cached responses report 200.
    pub status: u16,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl CallResponse {
    pub fn is_cached(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    /// Network attempts made, 0 for a cache hit.
    pub fn attempts(&self) -> usize {
        match self.source {
            ResponseSource::Cache => 0,
            ResponseSource::Network { attempts } => attempts,
        }
    }
}
