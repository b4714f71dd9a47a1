use resilient_call_core::CallError;
use thiserror::Error;

/// Errors returned when acquiring a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimiterError {
    /// The caller's cancellation token fired while waiting.
    #[error("cancelled while waiting for a rate limit permit")]
    Cancelled,

    /// The limiter has been shut down.
    #[error("rate limiter is shut down")]
    Closed,
}

/// A shut-down limiter means the owning client is going away, which the
/// caller observes as cancellation.
impl<E> From<RateLimiterError> for CallError<E> {
    fn from(_: RateLimiterError) -> Self {
        CallError::Cancelled
    }
}
