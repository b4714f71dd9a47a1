use thiserror::Error;

/// Errors from the typed cache helpers.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be encoded to or decoded from JSON.
    #[error("cache value is not valid JSON for the requested type: {0}")]
    Serialization(#[from] serde_json::Error),
}
