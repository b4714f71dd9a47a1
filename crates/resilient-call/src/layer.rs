use crate::client::{Pipeline, ResilientClient};
use crate::config::ClientConfig;
use crate::request::TransportRequest;
use resilient_call_core::ConfigError;
use std::fmt;
use std::sync::Arc;
use tower::{Layer, Service};

/// A Tower layer that turns a transport into a [`ResilientClient`].
///
/// Every service produced by one layer shares the same rate limiter, cache,
/// metrics collector and circuit breakers.
///
/// ```rust
/// use resilient_call::{ClientConfig, ResilientClientLayer, TransportRequest, TransportResponse};
/// use tower::{service_fn, ServiceBuilder};
///
/// # async fn example() {
/// let layer = ResilientClientLayer::new(ClientConfig::default()).unwrap();
///
/// let client = ServiceBuilder::new().layer(layer).service(service_fn(
///     |_req: TransportRequest| async { Ok::<_, std::io::Error>(TransportResponse::new(200, "ok")) },
/// ));
///
/// let response = client.get("https://api.example.com/health").await.unwrap();
/// assert_eq!(response.status, 200);
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientClientLayer {
    pipeline: Arc<Pipeline>,
}

impl ResilientClientLayer {
    /// Builds a layer from `config` with a private cache and metrics collector.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        ResilientClient::builder().config(config).build_layer()
    }

    pub(crate) fn from_pipeline(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

impl<S> Layer<S> for ResilientClientLayer
where
    S: Service<TransportRequest>,
{
    type Service = ResilientClient<S, S::Error>;

    fn layer(&self, transport: S) -> Self::Service {
        ResilientClient::from_parts(transport, Arc::clone(&self.pipeline))
    }
}

impl fmt::Debug for ResilientClientLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClientLayer")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
