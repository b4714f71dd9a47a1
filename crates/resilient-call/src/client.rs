use crate::breakers::BreakerRegistry;
use crate::config::ClientConfig;
use crate::layer::ResilientClientLayer;
use crate::request::{CallRequest, CallResponse, ResponseSource, TransportRequest, TransportResponse};
use crate::validation::{target_authority, validate};
use futures::future::BoxFuture;
use resilient_call_cache::{CacheConfig, CacheStats, ResponseCache};
use resilient_call_circuitbreaker::{CircuitBreaker, CircuitState, Outcome};
use resilient_call_core::{AttemptFailure, CallError, ConfigError};
use resilient_call_metrics::{InMemoryMetrics, MetricsCollector, NoopMetrics};
use resilient_call_ratelimiter::{RateLimiter, RateLimiterConfig};
use resilient_call_retry::{Attempt, Retry, RetryConfig, RetryError};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

/// Decides whether a transport error is worth another attempt.
pub type TransportErrorClassifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// The parts shared by every client built from one configuration.
pub(crate) struct Pipeline {
    pub(crate) config: ClientConfig,
    pub(crate) retry: Retry,
    pub(crate) limiter: RateLimiter,
    pub(crate) cache: Option<ResponseCache>,
    pub(crate) metrics: Arc<dyn MetricsCollector>,
    pub(crate) breakers: BreakerRegistry,
}

impl Pipeline {
    pub(crate) fn build(
        config: ClientConfig,
        cache: Option<ResponseCache>,
        metrics: Option<Arc<dyn MetricsCollector>>,
    ) -> Result<Self, ConfigError> {
        if config.request_timeout.is_zero() {
            return Err(ConfigError::new("request_timeout", "must be non-zero"));
        }

        let metrics: Arc<dyn MetricsCollector> = match metrics {
            Some(metrics) => metrics,
            None if config.metrics_enabled => Arc::new(InMemoryMetrics::new()),
            None => Arc::new(NoopMetrics),
        };

        let retry = RetryConfig::builder()
            .name(config.name.clone())
            .max_attempts(config.retry.max_attempts)
            .initial_delay(config.retry.initial_delay)
            .max_delay(config.retry.max_delay)
            .multiplier(config.retry.multiplier)
            .jitter(config.retry.jitter)
            .retryable_statuses(config.retry.retryable_statuses.iter().copied())
            .build()?;

        let breakers = BreakerRegistry::new(&config.circuit_breaker, Arc::clone(&metrics))?;

        let cache = match cache {
            Some(cache) => Some(cache),
            None if config.cache.enabled => Some(
                CacheConfig::builder()
                    .name(config.name.clone())
                    .default_ttl(config.cache.ttl)
                    .sweep_interval(config.cache.sweep_interval)
                    .build()?,
            ),
            None => None,
        };

        // Built last: it starts the replenisher.
        let limiter = RateLimiterConfig::builder()
            .name(config.name.clone())
            .capacity(config.rate_limit.permits)
            .refill_interval(config.rate_limit.refill_interval)
            .build()?;

        Ok(Self {
            config,
            retry,
            limiter,
            cache,
            metrics,
            breakers,
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.name)
            .field("breakers", &self.breakers.len())
            .field("cache", &self.cache.is_some())
            .field("limiter", &self.limiter)
            .finish()
    }
}

/// Builds a [`ResilientClient`] or a [`ResilientClientLayer`].
pub struct ResilientClientBuilder {
    config: ClientConfig,
    cache: Option<ResponseCache>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            cache: None,
            metrics: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `cache` instead of building one from the cache settings.
    ///
    /// Pass clones of the same cache to several builders to share entries
    /// between clients. An injected cache is used even if the cache settings
    /// say disabled.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reports to `metrics` instead of a private in-memory collector.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the configuration and builds a layer that wraps transports.
    pub fn build_layer(self) -> Result<ResilientClientLayer, ConfigError> {
        let pipeline = Pipeline::build(self.config, self.cache, self.metrics)?;
        Ok(ResilientClientLayer::from_pipeline(Arc::new(pipeline)))
    }

    /// Validates the configuration and wraps `transport`.
    pub fn build<S>(self, transport: S) -> Result<ResilientClient<S, S::Error>, ConfigError>
    where
        S: Service<TransportRequest>,
    {
        let pipeline = Pipeline::build(self.config, self.cache, self.metrics)?;
        Ok(ResilientClient::from_parts(transport, Arc::new(pipeline)))
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs calls through cache, rate limiter, per-target circuit breaker and
/// retry around a transport.
///
/// `S` performs one network attempt per call; `E` is its error type.
/// Clones share every piece of state.
pub struct ResilientClient<S, E> {
    transport: S,
    pipeline: Arc<Pipeline>,
    classifier: Option<TransportErrorClassifier<E>>,
}

impl ResilientClient<(), ()> {
    /// Starts a builder with the default configuration.
    pub fn builder() -> ResilientClientBuilder {
        ResilientClientBuilder::new()
    }
}

impl<S, E> ResilientClient<S, E> {
    pub(crate) fn from_parts(transport: S, pipeline: Arc<Pipeline>) -> Self {
        Self {
            transport,
            pipeline,
            classifier: None,
        }
    }

    /// Only transport errors for which `classifier` returns true are retried.
    /// By default every transport error is retried.
    pub fn with_transport_error_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.pipeline.config
    }

    /// State of the breaker guarding `target`, if it has been called.
    pub fn circuit_state(&self, target: &str) -> Option<CircuitState> {
        self.circuit_breaker(target).map(|breaker| breaker.state_sync())
    }

    /// The breaker guarding `target`, if it has been called.
    pub fn circuit_breaker(&self, target: &str) -> Option<CircuitBreaker> {
        self.pipeline.breakers.get(&target_authority(target))
    }

    /// Statistics of the response cache; all zero when caching is off.
    pub fn cache_stats(&self) -> CacheStats {
        self.pipeline
            .cache
            .as_ref()
            .map(ResponseCache::stats)
            .unwrap_or_default()
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.pipeline.cache.as_ref()
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.pipeline.metrics
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.pipeline.limiter
    }

    /// Stops the cache sweeper and the limiter replenisher. Safe to call
    /// more than once.
    ///
    /// Cache hits are still served afterwards; calls that need a permit fail
    /// with [`CallError::Cancelled`].
    pub fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        {
            if !self.is_shutdown() {
                tracing::info!(client = %self.pipeline.config.name, "shutting down");
            }
        }

        self.pipeline.limiter.shutdown();
        if let Some(cache) = &self.pipeline.cache {
            cache.shutdown();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.pipeline.limiter.is_shutdown()
    }

    fn is_retryable_error(&self, error: &E) -> bool {
        self.classifier
            .as_ref()
            .is_none_or(|classify| classify(error))
    }
}

/// Why an attempt did not produce a response.
enum Interrupted<E> {
    Failed(AttemptFailure<E>),
    Cancelled,
}

fn into_call_error<E>(err: RetryError<Interrupted<E>>) -> CallError<E> {
    match err {
        RetryError::Exhausted {
            attempts,
            last: Interrupted::Failed(last),
        } => RetryError::Exhausted { attempts, last }.into(),
        RetryError::Fatal(Interrupted::Failed(failure)) => RetryError::Fatal(failure).into(),
        RetryError::Exhausted {
            last: Interrupted::Cancelled,
            ..
        }
        | RetryError::Fatal(Interrupted::Cancelled)
        | RetryError::Cancelled => CallError::Cancelled,
    }
}

/// How a finished call counts towards the target's breaker.
///
/// A downstream that answers with a non-retryable status is healthy, whatever
/// the status, and a call the caller gave up on says nothing either way.
fn breaker_outcome<T, E>(result: &Result<T, CallError<E>>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(CallError::Cancelled) => Outcome::Ignored,
        Err(CallError::Transport(AttemptFailure::Status { .. })) => Outcome::Success,
        Err(_) => Outcome::Failure,
    }
}

impl<S, E> ResilientClient<S, E>
where
    S: Service<TransportRequest, Response = TransportResponse, Error = E> + Clone,
{
    /// Sends `request` through the pipeline.
    ///
    /// Reads (GET, HEAD) are answered from the cache when possible and
    /// cached on success. Every other method skips the cache.
    pub async fn send(&self, request: CallRequest) -> Result<CallResponse, CallError<E>> {
        let cancel = request.cancel.child_token();

        let Some(deadline) = request.deadline else {
            return self.dispatch(request, cancel).await;
        };

        let call = self.dispatch(request, cancel.clone());
        tokio::pin!(call);
        tokio::select! {
            biased;
            result = &mut call => return result,
            _ = tokio::time::sleep_until(deadline) => cancel.cancel(),
        }
        call.await
    }

    pub async fn get(&self, target: impl Into<String>) -> Result<CallResponse, CallError<E>> {
        self.send(CallRequest::get(target)).await
    }

    pub async fn post(
        &self,
        target: impl Into<String>,
        payload: impl Into<bytes::Bytes>,
    ) -> Result<CallResponse, CallError<E>> {
        self.send(CallRequest::post(target, payload)).await
    }

    async fn dispatch(
        &self,
        request: CallRequest,
        cancel: CancellationToken,
    ) -> Result<CallResponse, CallError<E>> {
        let pipeline = &self.pipeline;

        if let Err(reason) = validate(&request) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                client = %pipeline.config.name,
                method = %request.method,
                target = %request.target,
                %reason,
                "request rejected by validation"
            );
            return Err(CallError::validation(reason));
        }

        let started = Instant::now();
        let cache = pipeline.cache.as_ref().filter(|_| request.method.is_read());
        let key = request.fingerprint();

        if let Some(cache) = cache {
            if let Some(body) = cache.get(&key) {
                pipeline.metrics.record_cache_hit(cache.config().name());

                #[cfg(feature = "tracing")]
                tracing::debug!(client = %pipeline.config.name, %key, "served from cache");

                return Ok(CallResponse {
                    status: 200,
                    body,
                    source: ResponseSource::Cache,
                });
            }
            pipeline.metrics.record_cache_miss(cache.config().name());
        }

        let _permit = pipeline.limiter.acquire(&cancel).await?;

        let authority = target_authority(&request.target);
        let breaker = pipeline.breakers.get_or_create(&authority);
        let result = breaker
            .execute_classified(
                || self.attempts(&request, &authority, &cancel),
                breaker_outcome,
            )
            .await
            .map_err(CallError::from);

        let elapsed = started.elapsed();

        match result {
            Ok((response, attempts)) => {
                if let Some(cache) = cache {
                    if !pipeline.config.cache.ttl.is_zero() {
                        cache.set(&key, response.body.clone(), pipeline.config.cache.ttl);
                    }
                }

                pipeline.metrics.record_http_request(
                    request.method.as_str(),
                    &authority,
                    response.status,
                    elapsed,
                );

                #[cfg(feature = "tracing")]
                tracing::info!(
                    client = %pipeline.config.name,
                    method = %request.method,
                    target = %request.target,
                    status = response.status,
                    attempts,
                    duration_ms = elapsed.as_millis() as u64,
                    "request completed"
                );

                Ok(CallResponse {
                    status: response.status,
                    body: response.body,
                    source: ResponseSource::Network { attempts },
                })
            }
            Err(err) => {
                if !err.is_rejected() {
                    pipeline.metrics.record_http_request(
                        request.method.as_str(),
                        &authority,
                        err.status().unwrap_or(0),
                        elapsed,
                    );
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    client = %pipeline.config.name,
                    method = %request.method,
                    target = %request.target,
                    error = err.kind().as_str(),
                    status = err.status(),
                    duration_ms = elapsed.as_millis() as u64,
                    "request failed"
                );

                Err(err)
            }
        }
    }

    /// The retry loop around the transport, as run inside the breaker.
    async fn attempts(
        &self,
        request: &CallRequest,
        authority: &str,
        cancel: &CancellationToken,
    ) -> Result<(TransportResponse, usize), CallError<E>> {
        let pipeline = &self.pipeline;
        let timeout = pipeline.config.request_timeout;
        let operation = format!("{} {}", request.method, authority);

        pipeline
            .retry
            .run(cancel, |attempt| {
                let transport = self.transport.clone();
                let attempt_request = TransportRequest {
                    method: request.method,
                    target: request.target.clone(),
                    payload: request.payload.clone(),
                    attempt,
                };
                let operation = operation.as_str();

                async move {
                    if attempt > 1 {
                        pipeline.metrics.record_retry_attempt(operation, attempt);
                    }

                    let call = tokio::time::timeout(timeout, transport.oneshot(attempt_request));
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Attempt::Fatal(Interrupted::Cancelled),
                        outcome = call => outcome,
                    };

                    match outcome {
                        Err(_elapsed) => Attempt::Retryable(Interrupted::Failed(
                            AttemptFailure::Timeout { after: timeout },
                        )),
                        Ok(Err(error)) => {
                            let retryable = self.is_retryable_error(&error);
                            let failure = Interrupted::Failed(AttemptFailure::Transport(error));
                            if retryable {
                                Attempt::Retryable(failure)
                            } else {
                                Attempt::Fatal(failure)
                            }
                        }
                        Ok(Ok(response)) if response.is_success() => {
                            Attempt::Success((response, attempt))
                        }
                        Ok(Ok(response)) => {
                            let retryable = pipeline.retry.is_retryable_status(response.status);
                            let failure = Interrupted::Failed(AttemptFailure::Status {
                                status: response.status,
                                body: response.body,
                            });
                            if retryable {
                                Attempt::Retryable(failure)
                            } else {
                                Attempt::Fatal(failure)
                            }
                        }
                    }
                }
            })
            .await
            .map_err(into_call_error)
    }
}

impl<S: Clone, E> Clone for ResilientClient<S, E> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            pipeline: Arc::clone(&self.pipeline),
            classifier: self.classifier.clone(),
        }
    }
}

impl<S, E> fmt::Debug for ResilientClient<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("pipeline", &self.pipeline)
            .field("classifier", &self.classifier.is_some())
            .finish_non_exhaustive()
    }
}

impl<S, E> Service<CallRequest> for ResilientClient<S, E>
where
    S: Service<TransportRequest, Response = TransportResponse, Error = E>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
    E: Send + 'static,
{
    type Response = CallResponse;
    type Error = CallError<E>;
    type Future = BoxFuture<'static, Result<CallResponse, CallError<E>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Back-pressure is applied inside the call by the rate limiter.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CallRequest) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.send(request).await })
    }
}
