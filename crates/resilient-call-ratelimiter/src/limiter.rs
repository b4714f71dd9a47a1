use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
#[cfg(feature = "metrics")]
use metrics::gauge;
use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Instant;
use tokio::sync::{AcquireError, Semaphore, TryAcquireError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Bounded pool of permits. Tokens handed out are consumed; the pool is
/// refilled up to capacity by [`TokenPool::refill`] or returned one at a
/// time by [`TokenPool::give_back`].
#[derive(Debug)]
pub(crate) struct TokenPool {
    pub(crate) config: RateLimiterConfig,
    semaphore: Semaphore,
    // Serializes the read-then-add in refill and give_back so the pool
    // never exceeds capacity.
    topping_up: Mutex<()>,
    pub(crate) shutdown: CancellationToken,
}

impl TokenPool {
    pub(crate) fn new(config: RateLimiterConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.capacity),
            config,
            topping_up: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) async fn take(&self) -> Result<(), AcquireError> {
        self.semaphore.acquire().await.map(|permit| permit.forget())
    }

    pub(crate) fn try_take(&self) -> Result<(), TryAcquireError> {
        self.semaphore.try_acquire().map(|permit| permit.forget())
    }

    pub(crate) fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns one permit, unless the pool is already full.
    pub(crate) fn give_back(&self) -> bool {
        let _guard = self.topping_up.lock();
        if self.semaphore.is_closed() || self.semaphore.available_permits() >= self.config.capacity {
            return false;
        }
        self.semaphore.add_permits(1);
        true
    }

    /// Tops the pool back up to capacity and returns how many permits were added.
    pub(crate) fn refill(&self) -> usize {
        let added = {
            let _guard = self.topping_up.lock();
            if self.semaphore.is_closed() {
                return 0;
            }
            let missing = self
                .config
                .capacity
                .saturating_sub(self.semaphore.available_permits());
            self.semaphore.add_permits(missing);
            missing
        };

        if added > 0 {
            self.config.event_listeners.emit(&RateLimiterEvent::Replenished {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                added,
            });

            #[cfg(feature = "tracing")]
            tracing::trace!(ratelimiter = %self.config.name, added, "replenished permits");
        }

        #[cfg(feature = "metrics")]
        gauge!("ratelimiter_available_permits", "ratelimiter" => self.config.name.clone())
            .set(self.semaphore.available_permits() as f64);

        added
    }

    /// Stops the replenisher and fails current and future waiters.
    pub(crate) fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        self.semaphore.close();

        #[cfg(feature = "tracing")]
        tracing::debug!(ratelimiter = %self.config.name, "rate limiter shut down");
    }
}

impl Drop for TokenPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Refills the pool once per interval until the pool is shut down or dropped.
///
/// Holds only a weak reference so an abandoned limiter is not kept alive by
/// its own replenisher.
pub(crate) async fn replenish_loop(pool: Weak<TokenPool>, shutdown: CancellationToken) {
    let period = match pool.upgrade() {
        Some(pool) => pool.config.refill_interval,
        None => return,
    };
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match pool.upgrade() {
                    Some(pool) => {
                        pool.refill();
                    }
                    None => break,
                }
            }
        }
    }
}
