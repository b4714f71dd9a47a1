use crate::store::Shared;
use std::sync::Weak;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Evicts expired entries once per interval until shut down or dropped.
pub(crate) async fn sweep_loop(shared: Weak<Shared>, shutdown: CancellationToken) {
    let period = match shared.upgrade() {
        Some(shared) => shared.config.sweep_interval,
        None => return,
    };
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match shared.upgrade() {
                    Some(shared) => {
                        shared.sweep();
                    }
                    None => break,
                }
            }
        }
    }
}
