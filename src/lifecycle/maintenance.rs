//! Background eviction of perimeter state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::http::cache::ResponseCache;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::security::rate_limit::RateLimiter;

/// Periodically drops idle rate-limit windows and expired cache entries.
#[derive(Debug)]
pub struct Maintenance {
    interval: Duration,
    limiters: Vec<Arc<RateLimiter>>,
    cache: Option<Arc<ResponseCache>>,
}

impl Maintenance {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiters: Vec::new(),
            cache: None,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiters.push(limiter);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// One eviction pass. Returns (clients dropped, cache entries dropped).
    pub fn run_once(&self) -> (usize, usize) {
        let clients = self.limiters.iter().map(|l| l.purge_idle()).sum();
        let entries = self.cache.as_ref().map_or(0, |c| c.purge_expired());
        (clients, entries)
    }

    /// Run until shutdown.
    pub async fn run(self, shutdown: ShutdownListener) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        let stopped = shutdown.wait();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    let (clients, entries) = self.run_once();
                    if clients > 0 || entries > 0 {
                        tracing::debug!(clients, entries, "Evicted idle perimeter state");
                    }
                }
            }
        }

        tracing::debug!("Maintenance task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, RatePolicy};
    use crate::lifecycle::shutdown::Shutdown;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_run_once_with_nothing_to_do() {
        let limiter = Arc::new(RateLimiter::new(
            "general",
            &RatePolicy {
                window_secs: 60,
                max_requests: 10,
                message: "slow".into(),
            },
        ));
        limiter.check(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let maintenance = Maintenance::new(Duration::from_secs(1))
            .with_limiter(limiter.clone())
            .with_cache(Arc::new(ResponseCache::new(&CacheConfig::default())));

        assert_eq!(maintenance.run_once(), (0, 0));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(Maintenance::new(Duration::from_millis(10)).run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
