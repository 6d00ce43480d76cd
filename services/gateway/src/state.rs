use crate::auth::NonceStore;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;
use chrono::{DateTime, Utc};
use platform::{Clock, Platform, SystemClock};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub platform: Platform,
    pub rate_limiter: Arc<RateLimiter>,
    pub nonces: Arc<NonceStore>,
    pub metrics: Metrics,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// In-memory platform on the system clock
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let platform = Platform::in_memory(config.platform_options(), clock)?;
        Self::with_platform(config, platform)
    }

    /// Wraps an already assembled platform (tests swap clocks or services)
    pub fn with_platform(config: Config, platform: Platform) -> anyhow::Result<Self> {
        let started_at = platform.clock.now();
        Ok(Self {
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_capacity,
                config.rate_limit_refill_per_sec,
            )),
            nonces: Arc::new(NonceStore::new()),
            metrics: Metrics::new()?,
            config: Arc::new(config),
            platform,
            started_at,
        })
    }
}
