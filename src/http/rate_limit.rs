//! Rate limiting implementation
//!
//! Sliding-window admission control plus the reactive backoff used when the
//! server answers 429 anyway.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Longest delay we are willing to compute from float seconds
const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Convert float seconds into a `Duration`, clamping nonsense to sane bounds
pub(crate) fn duration_from_secs(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).map_or(MAX_DELAY, |d| d.min(MAX_DELAY))
}

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests admitted per window
    pub max_requests: u32,
    /// Length of the trailing window
    pub window: Duration,
    /// Cap on the exponent used for 429 backoff without a Retry-After hint
    pub max_retries: u32,
    /// Base of the exponential 429 backoff, in seconds
    pub backoff_factor: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(20),
            max_retries: 3,
            backoff_factor: 2.0,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Default::default()
        }
    }

    /// Config that never delays admission but still backs off on 429
    pub fn unlimited() -> Self {
        Self {
            max_requests: u32::MAX,
            window: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Set the reactive backoff parameters
    #[must_use]
    pub fn with_backoff(mut self, max_retries: u32, backoff_factor: f64) -> Self {
        self.max_retries = max_retries;
        self.backoff_factor = backoff_factor;
        self
    }
}

/// Sliding-window rate limiter
///
/// Cloning shares the window, so several clients can draw from one budget.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    window: Arc<Mutex<BTreeMap<Instant, u32>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            config: config.clone(),
            window: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Create a rate limiter with default settings
    pub fn default_limiter() -> Self {
        Self::new(&RateLimiterConfig::default())
    }

    /// Get the limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Wait until one more request fits in the trailing window, then record it
    ///
    /// The lock is held across the wait so callers are admitted one at a time.
    /// Dropping the future before it completes records nothing.
    pub async fn acquire(&self) {
        let max_requests = self.config.max_requests.max(1);
        let mut window = self.window.lock().await;

        let mut now = Instant::now();
        self.prune(&mut window, now);

        while total(&window) >= max_requests {
            let Some(oldest) = window.keys().next().copied() else {
                break;
            };
            let wait = self
                .config
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            if !wait.is_zero() {
                debug!(
                    "Rate limit window full ({}/{}), waiting {:?}",
                    total(&window),
                    max_requests,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            now = Instant::now();
            self.prune(&mut window, now);
        }

        *window.entry(now).or_insert(0) += 1;
    }

    /// React to a server-issued throttle
    ///
    /// Sleeps for `retry_after` when the server supplied it, otherwise for
    /// `backoff_factor ^ attempt` seconds with the exponent capped at
    /// `max_retries`. Returns the time slept.
    pub async fn handle_rate_limit_error(
        &self,
        retry_after: Option<Duration>,
        attempt: u32,
    ) -> Duration {
        let delay = retry_after.unwrap_or_else(|| self.backoff_delay(attempt));
        debug!("Backing off for {:?} after 429 (attempt {})", delay, attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }

    /// Backoff used for a 429 without a Retry-After hint
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(self.config.max_retries) as i32;
        duration_from_secs(self.config.backoff_factor.powi(exponent))
    }

    /// Number of requests admitted within the trailing window
    pub async fn current_usage(&self) -> u32 {
        let mut window = self.window.lock().await;
        self.prune(&mut window, Instant::now());
        total(&window)
    }

    /// Forget all recorded requests
    pub async fn reset(&self) {
        self.window.lock().await.clear();
    }

    fn prune(&self, window: &mut BTreeMap<Instant, u32>, now: Instant) {
        let span = self.config.window;
        window.retain(|at, _| now.saturating_duration_since(*at) < span);
    }
}

fn total(window: &BTreeMap<Instant, u32>) -> u32 {
    window.values().fold(0u32, |acc, n| acc.saturating_add(*n))
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::default_limiter()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_secs(20));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_rate_limiter_config_new() {
        let config = RateLimiterConfig::new(50, Duration::from_secs(60)).with_backoff(5, 1.5);
        assert_eq!(config.max_requests, 50);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert!((config.backoff_factor - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duration_from_secs_clamps() {
        assert_eq!(duration_from_secs(-1.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(0.5), Duration::from_millis(500));
        assert_eq!(duration_from_secs(1e12), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_budget_does_not_wait() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(5, Duration::from_secs(10)));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.current_usage().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_acquire_waits_for_window() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(2, Duration::from_secs(60)));
        let start = Instant::now();

        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.acquire().await;
        limiter.acquire().await;

        // Third acquire waits until the first one leaves the window
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(60_010), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_budget() {
        let window = Duration::from_secs(1);
        let limiter = RateLimiter::new(&RateLimiterConfig::new(3, window));
        let mut admitted = Vec::new();

        for _ in 0..10 {
            limiter.acquire().await;
            admitted.push(Instant::now());
        }

        for (i, start) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .filter(|t| t.saturating_duration_since(*start) < window)
                .count();
            assert!(in_window <= 3, "{in_window} admissions within window at {i}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_window_elapsed() {
        let window = Duration::from_secs(30);
        let limiter = RateLimiter::new(&RateLimiterConfig::new(2, window));

        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(window).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.current_usage().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_records_nothing() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(2, Duration::from_secs(60)));
        limiter.acquire().await;
        limiter.acquire().await;

        {
            let mut blocked = task::spawn(limiter.acquire());
            assert_pending!(blocked.poll());
        }

        assert_eq!(limiter.current_usage().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_window() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(3, Duration::from_secs(5)));
        let other = limiter.clone();

        limiter.acquire().await;
        other.acquire().await;

        assert_eq!(limiter.current_usage().await, 2);
        other.reset().await;
        assert_eq!(limiter.current_usage().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_rate_limit_error_uses_retry_after() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        let slept = limiter
            .handle_rate_limit_error(Some(Duration::from_secs(7)), 0)
            .await;

        assert_eq!(slept, Duration::from_secs(7));
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_rate_limit_error_backs_off_exponentially() {
        let limiter = RateLimiter::new(&RateLimiterConfig::default().with_backoff(3, 2.0));

        assert_eq!(
            limiter.handle_rate_limit_error(None, 0).await,
            Duration::from_secs(1)
        );
        assert_eq!(
            limiter.handle_rate_limit_error(None, 2).await,
            Duration::from_secs(4)
        );
        // Exponent is capped at max_retries
        assert_eq!(limiter.backoff_delay(10), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::new(&RateLimiterConfig::unlimited());
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
