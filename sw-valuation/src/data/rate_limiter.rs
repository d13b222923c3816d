//! Paced, retrying wrapper around upstream calls.
//!
//! Keeps a minimum gap between successful calls and retries failures with a
//! fixed delay. Quota errors get a much longer cooldown. A call that runs out
//! of attempts yields `None` instead of an error, so one bad index never
//! stops a batch.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use sw_common::config::FetchConfig;
use sw_common::util::{sanitize_for_log, truncate_with_ellipsis};

use super::ProviderError;

/// Pacing and retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Minimum gap between two successful calls
    pub min_interval: Duration,
    /// Cooldown after a rate-limit error
    pub rate_limit_wait: Duration,
    /// Delay after any other error
    pub retry_delay: Duration,
    /// Attempts per call, whatever the error kind
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            min_interval: config.request_interval(),
            rate_limit_wait: config.rate_limit_wait(),
            retry_delay: config.retry_delay(),
            max_retries: config.max_retries,
        }
    }
}

/// Rate-limited client.
///
/// Owned by a single task and mutated through `&mut self`; it is not meant
/// to be shared.
#[derive(Debug)]
pub struct RateLimitedClient {
    policy: RetryPolicy,
    /// Completion time of the last successful call
    last_success: Option<Instant>,
    /// Successful calls
    total_requests: u64,
    /// Failed attempts, rate-limited ones included
    failed_attempts: u64,
    /// Name for logging
    name: String,
}

impl RateLimitedClient {
    /// Create a new client.
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            policy,
            last_success: None,
            total_requests: 0,
            failed_attempts: 0,
            name: name.into(),
        }
    }

    /// Create a client from fetch configuration.
    pub fn from_config(name: impl Into<String>, config: &FetchConfig) -> Self {
        Self::new(name, RetryPolicy::from(config))
    }

    /// Run `op` with pacing and retries.
    ///
    /// Every attempt consumes one of `max_retries`. A rate-limit error waits
    /// `rate_limit_wait` before the next attempt, any other error waits
    /// `retry_delay`. No wait follows the final attempt.
    ///
    /// Returns `None` once all attempts have failed.
    pub async fn call<T, F, Fut>(&mut self, api_name: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max = self.policy.max_retries;

        for attempt in 1..=max {
            self.wait_for_slot().await;

            match op().await {
                Ok(value) => {
                    self.last_success = Some(Instant::now());
                    self.total_requests += 1;
                    return Some(value);
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    let message = truncate_with_ellipsis(&sanitize_for_log(&e.to_string()), 200);
                    let last = attempt == max;

                    if e.is_rate_limited() {
                        warn!(
                            limiter = %self.name,
                            api = api_name,
                            attempt,
                            max_retries = max,
                            wait_secs = self.policy.rate_limit_wait.as_secs(),
                            "Rate limit hit: {}",
                            message
                        );
                        if !last {
                            tokio::time::sleep(self.policy.rate_limit_wait).await;
                        }
                        continue;
                    }

                    warn!(
                        limiter = %self.name,
                        api = api_name,
                        attempt,
                        max_retries = max,
                        "API call failed ({}/{}): {}",
                        attempt,
                        max,
                        message
                    );
                    if !last {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            limiter = %self.name,
            api = api_name,
            max_retries = max,
            "Giving up after {} attempts",
            max
        );
        None
    }

    /// Sleep until `min_interval` has passed since the last successful call.
    async fn wait_for_slot(&self) {
        if let Some(last) = self.last_success {
            let elapsed = last.elapsed();
            if elapsed < self.policy.min_interval {
                let wait = self.policy.min_interval - elapsed;
                debug!(
                    limiter = %self.name,
                    wait_ms = wait.as_millis() as u64,
                    "Pacing request"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Successful calls so far.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Failed attempts so far.
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            min_interval: Duration::from_millis(300),
            rate_limit_wait: Duration::from_secs(65),
            retry_delay: Duration::from_secs(2),
            max_retries: 5,
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.min_interval, Duration::from_millis(300));
        assert_eq!(policy.rate_limit_wait, Duration::from_secs(65));
        assert_eq!(policy.retry_delay, Duration::from_secs(2));
        assert_eq!(policy.max_retries, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_are_spaced() {
        let mut client = RateLimitedClient::new("test", fast_policy());
        let stamps = RefCell::new(Vec::new());
        let stamps_ref = &stamps;

        for _ in 0..2 {
            let out = client
                .call("op", || async move {
                    stamps_ref.borrow_mut().push(Instant::now());
                    Ok::<_, ProviderError>(1)
                })
                .await;
            assert_eq!(out, Some(1));
        }

        let stamps = stamps.into_inner();
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(300));
        assert_eq!(client.total_requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_interval_already_elapsed() {
        let mut client = RateLimitedClient::new("test", fast_policy());
        client.call("op", || async { Ok::<_, ProviderError>(()) }).await;

        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        client.call("op", || async { Ok::<_, ProviderError>(()) }).await;
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_none() {
        let mut client = RateLimitedClient::new("test", fast_policy());
        let calls = Cell::new(0);

        let start = Instant::now();
        let out: Option<()> = client
            .call("op", || {
                calls.set(calls.get() + 1);
                async { Err(ProviderError::Network("boom".into())) }
            })
            .await;

        assert_eq!(out, None);
        assert_eq!(calls.get(), 5);
        assert_eq!(client.failed_attempts(), 5);
        assert_eq!(client.total_requests(), 0);
        // 4 retry delays, none after the last attempt
        assert_eq!(Instant::now() - start, Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_uses_cooldown_and_consumes_attempt() {
        let mut client = RateLimitedClient::new("test", fast_policy());
        let calls = Cell::new(0);

        let start = Instant::now();
        let out = client
            .call("op", || {
                let n = calls.get() + 1;
                calls.set(n);
                async move {
                    if n == 1 {
                        Err(ProviderError::Api {
                            code: 40203,
                            message: "抱歉，您每分钟最多访问该接口200次".into(),
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(out, Some(2));
        assert_eq!(client.failed_attempts(), 1);
        assert_eq!(Instant::now() - start, Duration::from_secs(65));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_errors_exhaust_budget() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..fast_policy()
        };
        let mut client = RateLimitedClient::new("test", policy);
        let calls = Cell::new(0);

        let out: Option<()> = client
            .call("op", || {
                calls.set(calls.get() + 1);
                async {
                    Err(ProviderError::RateLimited {
                        message: "访问过于频繁".into(),
                    })
                }
            })
            .await;

        assert_eq!(out, None);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_does_not_reset_pacing_clock() {
        let mut client = RateLimitedClient::new("test", fast_policy());
        client.call("op", || async { Ok::<_, ProviderError>(()) }).await;

        let stamps = RefCell::new(Vec::new());
        let calls = Cell::new(0);
        client
            .call("op", || {
                let n = calls.get() + 1;
                calls.set(n);
                stamps.borrow_mut().push(Instant::now());
                async move {
                    if n == 1 {
                        Err(ProviderError::Network("reset".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        let stamps = stamps.into_inner();
        // Second attempt follows the 2s retry delay; pacing adds nothing more
        assert_eq!(stamps[1] - stamps[0], Duration::from_secs(2));
    }
}
