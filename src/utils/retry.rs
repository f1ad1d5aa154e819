//! Retry mechanism for handling transient failures in async operations.
//!
//! One exponential-backoff routine shared by every adapter and notifier:
//! delay before retry `n` is `min(base_delay * 2^n, max_delay)`. Callers
//! parameterize the budget instead of duplicating the loop.

use log::{error, warn};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Clone, Debug)]
pub struct RetryConfig {
	/// Maximum number of attempts (first try included) before giving up
	pub max_attempts: u32,

	/// Delay before the first retry; doubled on each subsequent retry
	pub base_delay: Duration,

	/// Ceiling the exponential backoff never exceeds
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	/// 3 attempts, 1 second base delay, 30 seconds ceiling
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(30),
		}
	}
}

impl RetryConfig {
	pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
		Self {
			max_attempts,
			base_delay,
			max_delay,
		}
	}

	/// Backoff before retry number `attempt` (0-based)
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let base = self.base_delay.as_millis() as u64;
		let shifted = base.saturating_mul(1u64 << attempt.min(20));
		Duration::from_millis(shifted.min(self.max_delay.as_millis() as u64))
	}
}

/// Handler for retrying operations with exponential backoff
pub struct WithRetry {
	config: RetryConfig,
}

impl WithRetry {
	/// Creates a new retry handler with custom configuration
	pub fn new(config: RetryConfig) -> Self {
		Self { config }
	}

	/// Creates a new retry handler with default configuration
	pub fn with_default_config() -> Self {
		Self {
			config: RetryConfig::default(),
		}
	}

	/// Attempts an async operation with configured retry behavior
	///
	/// Retries up to the configured attempt budget with exponential backoff
	/// between attempts. The final failure is logged with `context` and the
	/// last error is returned to the caller for wrapping.
	///
	/// # Arguments
	/// * `context` - Short description of the operation for log lines
	/// * `operation` - An async operation that returns a Result
	pub async fn attempt<F, Fut, T, E>(&self, context: &str, operation: F) -> Result<T, E>
	where
		F: Fn() -> Fut + Send + Sync,
		Fut: std::future::Future<Output = Result<T, E>> + Send,
		T: Send,
		E: std::fmt::Display + Send,
	{
		let mut attempt = 0;
		loop {
			match operation().await {
				Ok(value) => return Ok(value),
				Err(e) => {
					attempt += 1;
					if attempt >= self.config.max_attempts {
						error!("{} failed after {} attempts: {}", context, attempt, e);
						return Err(e);
					}
					let delay = self.config.delay_for(attempt - 1);
					warn!(
						"{} failed (attempt {}/{}), retrying in {}ms: {}",
						context,
						attempt,
						self.config.max_attempts,
						delay.as_millis(),
						e
					);
					tokio::time::sleep(delay).await;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[test]
	fn test_delays_are_exponential_and_capped() {
		let config = RetryConfig::new(
			10,
			Duration::from_millis(1000),
			Duration::from_millis(30_000),
		);
		assert_eq!(config.delay_for(0), Duration::from_millis(1000));
		assert_eq!(config.delay_for(1), Duration::from_millis(2000));
		assert_eq!(config.delay_for(2), Duration::from_millis(4000));
		assert_eq!(config.delay_for(4), Duration::from_millis(16_000));
		// 2^5 * 1000 = 32000, capped at 30000
		assert_eq!(config.delay_for(5), Duration::from_millis(30_000));
		assert_eq!(config.delay_for(12), Duration::from_millis(30_000));
	}

	#[test]
	fn test_delays_never_decrease() {
		let config = RetryConfig::default();
		let mut last = Duration::ZERO;
		for attempt in 0..16 {
			let delay = config.delay_for(attempt);
			assert!(delay >= last);
			last = delay;
		}
	}

	#[tokio::test]
	async fn test_attempt_budget_is_honored() {
		let calls = AtomicU32::new(0);
		let retry = WithRetry::new(RetryConfig::new(
			3,
			Duration::from_millis(1),
			Duration::from_millis(2),
		));
		let result: Result<(), String> = retry
			.attempt("always-failing op", || async {
				calls.fetch_add(1, Ordering::SeqCst);
				Err("boom".to_string())
			})
			.await;
		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_success_stops_retrying() {
		let calls = AtomicU32::new(0);
		let retry = WithRetry::with_default_config();
		let result: Result<u32, String> = retry
			.attempt("flaky op", || async {
				let n = calls.fetch_add(1, Ordering::SeqCst);
				if n == 0 {
					Err("transient".to_string())
				} else {
					Ok(n)
				}
			})
			.await;
		assert_eq!(result.unwrap(), 1);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}
}
