//! Notification sinks.
//!
//! A notifier is a delivery sink with an independent retry policy. Three
//! concrete sinks are provided: an HTTP webhook, a Redis pub/sub publisher
//! and a structured log writer with rotated files. The pipeline fans a
//! processed event out to every enabled notifier concurrently and records
//! one outcome entry per sink; one sink's failure never affects another.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

mod error;
mod log;
mod pubsub;
mod webhook;

pub use error::NotificationError;
pub use self::log::{LogNotifier, LogNotifierConfig};
pub use pubsub::RedisPubSubNotifier;
pub use webhook::WebhookNotifier;

use crate::models::{NotificationRecord, ProcessedEvent};
use crate::utils::RetryConfig;

/// Ceiling for the exponential retry delay
const RETRY_DELAY_CAP: Duration = Duration::from_secs(30);

/// A delivery sink with its own retry policy
#[async_trait]
pub trait Notifier: Send + Sync {
	fn id(&self) -> &str;

	fn enabled(&self) -> bool {
		true
	}

	/// Total attempt budget (first try included)
	fn retry_attempts(&self) -> u32;

	/// Base delay before the first retry; doubled per retry
	fn retry_delay(&self) -> Duration;

	async fn notify(&self, event: &ProcessedEvent) -> Result<(), NotificationError>;
}

/// Drives one notifier through its retry budget and records the outcome
///
/// The returned record carries the number of retries on success and the
/// full attempt count on exhaustion; it never propagates the error so other
/// sinks keep running.
pub async fn deliver_with_retry(
	notifier: &dyn Notifier,
	event: &ProcessedEvent,
) -> NotificationRecord {
	let budget = notifier.retry_attempts().max(1);
	let backoff = RetryConfig::new(budget, notifier.retry_delay(), RETRY_DELAY_CAP);
	let mut attempts = 0;
	loop {
		attempts += 1;
		match notifier.notify(event).await {
			Ok(()) => {
				return NotificationRecord {
					channel: notifier.id().to_string(),
					success: true,
					timestamp: Utc::now().timestamp_millis(),
					error: None,
					retry_count: attempts - 1,
				};
			}
			Err(e) => {
				if attempts >= budget {
					return NotificationRecord {
						channel: notifier.id().to_string(),
						success: false,
						timestamp: Utc::now().timestamp_millis(),
						error: Some(e.to_string()),
						retry_count: attempts,
					};
				}
				tokio::time::sleep(backoff.delay_for(attempts - 1)).await;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{CanonicalEvent, ChainKind, EventPayload, TransferPayload};
	use std::sync::atomic::{AtomicU32, Ordering};

	fn sample_event() -> ProcessedEvent {
		let event = CanonicalEvent::new(
			ChainKind::Ethereum,
			"0x1",
			None,
			1,
			1,
			0,
			0,
			EventPayload::Transfer(TransferPayload::default()),
		);
		ProcessedEvent::new(event, "corr".into())
	}

	struct FlakyNotifier {
		calls: AtomicU32,
		fail_first: u32,
		budget: u32,
	}

	#[async_trait]
	impl Notifier for FlakyNotifier {
		fn id(&self) -> &str {
			"flaky"
		}

		fn retry_attempts(&self) -> u32 {
			self.budget
		}

		fn retry_delay(&self) -> Duration {
			Duration::from_millis(1)
		}

		async fn notify(&self, _event: &ProcessedEvent) -> Result<(), NotificationError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			if n < self.fail_first {
				Err(NotificationError::delivery_error("sink-down"))
			} else {
				Ok(())
			}
		}
	}

	#[tokio::test]
	async fn test_success_after_retries() {
		let notifier = FlakyNotifier {
			calls: AtomicU32::new(0),
			fail_first: 2,
			budget: 4,
		};
		let record = deliver_with_retry(&notifier, &sample_event()).await;
		assert!(record.success);
		assert_eq!(record.retry_count, 2);
		assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_exhaustion_records_failure() {
		let notifier = FlakyNotifier {
			calls: AtomicU32::new(0),
			fail_first: u32::MAX,
			budget: 3,
		};
		let record = deliver_with_retry(&notifier, &sample_event()).await;
		assert!(!record.success);
		assert_eq!(record.retry_count, 3);
		assert!(record.error.as_deref().unwrap().contains("sink-down"));
		// The attempt budget bounds the call count
		assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
	}
}
