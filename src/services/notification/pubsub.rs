//! Redis pub/sub notification implementation.
//!
//! Serializes each processed event as JSON (without the `notifications`
//! field, which is rebuilt downstream) and publishes one message per event
//! to a configured channel. The connection is established lazily and
//! re-established on the next delivery after a failure. Publishing to a
//! channel with zero subscribers logs a warning but still counts as
//! delivered.

use async_trait::async_trait;
use log::warn;
use redis::aio::MultiplexedConnection;
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::ProcessedEvent;
use crate::services::notification::{NotificationError, Notifier};

/// Redis pub/sub sink
pub struct RedisPubSubNotifier {
	channel: String,
	client: redis::Client,
	connection: Mutex<Option<MultiplexedConnection>>,
	retry_attempts: u32,
	retry_delay: Duration,
}

impl RedisPubSubNotifier {
	pub fn new(
		redis_url: &str,
		channel: String,
		retry_attempts: u32,
		retry_delay: Duration,
	) -> Result<Self, NotificationError> {
		if channel.is_empty() {
			return Err(NotificationError::config_error(
				"Pub/sub channel name is empty",
			));
		}
		let client = redis::Client::open(redis_url)
			.map_err(|e| NotificationError::config_error(format!("Bad redis url: {}", e)))?;
		Ok(Self {
			channel,
			client,
			connection: Mutex::new(None),
			retry_attempts,
			retry_delay,
		})
	}

	/// Message body: the webhook document minus the notifications list
	fn build_message(event: &ProcessedEvent) -> Result<String, NotificationError> {
		let body = json!({
			"id": event.id,
			"timestamp": event.processed_at,
			"event": {
				"id": event.original.id,
				"chainType": event.original.chain,
				"eventType": event.original.kind,
				"blockNumber": event.original.block_number,
				"transactionHash": event.original.tx_hash,
				"timestamp": event.original.timestamp,
				"confirmed": event.original.confirmed,
				"data": event.original.data,
			},
			"metadata": event.metadata,
			"processed": true,
			"errors": event.errors,
		});
		Ok(serde_json::to_string(&body)?)
	}

	/// Returns the cached connection, dialing lazily when absent
	async fn connection(&self) -> Result<MultiplexedConnection, NotificationError> {
		let mut slot = self.connection.lock().await;
		if let Some(connection) = slot.as_ref() {
			return Ok(connection.clone());
		}
		let connection = self.client.get_multiplexed_async_connection().await?;
		*slot = Some(connection.clone());
		Ok(connection)
	}

	async fn drop_connection(&self) {
		*self.connection.lock().await = None;
	}
}

#[async_trait]
impl Notifier for RedisPubSubNotifier {
	fn id(&self) -> &str {
		"redis_pubsub"
	}

	fn retry_attempts(&self) -> u32 {
		self.retry_attempts
	}

	fn retry_delay(&self) -> Duration {
		self.retry_delay
	}

	async fn notify(&self, event: &ProcessedEvent) -> Result<(), NotificationError> {
		let message = Self::build_message(event)?;
		let mut connection = self.connection().await?;

		let receivers: i64 = match redis::cmd("PUBLISH")
			.arg(&self.channel)
			.arg(&message)
			.query_async(&mut connection)
			.await
		{
			Ok(receivers) => receivers,
			Err(e) => {
				// Reconnect lazily on the next attempt
				self.drop_connection().await;
				return Err(e.into());
			}
		};

		if receivers == 0 {
			warn!(
				"Published event {} to channel '{}' with zero subscribers",
				event.id, self.channel
			);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{CanonicalEvent, ChainKind, EventPayload, TransferPayload};

	fn sample_processed() -> ProcessedEvent {
		let event = CanonicalEvent::new(
			ChainKind::Solana,
			"5Nf3",
			None,
			10,
			10,
			0,
			0,
			EventPayload::Transfer(TransferPayload::default()),
		);
		ProcessedEvent::new(event, "corr".into())
	}

	#[test]
	fn test_empty_channel_rejected() {
		let result = RedisPubSubNotifier::new(
			"redis://127.0.0.1:6379",
			String::new(),
			1,
			Duration::from_millis(1),
		);
		assert!(matches!(result, Err(NotificationError::ConfigError(_))));
	}

	#[test]
	fn test_bad_url_rejected() {
		let result = RedisPubSubNotifier::new(
			"not-a-redis-url",
			"events".into(),
			1,
			Duration::from_millis(1),
		);
		assert!(matches!(result, Err(NotificationError::ConfigError(_))));
	}

	#[test]
	fn test_message_omits_notifications() {
		let message = RedisPubSubNotifier::build_message(&sample_processed()).unwrap();
		let value: serde_json::Value = serde_json::from_str(&message).unwrap();
		assert!(value.get("notifications").is_none());
		assert_eq!(value["event"]["chainType"], "solana");
		assert_eq!(value["processed"], true);
	}

	#[tokio::test]
	async fn test_unreachable_server_is_delivery_error() {
		let notifier = RedisPubSubNotifier::new(
			"redis://127.0.0.1:1",
			"events".into(),
			1,
			Duration::from_millis(1),
		)
		.unwrap();
		let err = notifier.notify(&sample_processed()).await.unwrap_err();
		assert!(matches!(err, NotificationError::DeliveryError(_)));
	}
}
