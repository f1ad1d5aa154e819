//! Webhook notification implementation.
//!
//! POSTs one JSON document per processed event to a configured URL with a
//! per-request timeout. Any 2xx status counts as delivered; every other
//! status raises and is retried by the caller's retry budget.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::ProcessedEvent;
use crate::services::notification::{NotificationError, Notifier};

/// Webhook sink
pub struct WebhookNotifier {
	url: String,
	client: reqwest::Client,
	retry_attempts: u32,
	retry_delay: Duration,
}

impl WebhookNotifier {
	/// Creates a new webhook notifier
	///
	/// # Arguments
	/// * `url` - Endpoint receiving the POSTs
	/// * `timeout` - Per-request timeout
	/// * `retry_attempts` - Total attempt budget
	/// * `retry_delay` - Base delay before the first retry
	pub fn new(
		url: String,
		timeout: Duration,
		retry_attempts: u32,
		retry_delay: Duration,
	) -> Result<Self, NotificationError> {
		if url.is_empty() {
			return Err(NotificationError::config_error("Webhook URL is empty"));
		}
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| NotificationError::internal_error(e.to_string()))?;
		Ok(Self {
			url,
			client,
			retry_attempts,
			retry_delay,
		})
	}

	/// Builds the POST body for one processed event
	pub fn build_payload(event: &ProcessedEvent) -> Value {
		json!({
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
			"notifications": event.notifications,
			"processed": true,
			"errors": event.errors,
		})
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	fn id(&self) -> &str {
		"webhook"
	}

	fn retry_attempts(&self) -> u32 {
		self.retry_attempts
	}

	fn retry_delay(&self) -> Duration {
		self.retry_delay
	}

	async fn notify(&self, event: &ProcessedEvent) -> Result<(), NotificationError> {
		let payload = Self::build_payload(event);
		let response = self
			.client
			.post(&self.url)
			.json(&payload)
			.send()
			.await?;

		let status = response.status();
		if status.is_success() {
			return Ok(());
		}
		let body = response.text().await.unwrap_or_default();
		Err(NotificationError::delivery_error(format!(
			"Webhook request failed: {} {}. Response: {}",
			status.as_u16(),
			status.canonical_reason().unwrap_or("Unknown"),
			body
		)))
	}
}
