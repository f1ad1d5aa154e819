//! Pipeline output model.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::core::event::CanonicalEvent;

/// Value classification assigned by a processor
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
	HighValue,
	MediumValue,
	LowValue,
	Spam,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
	pub category: ValueCategory,
	pub confidence: f64,
}

/// Outcome of one notifier's delivery attempt(s)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
	pub channel: String,
	pub success: bool,
	/// Unix milliseconds of the final attempt
	pub timestamp: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub retry_count: u32,
}

/// Error captured at a pipeline stage without aborting the execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingError {
	pub stage: String,
	pub error: String,
	pub timestamp: i64,
	pub recoverable: bool,
}

/// Execution-scoped metadata accumulated by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingMetadata {
	/// Unique per pipeline execution
	pub correlation_id: String,
	/// Names of the filters that evaluated the event
	pub filters_applied: Vec<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub enrichment: HashMap<String, serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub classification: Option<Classification>,
}

/// The pipeline's per-event result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedEvent {
	/// `"processed_" + original event id`
	pub id: String,
	pub original: CanonicalEvent,
	/// Unix milliseconds
	pub processed_at: i64,
	/// Milliseconds spent between pipeline entry and completion
	pub processing_duration: u64,
	pub notifications: Vec<NotificationRecord>,
	pub metadata: ProcessingMetadata,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<ProcessingError>,
}

impl ProcessedEvent {
	pub fn new(event: CanonicalEvent, correlation_id: String) -> Self {
		Self {
			id: format!("processed_{}", event.id),
			original: event,
			processed_at: 0,
			processing_duration: 0,
			notifications: Vec::new(),
			metadata: ProcessingMetadata {
				correlation_id,
				..Default::default()
			},
			errors: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{ChainKind, EventPayload, TransferPayload};

	#[test]
	fn test_processed_id_prefix() {
		let event = CanonicalEvent::new(
			ChainKind::Ethereum,
			"0xfeed",
			None,
			1,
			1,
			0,
			0,
			EventPayload::Transfer(TransferPayload::default()),
		);
		let processed = ProcessedEvent::new(event, "corr-1".into());
		assert_eq!(processed.id, "processed_ethereum_0xfeed");
		assert_eq!(processed.metadata.correlation_id, "corr-1");
		assert!(processed.notifications.is_empty());
	}
}
