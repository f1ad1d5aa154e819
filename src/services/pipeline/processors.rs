//! Enrichment and processing stages.
//!
//! Enrichers run in insertion order and may mutate the event (errors pass
//! the event through unchanged); processors run in insertion order and the
//! first one to produce a processed event wins.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use super::error::PipelineError;
use crate::models::{
	CanonicalEvent, Classification, ProcessedEvent, TargetPriority, ValueCategory,
};
use crate::services::resolver::TargetConfigResolver;

/// Mutating stage between filtering and processing
#[async_trait]
pub trait EventEnricher: Send + Sync {
	fn id(&self) -> &str;
	async fn enrich(&self, event: CanonicalEvent) -> Result<CanonicalEvent, PipelineError>;
}

/// Stage turning a canonical event into a processed event
#[async_trait]
pub trait EventProcessor: Send + Sync {
	fn id(&self) -> &str;
	async fn process(
		&self,
		event: &CanonicalEvent,
		correlation_id: &str,
	) -> Result<ProcessedEvent, PipelineError>;
}

/// Stamps the resolved target's tags and priority into the event metadata
pub struct TargetTagEnricher {
	resolver: Arc<TargetConfigResolver>,
}

impl TargetTagEnricher {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self { resolver }
	}
}

#[async_trait]
impl EventEnricher for TargetTagEnricher {
	fn id(&self) -> &str {
		"target_tag_enricher"
	}

	async fn enrich(&self, mut event: CanonicalEvent) -> Result<CanonicalEvent, PipelineError> {
		let address = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address())
			.or_else(|| event.data.to())
			.unwrap_or("")
			.to_string();
		if address.is_empty() {
			return Ok(event);
		}
		let Some(target) = self.resolver.target_for_address(&address, event.chain).await else {
			return Ok(event);
		};
		let metadata = event.data.metadata_mut();
		metadata.insert("target_id".into(), serde_json::json!(target.id));
		if !target.tags.is_empty() {
			metadata.insert("target_tags".into(), serde_json::json!(target.tags));
		}
		if let Some(priority) = target.priority {
			metadata.insert("target_priority".into(), serde_json::to_value(priority)?);
		}
		Ok(event)
	}
}

/// Classifies events into value bands from the resolved amount thresholds
pub struct ClassificationProcessor {
	resolver: Arc<TargetConfigResolver>,
}

impl ClassificationProcessor {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self { resolver }
	}

	fn classify(
		amount: Option<Decimal>,
		min_amount: Option<Decimal>,
		priority: TargetPriority,
	) -> Classification {
		let Some(amount) = amount else {
			return Classification {
				category: ValueCategory::MediumValue,
				confidence: 0.5,
			};
		};
		if amount.is_zero() {
			return Classification {
				category: ValueCategory::Spam,
				confidence: 0.9,
			};
		}
		match min_amount {
			Some(min) if min > Decimal::ZERO => {
				if amount >= min * Decimal::from(100) {
					Classification {
						category: ValueCategory::HighValue,
						confidence: 0.9,
					}
				} else if amount >= min {
					Classification {
						category: ValueCategory::MediumValue,
						confidence: 0.7,
					}
				} else {
					Classification {
						category: ValueCategory::LowValue,
						confidence: 0.6,
					}
				}
			}
			_ => {
				// Without thresholds only the target priority separates
				// bands
				let category = match priority {
					TargetPriority::High => ValueCategory::HighValue,
					TargetPriority::Medium => ValueCategory::MediumValue,
					TargetPriority::Low => ValueCategory::LowValue,
				};
				Classification {
					category,
					confidence: 0.5,
				}
			}
		}
	}
}

#[async_trait]
impl EventProcessor for ClassificationProcessor {
	fn id(&self) -> &str {
		"classification_processor"
	}

	async fn process(
		&self,
		event: &CanonicalEvent,
		correlation_id: &str,
	) -> Result<ProcessedEvent, PipelineError> {
		let contract = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address())
			.unwrap_or("");
		let view = self.resolver.resolve(contract, event.chain).await;
		let amount = event
			.data
			.amount()
			.and_then(|raw| Decimal::from_str(raw).ok());
		let min_amount = view
			.min_amount
			.as_deref()
			.and_then(|raw| Decimal::from_str(raw).ok());

		let mut processed = ProcessedEvent::new(event.clone(), correlation_id.to_string());
		processed.metadata.classification =
			Some(Self::classify(amount, min_amount, view.priority));
		Ok(processed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{
		ChainKind, EventKind, EventPayload, FilterDefaultsConfig, MonitoringTarget, TargetKind,
		TransferPayload,
	};

	fn event_with_amount(amount: &str) -> CanonicalEvent {
		CanonicalEvent::new(
			ChainKind::Ethereum,
			"0x1",
			None,
			1,
			1,
			0,
			0,
			EventPayload::Transfer(TransferPayload {
				from: Some("0xa".into()),
				to: Some("0xb".into()),
				amount: Some(amount.into()),
				token_address: Some("0xf00d000000000000000000000000000000000001".into()),
				..Default::default()
			}),
		)
	}

	fn resolver_with_min(min: &str) -> Arc<TargetConfigResolver> {
		TargetConfigResolver::new(
			FilterDefaultsConfig {
				min_amount: Some(min.into()),
				..Default::default()
			},
			vec![],
		)
	}

	#[tokio::test]
	async fn test_value_bands_from_thresholds() {
		let processor = ClassificationProcessor::new(resolver_with_min("100"));

		let high = processor
			.process(&event_with_amount("10000"), "c1")
			.await
			.unwrap();
		assert_eq!(
			high.metadata.classification.unwrap().category,
			ValueCategory::HighValue
		);

		let medium = processor
			.process(&event_with_amount("500"), "c2")
			.await
			.unwrap();
		assert_eq!(
			medium.metadata.classification.unwrap().category,
			ValueCategory::MediumValue
		);

		let low = processor
			.process(&event_with_amount("50"), "c3")
			.await
			.unwrap();
		assert_eq!(
			low.metadata.classification.unwrap().category,
			ValueCategory::LowValue
		);

		let spam = processor
			.process(&event_with_amount("0"), "c4")
			.await
			.unwrap();
		assert_eq!(
			spam.metadata.classification.unwrap().category,
			ValueCategory::Spam
		);
	}

	#[tokio::test]
	async fn test_enricher_stamps_target_metadata() {
		let target = MonitoringTarget {
			tags: vec!["stablecoin".into()],
			priority: Some(crate::models::TargetPriority::High),
			..MonitoringTarget::new(
				"usdc",
				TargetKind::Contract,
				"0xf00d000000000000000000000000000000000001",
				vec![EventKind::Transfer],
			)
		};
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![target]);
		let enricher = TargetTagEnricher::new(resolver);

		let enriched = enricher.enrich(event_with_amount("10")).await.unwrap();
		let metadata = enriched.data.metadata();
		assert_eq!(metadata.get("target_id").unwrap(), &serde_json::json!("usdc"));
		assert_eq!(
			metadata.get("target_tags").unwrap(),
			&serde_json::json!(["stablecoin"])
		);
	}

	#[tokio::test]
	async fn test_enricher_passes_unknown_targets_through() {
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![]);
		let enricher = TargetTagEnricher::new(resolver);
		let event = event_with_amount("10");
		let enriched = enricher.enrich(event.clone()).await.unwrap();
		assert_eq!(enriched, event);
	}
}
