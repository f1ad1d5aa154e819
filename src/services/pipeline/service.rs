//! Event pipeline implementation.
//!
//! `execute` runs an event through the ordered filter chain (descending
//! priority, short-circuit on first rejection), the enrichers (insertion
//! order, errors pass the event through unchanged), the processors
//! (insertion order, first success wins, default classification otherwise)
//! and finally fans the processed event out to every enabled notifier
//! concurrently. Steps before the fan-out are strictly sequential; the
//! pipeline holds no per-execution state, so the manager may call `execute`
//! concurrently for events from different adapters.

use chrono::Utc;
use log::warn;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use super::error::PipelineError;
use super::filters::EventFilter;
use super::processors::{EventEnricher, EventProcessor};
use crate::models::{
	CanonicalEvent, Classification, ProcessedEvent, ProcessingError, ValueCategory,
};
use crate::services::notification::{deliver_with_retry, Notifier};
use crate::services::resolver::TargetConfigResolver;

/// Counters surfaced through `get_stats().pipeline_stats`
#[derive(Debug, Default)]
struct PipelineStats {
	executed: AtomicU64,
	filtered: AtomicU64,
	completed: AtomicU64,
	notifications_sent: AtomicU64,
	notification_failures: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatsSnapshot {
	pub executed: u64,
	pub filtered: u64,
	pub completed: u64,
	pub notifications_sent: u64,
	pub notification_failures: u64,
}

/// Ordered filter chain → enrichment → processor → fan-out notification
pub struct EventPipeline {
	resolver: Arc<TargetConfigResolver>,
	filters: RwLock<Vec<Arc<dyn EventFilter>>>,
	enrichers: RwLock<Vec<Arc<dyn EventEnricher>>>,
	processors: RwLock<Vec<Arc<dyn EventProcessor>>>,
	notifiers: RwLock<Vec<Arc<dyn Notifier>>>,
	stats: PipelineStats,
}

impl EventPipeline {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self {
			resolver,
			filters: RwLock::new(Vec::new()),
			enrichers: RwLock::new(Vec::new()),
			processors: RwLock::new(Vec::new()),
			notifiers: RwLock::new(Vec::new()),
			stats: PipelineStats::default(),
		}
	}

	/// Registers a filter; replacing an existing id is an error
	pub async fn add_filter(&self, filter: Arc<dyn EventFilter>) -> Result<(), PipelineError> {
		let mut filters = self.filters.write().await;
		if filters.iter().any(|f| f.id() == filter.id()) {
			return Err(PipelineError::duplicate_component(filter.id()));
		}
		filters.push(filter);
		// Kept sorted so execute walks descending priority
		filters.sort_by_key(|f| std::cmp::Reverse(f.priority()));
		Ok(())
	}

	pub async fn add_enricher(&self, enricher: Arc<dyn EventEnricher>) -> Result<(), PipelineError> {
		let mut enrichers = self.enrichers.write().await;
		if enrichers.iter().any(|e| e.id() == enricher.id()) {
			return Err(PipelineError::duplicate_component(enricher.id()));
		}
		enrichers.push(enricher);
		Ok(())
	}

	pub async fn add_processor(
		&self,
		processor: Arc<dyn EventProcessor>,
	) -> Result<(), PipelineError> {
		let mut processors = self.processors.write().await;
		if processors.iter().any(|p| p.id() == processor.id()) {
			return Err(PipelineError::duplicate_component(processor.id()));
		}
		processors.push(processor);
		Ok(())
	}

	pub async fn add_notifier(&self, notifier: Arc<dyn Notifier>) -> Result<(), PipelineError> {
		let mut notifiers = self.notifiers.write().await;
		if notifiers.iter().any(|n| n.id() == notifier.id()) {
			return Err(PipelineError::duplicate_component(notifier.id()));
		}
		notifiers.push(notifier);
		Ok(())
	}

	pub fn stats(&self) -> PipelineStatsSnapshot {
		PipelineStatsSnapshot {
			executed: self.stats.executed.load(Ordering::Relaxed),
			filtered: self.stats.filtered.load(Ordering::Relaxed),
			completed: self.stats.completed.load(Ordering::Relaxed),
			notifications_sent: self.stats.notifications_sent.load(Ordering::Relaxed),
			notification_failures: self.stats.notification_failures.load(Ordering::Relaxed),
		}
	}

	fn correlation_id() -> String {
		format!(
			"{}_{:08x}",
			Utc::now().timestamp_millis(),
			rand::random::<u32>()
		)
	}

	/// Runs one event through the pipeline
	///
	/// Returns `None` when a filter rejected the event. Filter errors count
	/// as rejection; enricher and processor errors are recorded on the
	/// processed event without aborting it.
	pub async fn execute(
		&self,
		event: CanonicalEvent,
	) -> Result<Option<ProcessedEvent>, PipelineError> {
		let started = Instant::now();
		self.stats.executed.fetch_add(1, Ordering::Relaxed);
		let correlation_id = Self::correlation_id();
		let mut filters_applied = Vec::new();

		let filters: Vec<Arc<dyn EventFilter>> = self.filters.read().await.clone();
		for filter in filters.iter().filter(|f| f.enabled()) {
			filters_applied.push(filter.name().to_string());
			match filter.apply(&event).await {
				Ok(true) => {}
				Ok(false) => {
					self.stats.filtered.fetch_add(1, Ordering::Relaxed);
					return Ok(None);
				}
				Err(e) => {
					warn!(
						"Filter '{}' errored on {}, dropping event: {}",
						filter.id(),
						event.id,
						e
					);
					self.stats.filtered.fetch_add(1, Ordering::Relaxed);
					return Ok(None);
				}
			}
		}

		let mut errors: Vec<ProcessingError> = Vec::new();
		let mut event = event;
		let enrichers: Vec<Arc<dyn EventEnricher>> = self.enrichers.read().await.clone();
		for enricher in &enrichers {
			match enricher.enrich(event.clone()).await {
				Ok(enriched) => event = enriched,
				Err(e) => {
					warn!("Enricher '{}' failed, passing through: {}", enricher.id(), e);
					errors.push(ProcessingError {
						stage: enricher.id().to_string(),
						error: e.to_string(),
						timestamp: Utc::now().timestamp_millis(),
						recoverable: true,
					});
				}
			}
		}

		let processors: Vec<Arc<dyn EventProcessor>> = self.processors.read().await.clone();
		let mut processed = None;
		for processor in &processors {
			match processor.process(&event, &correlation_id).await {
				Ok(result) => {
					processed = Some(result);
					break;
				}
				Err(e) => {
					errors.push(ProcessingError {
						stage: processor.id().to_string(),
						error: e.to_string(),
						timestamp: Utc::now().timestamp_millis(),
						recoverable: true,
					});
				}
			}
		}
		let mut processed = processed.unwrap_or_else(|| {
			let mut fallback = ProcessedEvent::new(event.clone(), correlation_id.clone());
			fallback.metadata.classification = Some(Classification {
				category: ValueCategory::MediumValue,
				confidence: 0.5,
			});
			fallback
		});
		processed.metadata.filters_applied = filters_applied;
		processed.errors.extend(errors);

		// Targets may restrict delivery to named channels
		let allowed_channels = {
			let contract = processed
				.original
				.data
				.token_address()
				.or_else(|| processed.original.data.contract_address())
				.unwrap_or("");
			self.resolver
				.resolve(contract, processed.original.chain)
				.await
				.notification_channels
		};

		let notifiers: Vec<Arc<dyn Notifier>> = self
			.notifiers
			.read()
			.await
			.iter()
			.filter(|n| n.enabled())
			.filter(|n| match &allowed_channels {
				Some(channels) => channels.iter().any(|c| c == n.id()),
				None => true,
			})
			.cloned()
			.collect();

		let records = futures::future::join_all(
			notifiers
				.iter()
				.map(|notifier| deliver_with_retry(notifier.as_ref(), &processed)),
		)
		.await;
		for record in records {
			if record.success {
				self.stats.notifications_sent.fetch_add(1, Ordering::Relaxed);
			} else {
				self.stats
					.notification_failures
					.fetch_add(1, Ordering::Relaxed);
			}
			processed.notifications.push(record);
		}

		processed.processed_at = Utc::now().timestamp_millis();
		processed.processing_duration = started.elapsed().as_millis() as u64;
		self.stats.completed.fetch_add(1, Ordering::Relaxed);
		Ok(Some(processed))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{
		ChainKind, EventPayload, FilterDefaultsConfig, NotificationRecord, TransferPayload,
	};
	use crate::services::notification::NotificationError;
	use async_trait::async_trait;
	use std::sync::atomic::AtomicU32;
	use std::time::Duration;

	fn sample_event() -> CanonicalEvent {
		CanonicalEvent::new(
			ChainKind::Ethereum,
			"0xabc",
			Some(0),
			100,
			110,
			6,
			1_700_000_000_000,
			EventPayload::Transfer(TransferPayload {
				from: Some("0xa".into()),
				to: Some("0xb".into()),
				amount: Some("1000".into()),
				token_address: Some("0xt".into()),
				..Default::default()
			}),
		)
	}

	fn empty_pipeline() -> EventPipeline {
		EventPipeline::new(TargetConfigResolver::new(
			FilterDefaultsConfig::default(),
			vec![],
		))
	}

	struct StaticFilter {
		id: &'static str,
		priority: i32,
		verdict: bool,
		calls: AtomicU32,
	}

	impl StaticFilter {
		fn new(id: &'static str, priority: i32, verdict: bool) -> Arc<Self> {
			Arc::new(Self {
				id,
				priority,
				verdict,
				calls: AtomicU32::new(0),
			})
		}
	}

	#[async_trait]
	impl EventFilter for StaticFilter {
		fn id(&self) -> &str {
			self.id
		}

		fn name(&self) -> &str {
			self.id
		}

		fn priority(&self) -> i32 {
			self.priority
		}

		async fn apply(&self, _event: &CanonicalEvent) -> Result<bool, PipelineError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(self.verdict)
		}
	}

	struct StaticNotifier {
		id: &'static str,
		fail: bool,
		budget: u32,
	}

	#[async_trait]
	impl Notifier for StaticNotifier {
		fn id(&self) -> &str {
			self.id
		}

		fn retry_attempts(&self) -> u32 {
			self.budget
		}

		fn retry_delay(&self) -> Duration {
			Duration::from_millis(1)
		}

		async fn notify(&self, _event: &ProcessedEvent) -> Result<(), NotificationError> {
			if self.fail {
				Err(NotificationError::delivery_error("sink-down"))
			} else {
				Ok(())
			}
		}
	}

	#[tokio::test]
	async fn test_duplicate_filter_id_rejected() {
		let pipeline = empty_pipeline();
		pipeline
			.add_filter(StaticFilter::new("f1", 5, true))
			.await
			.unwrap();
		let err = pipeline
			.add_filter(StaticFilter::new("f1", 7, true))
			.await
			.unwrap_err();
		assert!(matches!(err, PipelineError::DuplicateComponent(_)));
	}

	#[tokio::test]
	async fn test_high_priority_rejection_short_circuits() {
		let pipeline = empty_pipeline();
		let rejecting = StaticFilter::new("rejecting", 10, false);
		let downstream = StaticFilter::new("downstream", 1, true);
		pipeline.add_filter(rejecting.clone()).await.unwrap();
		pipeline.add_filter(downstream.clone()).await.unwrap();

		let result = pipeline.execute(sample_event()).await.unwrap();
		assert!(result.is_none());
		assert_eq!(rejecting.calls.load(Ordering::SeqCst), 1);
		// The lower-priority filter was never evaluated
		assert_eq!(downstream.calls.load(Ordering::SeqCst), 0);
		assert_eq!(pipeline.stats().filtered, 1);
	}

	#[tokio::test]
	async fn test_filters_run_in_descending_priority() {
		let pipeline = empty_pipeline();
		pipeline
			.add_filter(StaticFilter::new("low", 1, true))
			.await
			.unwrap();
		pipeline
			.add_filter(StaticFilter::new("high", 9, true))
			.await
			.unwrap();

		let processed = pipeline.execute(sample_event()).await.unwrap().unwrap();
		assert_eq!(processed.metadata.filters_applied, vec!["high", "low"]);
	}

	#[tokio::test]
	async fn test_default_processed_event_when_no_processor() {
		let pipeline = empty_pipeline();
		let processed = pipeline.execute(sample_event()).await.unwrap().unwrap();
		assert_eq!(processed.id, "processed_ethereum_0xabc_0");
		let classification = processed.metadata.classification.unwrap();
		assert_eq!(classification.category, ValueCategory::MediumValue);
		assert!((classification.confidence - 0.5).abs() < f64::EPSILON);
		assert!(!processed.metadata.correlation_id.is_empty());
	}

	#[tokio::test]
	async fn test_fan_out_isolates_failures() {
		let pipeline = empty_pipeline();
		pipeline
			.add_notifier(Arc::new(StaticNotifier {
				id: "failing",
				fail: true,
				budget: 3,
			}))
			.await
			.unwrap();
		pipeline
			.add_notifier(Arc::new(StaticNotifier {
				id: "healthy",
				fail: false,
				budget: 3,
			}))
			.await
			.unwrap();

		let processed = pipeline.execute(sample_event()).await.unwrap().unwrap();
		assert_eq!(processed.notifications.len(), 2);

		let by_channel = |channel: &str| -> &NotificationRecord {
			processed
				.notifications
				.iter()
				.find(|r| r.channel == channel)
				.unwrap()
		};
		let failing = by_channel("failing");
		assert!(!failing.success);
		assert_eq!(failing.retry_count, 3);
		assert!(failing.error.as_deref().unwrap().contains("sink-down"));

		let healthy = by_channel("healthy");
		assert!(healthy.success);
		assert_eq!(healthy.retry_count, 0);

		let stats = pipeline.stats();
		assert_eq!(stats.notifications_sent, 1);
		assert_eq!(stats.notification_failures, 1);
	}

	#[tokio::test]
	async fn test_execute_is_reentrant() {
		let pipeline = Arc::new(empty_pipeline());
		let mut handles = Vec::new();
		for n in 0..8u64 {
			let pipeline = pipeline.clone();
			handles.push(tokio::spawn(async move {
				let mut event = sample_event();
				event.id = format!("ethereum_0x{:x}", n);
				pipeline.execute(event).await.unwrap()
			}));
		}
		for handle in handles {
			assert!(handle.await.unwrap().is_some());
		}
		assert_eq!(pipeline.stats().executed, 8);
		assert_eq!(pipeline.stats().completed, 8);
	}
}
