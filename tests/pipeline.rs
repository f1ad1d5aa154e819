#[path = "common/mod.rs"]
mod common;

#[cfg(test)]
mod pipeline_tests {
	use async_trait::async_trait;
	use std::sync::Arc;
	use std::time::Duration;

	use chainwatch::models::{
		CanonicalEvent, ChainKind, CustomRule, EventKind, EventPayload, FilterDefaultsConfig,
		MonitoringTarget, NativeTransferPayload, ProcessedEvent, RuleOperator,
		TargetFilterOverrides, ValueCategory,
	};
	use chainwatch::services::notification::{NotificationError, Notifier};
	use chainwatch::services::pipeline::{
		AddressFilter, AmountFilter, ClassificationProcessor, ConfirmationFilter,
		CustomRulesFilter, EventKindFilter, EventPipeline, TargetAmountFilter, TargetTagEnricher,
		WatchLists,
	};
	use chainwatch::services::resolver::TargetConfigResolver;

	use crate::common::{contract_target, empty_resolver, transfer_event};

	struct RecordingNotifier {
		id: &'static str,
		fail: bool,
	}

	#[async_trait]
	impl Notifier for RecordingNotifier {
		fn id(&self) -> &str {
			self.id
		}

		fn retry_attempts(&self) -> u32 {
			3
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
	async fn test_full_chain_passes_matching_event() {
		let resolver = empty_resolver();
		let watch_lists = WatchLists::new();
		watch_lists
			.fungible_contracts
			.write()
			.await
			.insert("0xf00d000000000000000000000000000000000001".into());

		let pipeline = EventPipeline::new(resolver.clone());
		pipeline
			.add_filter(Arc::new(AddressFilter::new(watch_lists.clone())))
			.await
			.unwrap();
		pipeline
			.add_filter(Arc::new(chainwatch::services::pipeline::ContractFilter::new(
				watch_lists.clone(),
			)))
			.await
			.unwrap();
		pipeline
			.add_filter(Arc::new(EventKindFilter::new([
				EventKind::Transfer,
				EventKind::TokenMint,
			])))
			.await
			.unwrap();
		pipeline
			.add_filter(Arc::new(ConfirmationFilter::new(6)))
			.await
			.unwrap();
		pipeline
			.add_enricher(Arc::new(TargetTagEnricher::new(resolver.clone())))
			.await
			.unwrap();
		pipeline
			.add_processor(Arc::new(ClassificationProcessor::new(resolver)))
			.await
			.unwrap();

		let event = transfer_event(
			ChainKind::Ethereum,
			"0xcafe",
			"0xa1b2000000000000000000000000000000000000",
			"0xc3d4000000000000000000000000000000000000",
			"1000000000000000000",
			"0xf00d000000000000000000000000000000000001",
		);
		let processed = pipeline.execute(event).await.unwrap().unwrap();

		assert_eq!(processed.id, "processed_ethereum_0xcafe_0");
		assert!(processed.metadata.classification.is_some());
		assert_eq!(processed.metadata.filters_applied.len(), 4);
		assert!(processed.processing_duration < 5_000);
	}

	#[tokio::test]
	async fn test_unconfirmed_event_gated() {
		let pipeline = EventPipeline::new(empty_resolver());
		pipeline
			.add_filter(Arc::new(ConfirmationFilter::new(12)))
			.await
			.unwrap();

		// Built with 10 confirmations
		let event = transfer_event(ChainKind::Ethereum, "0x1", "0xa", "0xb", "5", "0xt");
		assert!(pipeline.execute(event).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_fan_out_failure_isolation_end_to_end() {
		let pipeline = EventPipeline::new(empty_resolver());
		pipeline
			.add_notifier(Arc::new(RecordingNotifier {
				id: "sink-a",
				fail: true,
			}))
			.await
			.unwrap();
		pipeline
			.add_notifier(Arc::new(RecordingNotifier {
				id: "sink-b",
				fail: false,
			}))
			.await
			.unwrap();

		let event = transfer_event(ChainKind::Bsc, "0x2", "0xa", "0xb", "5", "0xt");
		let processed = pipeline.execute(event).await.unwrap().unwrap();

		assert_eq!(processed.notifications.len(), 2);
		let failed = processed
			.notifications
			.iter()
			.find(|r| r.channel == "sink-a")
			.unwrap();
		assert!(!failed.success);
		assert_eq!(failed.retry_count, 3);
		assert!(failed.error.as_deref().unwrap().contains("sink-down"));

		let succeeded = processed
			.notifications
			.iter()
			.find(|r| r.channel == "sink-b")
			.unwrap();
		assert!(succeeded.success);
		assert_eq!(succeeded.retry_count, 0);
	}

	#[tokio::test]
	async fn test_target_overrides_gate_amounts() {
		let target = MonitoringTarget {
			filters: Some(TargetFilterOverrides {
				min_amount: Some("1000000".into()),
				..Default::default()
			}),
			..contract_target("usdc", "0xf00d000000000000000000000000000000000001")
		};
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![target]);
		let pipeline = EventPipeline::new(resolver.clone());
		pipeline
			.add_filter(Arc::new(TargetAmountFilter::new(resolver)))
			.await
			.unwrap();

		let small = transfer_event(
			ChainKind::Ethereum,
			"0x3",
			"0xa",
			"0xb",
			"999999",
			"0xf00d000000000000000000000000000000000001",
		);
		assert!(pipeline.execute(small).await.unwrap().is_none());

		let large = transfer_event(
			ChainKind::Ethereum,
			"0x4",
			"0xa",
			"0xb",
			"2000000",
			"0xf00d000000000000000000000000000000000001",
		);
		assert!(pipeline.execute(large).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_custom_rules_and_classification_together() {
		let target = MonitoringTarget {
			filters: Some(TargetFilterOverrides {
				min_amount: Some("100".into()),
				custom_rules: vec![CustomRule {
					field: "amount".into(),
					operator: RuleOperator::GreaterThan,
					value: serde_json::json!("0"),
					description: Some("drop zero-value spam".into()),
				}],
				..Default::default()
			}),
			..contract_target("gated", "0xf00d000000000000000000000000000000000001")
		};
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![target]);
		let pipeline = EventPipeline::new(resolver.clone());
		pipeline
			.add_filter(Arc::new(CustomRulesFilter::new(resolver.clone())))
			.await
			.unwrap();
		pipeline
			.add_processor(Arc::new(ClassificationProcessor::new(resolver)))
			.await
			.unwrap();

		let zero = transfer_event(
			ChainKind::Ethereum,
			"0x5",
			"0xa",
			"0xb",
			"0",
			"0xf00d000000000000000000000000000000000001",
		);
		assert!(pipeline.execute(zero).await.unwrap().is_none());

		let high = transfer_event(
			ChainKind::Ethereum,
			"0x6",
			"0xa",
			"0xb",
			"50000",
			"0xf00d000000000000000000000000000000000001",
		);
		let processed = pipeline.execute(high).await.unwrap().unwrap();
		assert_eq!(
			processed.metadata.classification.unwrap().category,
			ValueCategory::HighValue
		);
	}

	#[tokio::test]
	async fn test_amount_filter_neutral_for_native_events_without_bounds_match() {
		let pipeline = EventPipeline::new(empty_resolver());
		pipeline
			.add_filter(Arc::new(AmountFilter::new(None, None)))
			.await
			.unwrap();

		let event = CanonicalEvent::new(
			ChainKind::Bitcoin,
			"f4184fc5",
			None,
			870_000,
			870_006,
			6,
			1_700_000_000_000,
			EventPayload::NativeTransfer(NativeTransferPayload {
				to: Some("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".into()),
				amount: "50000".into(),
				fee: Some("1000".into()),
				..Default::default()
			}),
		);
		let processed = pipeline.execute(event).await.unwrap().unwrap();
		assert_eq!(processed.original.data.amount(), Some("50000"));
		assert_eq!(processed.original.data.fee(), Some("1000"));
	}

	#[tokio::test]
	async fn test_channel_restriction_limits_fan_out() {
		let target = MonitoringTarget {
			notification_channels: Some(vec!["sink-b".into()]),
			..contract_target("restricted", "0xf00d000000000000000000000000000000000001")
		};
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![target]);
		let pipeline = EventPipeline::new(resolver);
		pipeline
			.add_notifier(Arc::new(RecordingNotifier {
				id: "sink-a",
				fail: false,
			}))
			.await
			.unwrap();
		pipeline
			.add_notifier(Arc::new(RecordingNotifier {
				id: "sink-b",
				fail: false,
			}))
			.await
			.unwrap();

		let event = transfer_event(
			ChainKind::Ethereum,
			"0x7",
			"0xa",
			"0xb",
			"1",
			"0xf00d000000000000000000000000000000000001",
		);
		let processed = pipeline.execute(event).await.unwrap().unwrap();
		assert_eq!(processed.notifications.len(), 1);
		assert_eq!(processed.notifications[0].channel, "sink-b");
	}

	#[tokio::test]
	async fn test_transfer_payload_defaults_are_absent_fields() {
		// A native transfer must not accidentally carry token fields
		let event = CanonicalEvent::new(
			ChainKind::Ethereum,
			"0x8",
			None,
			1,
			1,
			0,
			0,
			EventPayload::NativeTransfer(NativeTransferPayload {
				from: Some("0xa".into()),
				to: Some("0xb".into()),
				amount: "7".into(),
				..Default::default()
			}),
		);
		assert!(event.data.token_address().is_none());
		assert!(event.data.token_id().is_none());
		let serialized = serde_json::to_value(&event).unwrap();
		assert!(serialized["data"].get("token_address").is_none());
	}

	#[tokio::test]
	async fn test_wallet_transfer_payload_roundtrips_fields() {
		let event = transfer_event(
			ChainKind::Tron,
			"9f3b",
			"TJRabPrwbZy45sbavfcjinPJC18kjpRTv8",
			"TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
			"1000000",
			"TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
		);
		let serialized = serde_json::to_value(&event).unwrap();
		assert_eq!(serialized["chain"], "tron");
		assert_eq!(serialized["kind"], "transfer");
		assert_eq!(serialized["data"]["amount"], "1000000");
		assert_eq!(serialized["data"]["token_address"], "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t");
	}
}
