//! Target configuration resolver.
//!
//! The sole reader of enhanced-target precedence: given a contract address
//! and chain it overlays that target's filter overrides field-by-field on
//! the global defaults and returns the resolved view. Initialized once from
//! configuration and mutated only through the listener facade; filters that
//! need it receive an `Arc` explicitly rather than reaching for a global.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{
	ChainKind, CustomRule, FilterDefaultsConfig, MonitoringTarget, TargetPriority,
};

/// Fully resolved filter view for one contract (or the global view when no
/// target matches)
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTargetConfig {
	pub min_amount: Option<String>,
	pub max_amount: Option<String>,
	pub confirmation_blocks: u64,
	pub exclude_self_transfers: bool,
	pub priority: TargetPriority,
	pub custom_rules: Vec<CustomRule>,
	pub notification_channels: Option<Vec<String>>,
}

/// Process-scoped registry of enhanced targets and global filter defaults
pub struct TargetConfigResolver {
	defaults: RwLock<FilterDefaultsConfig>,
	targets: RwLock<HashMap<String, MonitoringTarget>>,
}

impl TargetConfigResolver {
	pub fn new(
		defaults: FilterDefaultsConfig,
		targets: impl IntoIterator<Item = MonitoringTarget>,
	) -> Arc<Self> {
		let targets = targets
			.into_iter()
			.map(|t| (t.id.clone(), t))
			.collect::<HashMap<_, _>>();
		Arc::new(Self {
			defaults: RwLock::new(defaults),
			targets: RwLock::new(targets),
		})
	}

	/// The global view, used when no target matches
	async fn global_view(&self) -> ResolvedTargetConfig {
		let defaults = self.defaults.read().await;
		ResolvedTargetConfig {
			min_amount: defaults.min_amount.clone(),
			max_amount: defaults.max_amount.clone(),
			confirmation_blocks: defaults.confirmation_blocks,
			exclude_self_transfers: defaults.exclude_self_transfers,
			priority: TargetPriority::default(),
			custom_rules: Vec::new(),
			notification_channels: None,
		}
	}

	/// Resolves the filter view for a contract address on a chain
	///
	/// Per-target overrides win field-by-field over the global defaults. A
	/// target restricted to other chains is invisible here and the global
	/// view is returned.
	pub async fn resolve(&self, contract_address: &str, chain: ChainKind) -> ResolvedTargetConfig {
		let targets = self.targets.read().await;
		let case_insensitive = chain.case_insensitive_addresses();
		let matched = targets.values().find(|t| {
			let address_matches = if case_insensitive {
				t.address.eq_ignore_ascii_case(contract_address)
			} else {
				t.address == contract_address
			};
			address_matches && t.enabled
		});

		let Some(target) = matched else {
			return self.global_view().await;
		};
		if !target.applies_to_chain(chain) {
			return self.global_view().await;
		}

		let mut view = self.global_view().await;
		view.priority = target.priority.unwrap_or_default();
		view.notification_channels = target.notification_channels.clone();
		if let Some(overrides) = &target.filters {
			if overrides.min_amount.is_some() {
				view.min_amount = overrides.min_amount.clone();
			}
			if overrides.max_amount.is_some() {
				view.max_amount = overrides.max_amount.clone();
			}
			if let Some(confirmations) = overrides.confirmation_blocks {
				view.confirmation_blocks = confirmations;
			}
			if let Some(exclude) = overrides.exclude_self_transfers {
				view.exclude_self_transfers = exclude;
			}
			view.custom_rules = overrides.custom_rules.clone();
		}
		view
	}

	/// Finds the enabled target declaring an address, honoring the chain's
	/// case rule and any chain restriction
	pub async fn target_for_address(
		&self,
		address: &str,
		chain: ChainKind,
	) -> Option<MonitoringTarget> {
		let targets = self.targets.read().await;
		let case_insensitive = chain.case_insensitive_addresses();
		targets
			.values()
			.find(|t| {
				let address_matches = if case_insensitive {
					t.address.eq_ignore_ascii_case(address)
				} else {
					t.address == address
				};
				address_matches && t.enabled && t.applies_to_chain(chain)
			})
			.cloned()
	}

	/// Registers or replaces a target by id
	pub async fn upsert_target(&self, target: MonitoringTarget) {
		self.targets
			.write()
			.await
			.insert(target.id.clone(), target);
	}

	pub async fn remove_target(&self, id: &str) -> Option<MonitoringTarget> {
		self.targets.write().await.remove(id)
	}

	pub async fn get_target(&self, id: &str) -> Option<MonitoringTarget> {
		self.targets.read().await.get(id).cloned()
	}

	pub async fn all_targets(&self) -> Vec<MonitoringTarget> {
		self.targets.read().await.values().cloned().collect()
	}

	pub async fn set_defaults(&self, defaults: FilterDefaultsConfig) {
		*self.defaults.write().await = defaults;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{EventKind, RuleOperator, TargetFilterOverrides, TargetKind};

	fn defaults() -> FilterDefaultsConfig {
		FilterDefaultsConfig {
			enabled: true,
			min_amount: Some("100".into()),
			max_amount: None,
			confirmation_blocks: 3,
			exclude_self_transfers: false,
		}
	}

	fn usdc_target() -> MonitoringTarget {
		MonitoringTarget {
			priority: Some(TargetPriority::High),
			chains: Some(vec![ChainKind::Ethereum]),
			filters: Some(TargetFilterOverrides {
				min_amount: Some("5000".into()),
				max_amount: None,
				confirmation_blocks: None,
				exclude_self_transfers: Some(true),
				custom_rules: vec![CustomRule {
					field: "amount".into(),
					operator: RuleOperator::GreaterThan,
					value: serde_json::json!("0"),
					description: None,
				}],
			}),
			..MonitoringTarget::new(
				"usdc",
				TargetKind::Contract,
				"0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
				vec![EventKind::Transfer],
			)
		}
	}

	#[tokio::test]
	async fn test_overrides_overlay_defaults_field_by_field() {
		let resolver = TargetConfigResolver::new(defaults(), vec![usdc_target()]);
		let view = resolver
			.resolve(
				"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
				ChainKind::Ethereum,
			)
			.await;
		// Overridden
		assert_eq!(view.min_amount.as_deref(), Some("5000"));
		assert!(view.exclude_self_transfers);
		assert_eq!(view.priority, TargetPriority::High);
		assert_eq!(view.custom_rules.len(), 1);
		// Inherited
		assert_eq!(view.confirmation_blocks, 3);
		assert_eq!(view.max_amount, None);
	}

	#[tokio::test]
	async fn test_chain_restriction_falls_back_to_globals() {
		let resolver = TargetConfigResolver::new(defaults(), vec![usdc_target()]);
		let view = resolver
			.resolve(
				"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
				ChainKind::Bsc,
			)
			.await;
		assert_eq!(view.min_amount.as_deref(), Some("100"));
		assert_eq!(view.priority, TargetPriority::Medium);
		assert!(view.custom_rules.is_empty());
	}

	#[tokio::test]
	async fn test_unknown_contract_gets_global_view() {
		let resolver = TargetConfigResolver::new(defaults(), vec![usdc_target()]);
		let view = resolver.resolve("0xdeadbeef", ChainKind::Ethereum).await;
		assert_eq!(view.min_amount.as_deref(), Some("100"));
		assert_eq!(view.confirmation_blocks, 3);
	}

	#[tokio::test]
	async fn test_exact_match_for_case_sensitive_chains() {
		let mut target = usdc_target();
		target.chains = None;
		target.address = "ExactCaseMint111111111111111111111111111111".into();
		let resolver = TargetConfigResolver::new(defaults(), vec![target]);

		let hit = resolver
			.resolve(
				"ExactCaseMint111111111111111111111111111111",
				ChainKind::Solana,
			)
			.await;
		assert_eq!(hit.priority, TargetPriority::High);

		let miss = resolver
			.resolve(
				"exactcasemint111111111111111111111111111111",
				ChainKind::Solana,
			)
			.await;
		assert_eq!(miss.priority, TargetPriority::Medium);
	}

	#[tokio::test]
	async fn test_mutation_through_upsert_and_remove() {
		let resolver = TargetConfigResolver::new(defaults(), vec![]);
		resolver.upsert_target(usdc_target()).await;
		assert!(resolver.get_target("usdc").await.is_some());
		assert!(resolver.remove_target("usdc").await.is_some());
		assert!(resolver.get_target("usdc").await.is_none());
	}
}
