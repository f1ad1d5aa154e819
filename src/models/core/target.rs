//! Monitoring target model.
//!
//! A target is the user's declaration of interest: an address, a token
//! contract, or a token, together with the event kinds to watch and optional
//! per-target filter overrides that the resolver overlays on the global
//! defaults.

use serde::{Deserialize, Serialize};

use crate::models::core::chain::ChainKind;
use crate::models::core::event::EventKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
	Address,
	Contract,
	Token,
}

/// Relative importance of a target; orderable so filters can require a floor
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPriority {
	Low,
	Medium,
	High,
}

impl Default for TargetPriority {
	fn default() -> Self {
		TargetPriority::Medium
	}
}

/// Comparison operator of one custom rule
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
	Equals,
	NotEquals,
	GreaterThan,
	LessThan,
	Contains,
	Regex,
}

/// One `{field, operator, value}` predicate evaluated by the custom-rules
/// filter; `field` supports one level of `metadata.*` dot notation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CustomRule {
	pub field: String,
	pub operator: RuleOperator,
	pub value: serde_json::Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

/// Per-target filter overrides, overlaid field-by-field on the global
/// defaults by the resolver
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TargetFilterOverrides {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmation_blocks: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exclude_self_transfers: Option<bool>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub custom_rules: Vec<CustomRule>,
}

/// A user-declared object of monitoring interest
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringTarget {
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(rename = "type")]
	pub kind: TargetKind,
	/// Chain-native textual form; EVM comparisons lowercase it, other chains
	/// keep the exact form
	pub address: String,
	#[serde(rename = "event_types")]
	pub event_kinds: Vec<EventKind>,
	/// Restricts the target to these chains; absent means every chain whose
	/// adapter accepts the address
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chains: Option<Vec<ChainKind>>,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub priority: Option<TargetPriority>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notification_channels: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filters: Option<TargetFilterOverrides>,
}

fn default_enabled() -> bool {
	true
}

impl MonitoringTarget {
	/// Minimal target watching one address for the given event kinds
	pub fn new(
		id: impl Into<String>,
		kind: TargetKind,
		address: impl Into<String>,
		event_kinds: Vec<EventKind>,
	) -> Self {
		Self {
			id: id.into(),
			name: None,
			kind,
			address: address.into(),
			event_kinds,
			chains: None,
			enabled: true,
			priority: None,
			tags: Vec::new(),
			description: None,
			notification_channels: None,
			filters: None,
		}
	}

	/// Whether the target applies on the given chain
	pub fn applies_to_chain(&self, chain: ChainKind) -> bool {
		match &self.chains {
			Some(chains) => chains.contains(&chain),
			None => true,
		}
	}

	/// Targets with an empty event-kind set are rejected before registration
	pub fn validate(&self) -> Result<(), String> {
		if self.event_kinds.is_empty() {
			return Err(format!("Target '{}' has an empty event kind set", self.id));
		}
		if self.address.trim().is_empty() {
			return Err(format!("Target '{}' has an empty address", self.id));
		}
		Ok(())
	}
}
