//! Standard event filters.
//!
//! A filter is a named, prioritized predicate over a canonical event. The
//! pipeline orders filters by descending priority and short-circuits on the
//! first rejection; a filter that errors counts as a rejection. Filters that
//! need per-target precedence receive the resolver explicitly.

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::PipelineError;
use crate::models::{CanonicalEvent, CustomRule, EventKind, RuleOperator, TargetPriority};
use crate::services::resolver::TargetConfigResolver;

/// A named, prioritized predicate over a canonical event
#[async_trait]
pub trait EventFilter: Send + Sync {
	fn id(&self) -> &str;
	fn name(&self) -> &str;
	fn enabled(&self) -> bool {
		true
	}
	/// Higher priority runs earlier
	fn priority(&self) -> i32;
	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError>;
}

/// Shared watch sets the facade mutates and the address/contract filters
/// read
#[derive(Debug, Default)]
pub struct WatchLists {
	pub addresses: RwLock<HashSet<String>>,
	pub fungible_contracts: RwLock<HashSet<String>>,
	pub nft_contracts: RwLock<HashSet<String>>,
}

impl WatchLists {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}
}

fn matches_set(set: &HashSet<String>, value: &str, case_insensitive: bool) -> bool {
	if case_insensitive {
		set.iter().any(|entry| entry.eq_ignore_ascii_case(value))
	} else {
		set.contains(value)
	}
}

/// Passes when `from` or `to` is in the configured address set. Priority 10.
///
/// Neutral when no addresses are configured, and defers contract-scoped
/// events (those carrying a token or contract address) to the contract
/// filter so the two watch categories compose as "either matches".
pub struct AddressFilter {
	lists: Arc<WatchLists>,
}

impl AddressFilter {
	pub fn new(lists: Arc<WatchLists>) -> Self {
		Self { lists }
	}
}

#[async_trait]
impl EventFilter for AddressFilter {
	fn id(&self) -> &str {
		"address_filter"
	}

	fn name(&self) -> &str {
		"Address filter"
	}

	fn priority(&self) -> i32 {
		10
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let addresses = self.lists.addresses.read().await;
		if addresses.is_empty() {
			return Ok(true);
		}
		let case_insensitive = event.chain.case_insensitive_addresses();
		let from_hit = event
			.data
			.from()
			.is_some_and(|a| matches_set(&addresses, a, case_insensitive));
		let to_hit = event
			.data
			.to()
			.is_some_and(|a| matches_set(&addresses, a, case_insensitive));
		if from_hit || to_hit {
			return Ok(true);
		}
		// Contract-scoped events are the contract filter's verdict
		Ok(event.data.token_address().is_some() || event.data.contract_address().is_some())
	}
}

/// Passes when the token or contract address is in either contract set.
/// Priority 9.
///
/// Neutral when no contracts are configured or the event carries no
/// contract; a transfer between watched addresses on an unwatched contract
/// still passes.
pub struct ContractFilter {
	lists: Arc<WatchLists>,
}

impl ContractFilter {
	pub fn new(lists: Arc<WatchLists>) -> Self {
		Self { lists }
	}
}

#[async_trait]
impl EventFilter for ContractFilter {
	fn id(&self) -> &str {
		"contract_filter"
	}

	fn name(&self) -> &str {
		"Contract filter"
	}

	fn priority(&self) -> i32 {
		9
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let fungible = self.lists.fungible_contracts.read().await;
		let nft = self.lists.nft_contracts.read().await;
		if fungible.is_empty() && nft.is_empty() {
			return Ok(true);
		}
		let candidate = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address());
		let Some(candidate) = candidate else {
			return Ok(true);
		};
		let case_insensitive = event.chain.case_insensitive_addresses();
		if matches_set(&fungible, candidate, case_insensitive)
			|| matches_set(&nft, candidate, case_insensitive)
		{
			return Ok(true);
		}
		let addresses = self.lists.addresses.read().await;
		let from_hit = event
			.data
			.from()
			.is_some_and(|a| matches_set(&addresses, a, case_insensitive));
		let to_hit = event
			.data
			.to()
			.is_some_and(|a| matches_set(&addresses, a, case_insensitive));
		Ok(from_hit || to_hit)
	}
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
	Decimal::from_str(raw).ok()
}

/// Passes when the decimal amount is inside `[min, max]`; an absent or
/// unparsable amount is neutral. Priority 8.
pub struct AmountFilter {
	min: Option<Decimal>,
	max: Option<Decimal>,
}

impl AmountFilter {
	pub fn new(min: Option<String>, max: Option<String>) -> Self {
		Self {
			min: min.as_deref().and_then(parse_decimal),
			max: max.as_deref().and_then(parse_decimal),
		}
	}
}

fn amount_within(amount: Option<&str>, min: Option<Decimal>, max: Option<Decimal>) -> bool {
	let Some(amount) = amount.and_then(parse_decimal) else {
		return true;
	};
	if let Some(min) = min {
		if amount < min {
			return false;
		}
	}
	if let Some(max) = max {
		if amount > max {
			return false;
		}
	}
	true
}

#[async_trait]
impl EventFilter for AmountFilter {
	fn id(&self) -> &str {
		"amount_filter"
	}

	fn name(&self) -> &str {
		"Amount filter"
	}

	fn priority(&self) -> i32 {
		8
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		Ok(amount_within(event.data.amount(), self.min, self.max))
	}
}

/// Target-aware amount filter: bounds come from the resolver, keyed by the
/// event's contract address. Priority 8.
pub struct TargetAmountFilter {
	resolver: Arc<TargetConfigResolver>,
}

impl TargetAmountFilter {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self { resolver }
	}
}

#[async_trait]
impl EventFilter for TargetAmountFilter {
	fn id(&self) -> &str {
		"target_amount_filter"
	}

	fn name(&self) -> &str {
		"Target-aware amount filter"
	}

	fn priority(&self) -> i32 {
		8
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let contract = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address())
			.unwrap_or("");
		let view = self.resolver.resolve(contract, event.chain).await;
		let min = view.min_amount.as_deref().and_then(parse_decimal);
		let max = view.max_amount.as_deref().and_then(parse_decimal);
		Ok(amount_within(event.data.amount(), min, max))
	}
}

/// Passes when the event kind is in the allowed set. Priority 7.
pub struct EventKindFilter {
	allowed: HashSet<EventKind>,
}

impl EventKindFilter {
	pub fn new(allowed: impl IntoIterator<Item = EventKind>) -> Self {
		Self {
			allowed: allowed.into_iter().collect(),
		}
	}
}

#[async_trait]
impl EventFilter for EventKindFilter {
	fn id(&self) -> &str {
		"event_kind_filter"
	}

	fn name(&self) -> &str {
		"Event kind filter"
	}

	fn priority(&self) -> i32 {
		7
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		Ok(self.allowed.contains(&event.kind))
	}
}

/// Rejects self-transfers when the resolved target view excludes them.
/// Priority 6.
pub struct SelfTransferFilter {
	resolver: Arc<TargetConfigResolver>,
}

impl SelfTransferFilter {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self { resolver }
	}
}

#[async_trait]
impl EventFilter for SelfTransferFilter {
	fn id(&self) -> &str {
		"self_transfer_filter"
	}

	fn name(&self) -> &str {
		"Self-transfer filter"
	}

	fn priority(&self) -> i32 {
		6
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let (Some(from), Some(to)) = (event.data.from(), event.data.to()) else {
			return Ok(true);
		};
		let contract = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address())
			.unwrap_or("");
		let view = self.resolver.resolve(contract, event.chain).await;
		if !view.exclude_self_transfers {
			return Ok(true);
		}
		let same = if event.chain.case_insensitive_addresses() {
			from.eq_ignore_ascii_case(to)
		} else {
			from == to
		};
		Ok(!same)
	}
}

/// Requires `confirmation_count >= required`. Priority 5.
pub struct ConfirmationFilter {
	required: u64,
}

impl ConfirmationFilter {
	pub fn new(required: u64) -> Self {
		Self { required }
	}
}

#[async_trait]
impl EventFilter for ConfirmationFilter {
	fn id(&self) -> &str {
		"confirmation_filter"
	}

	fn name(&self) -> &str {
		"Confirmation filter"
	}

	fn priority(&self) -> i32 {
		5
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		Ok(event.confirmation_count >= self.required)
	}
}

/// Optional timestamp window. Priority 4.
pub struct TimestampRangeFilter {
	min: Option<i64>,
	max: Option<i64>,
}

impl TimestampRangeFilter {
	pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
		Self { min, max }
	}
}

#[async_trait]
impl EventFilter for TimestampRangeFilter {
	fn id(&self) -> &str {
		"timestamp_range_filter"
	}

	fn name(&self) -> &str {
		"Timestamp range filter"
	}

	fn priority(&self) -> i32 {
		4
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		if let Some(min) = self.min {
			if event.timestamp < min {
				return Ok(false);
			}
		}
		if let Some(max) = self.max {
			if event.timestamp > max {
				return Ok(false);
			}
		}
		Ok(true)
	}
}

/// Requires the resolved target priority to meet a floor; events with no
/// contract pass. Priority 2.
pub struct PriorityFilter {
	resolver: Arc<TargetConfigResolver>,
	minimum: TargetPriority,
}

impl PriorityFilter {
	pub fn new(resolver: Arc<TargetConfigResolver>, minimum: TargetPriority) -> Self {
		Self { resolver, minimum }
	}
}

#[async_trait]
impl EventFilter for PriorityFilter {
	fn id(&self) -> &str {
		"priority_filter"
	}

	fn name(&self) -> &str {
		"Priority filter"
	}

	fn priority(&self) -> i32 {
		2
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let contract = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address());
		let Some(contract) = contract else {
			return Ok(true);
		};
		let view = self.resolver.resolve(contract, event.chain).await;
		Ok(view.priority >= self.minimum)
	}
}

/// Evaluates the resolved custom rules; all must pass. Priority 3.
pub struct CustomRulesFilter {
	resolver: Arc<TargetConfigResolver>,
}

impl CustomRulesFilter {
	pub fn new(resolver: Arc<TargetConfigResolver>) -> Self {
		Self { resolver }
	}
}

/// Field access with one level of `metadata.*` dot notation
fn field_value(event: &CanonicalEvent, field: &str) -> Option<serde_json::Value> {
	if let Some(key) = field.strip_prefix("metadata.") {
		return event.data.metadata().get(key).cloned();
	}
	match field {
		"amount" => event.data.amount().map(|a| a.into()),
		"from" => event.data.from().map(|a| a.into()),
		"to" => event.data.to().map(|a| a.into()),
		"token_address" => event.data.token_address().map(|a| a.into()),
		"contract_address" => event.data.contract_address().map(|a| a.into()),
		"token_id" => event.data.token_id().map(|a| a.into()),
		"event_type" | "kind" => Some(event.kind.as_str().into()),
		"chain" => Some(event.chain.as_str().into()),
		"tx_hash" => Some(event.tx_hash.as_str().into()),
		"block_number" => Some(event.block_number.into()),
		"confirmed" => Some(event.confirmed.into()),
		"confirmation_count" => Some(event.confirmation_count.into()),
		_ => None,
	}
}

fn value_as_string(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Evaluates one rule against an event; a missing field fails the rule
pub fn evaluate_rule(event: &CanonicalEvent, rule: &CustomRule) -> Result<bool, PipelineError> {
	let Some(actual) = field_value(event, &rule.field) else {
		return Ok(false);
	};
	let actual_str = value_as_string(&actual);
	let expected_str = value_as_string(&rule.value);

	match rule.operator {
		RuleOperator::Equals => {
			// Numeric forms compare numerically, everything else textually
			match (parse_decimal(&actual_str), parse_decimal(&expected_str)) {
				(Some(a), Some(b)) => Ok(a == b),
				_ => Ok(actual_str == expected_str),
			}
		}
		RuleOperator::NotEquals => {
			match (parse_decimal(&actual_str), parse_decimal(&expected_str)) {
				(Some(a), Some(b)) => Ok(a != b),
				_ => Ok(actual_str != expected_str),
			}
		}
		RuleOperator::GreaterThan => {
			match (parse_decimal(&actual_str), parse_decimal(&expected_str)) {
				(Some(a), Some(b)) => Ok(a > b),
				_ => Ok(false),
			}
		}
		RuleOperator::LessThan => {
			match (parse_decimal(&actual_str), parse_decimal(&expected_str)) {
				(Some(a), Some(b)) => Ok(a < b),
				_ => Ok(false),
			}
		}
		RuleOperator::Contains => Ok(actual_str.contains(&expected_str)),
		RuleOperator::Regex => {
			let regex = Regex::new(&expected_str).map_err(|e| {
				PipelineError::filter_error(format!("Bad rule regex '{}': {}", expected_str, e))
			})?;
			Ok(regex.is_match(&actual_str))
		}
	}
}

#[async_trait]
impl EventFilter for CustomRulesFilter {
	fn id(&self) -> &str {
		"custom_rules_filter"
	}

	fn name(&self) -> &str {
		"Custom rules filter"
	}

	fn priority(&self) -> i32 {
		3
	}

	async fn apply(&self, event: &CanonicalEvent) -> Result<bool, PipelineError> {
		let contract = event
			.data
			.token_address()
			.or_else(|| event.data.contract_address())
			.unwrap_or("");
		let view = self.resolver.resolve(contract, event.chain).await;
		for rule in &view.custom_rules {
			if !evaluate_rule(event, rule)? {
				return Ok(false);
			}
		}
		Ok(true)
	}
}
