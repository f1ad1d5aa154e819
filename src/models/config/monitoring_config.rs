//! Monitoring, target and filter-default configuration sections.

use serde::{Deserialize, Serialize};

use crate::models::MonitoringTarget;

/// One `[monitoring.<job>]` table (`transfers`, `token_minting`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringJobConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	#[serde(default = "default_polling_interval_ms")]
	pub polling_interval_ms: u64,
	#[serde(default = "default_confirmation_blocks")]
	pub confirmation_blocks: u64,
}

impl Default for MonitoringJobConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			batch_size: default_batch_size(),
			polling_interval_ms: default_polling_interval_ms(),
			confirmation_blocks: default_confirmation_blocks(),
		}
	}
}

/// `[monitoring]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitoringConfig {
	#[serde(default)]
	pub transfers: MonitoringJobConfig,
	#[serde(default)]
	pub token_minting: MonitoringJobConfig,
}

/// `[targets.addresses]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddressTargetsConfig {
	#[serde(default)]
	pub watch_addresses: Vec<String>,
}

/// `[targets.contracts]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractTargetsConfig {
	#[serde(default)]
	pub erc20_contracts: Vec<String>,
	#[serde(default)]
	pub erc721_contracts: Vec<String>,
	#[serde(default)]
	pub trc20_contracts: Vec<String>,
	#[serde(default)]
	pub trc721_contracts: Vec<String>,
	#[serde(default)]
	pub spl_token_programs: Vec<String>,
}

/// `[targets]` section, including the first-class enhanced target list
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetsConfig {
	#[serde(default)]
	pub addresses: AddressTargetsConfig,
	#[serde(default)]
	pub contracts: ContractTargetsConfig,
	#[serde(default)]
	pub enhanced_targets: Vec<MonitoringTarget>,
}

impl TargetsConfig {
	/// Every configured ERC-20-style contract address, across chain families
	pub fn fungible_contracts(&self) -> impl Iterator<Item = &String> {
		self.contracts
			.erc20_contracts
			.iter()
			.chain(self.contracts.trc20_contracts.iter())
	}

	/// Every configured ERC-721-style contract address, across chain families
	pub fn nft_contracts(&self) -> impl Iterator<Item = &String> {
		self.contracts
			.erc721_contracts
			.iter()
			.chain(self.contracts.trc721_contracts.iter())
	}
}

/// One `[filters.<job>]` table: global filter defaults the resolver overlays
/// per-target overrides on
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterDefaultsConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_amount: Option<String>,
	#[serde(default = "default_confirmation_blocks")]
	pub confirmation_blocks: u64,
	#[serde(default)]
	pub exclude_self_transfers: bool,
}

impl Default for FilterDefaultsConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			min_amount: None,
			max_amount: None,
			confirmation_blocks: default_confirmation_blocks(),
			exclude_self_transfers: false,
		}
	}
}

/// `[filters]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FiltersConfig {
	#[serde(default)]
	pub transfer: FilterDefaultsConfig,
	#[serde(default)]
	pub token_minting: FilterDefaultsConfig,
}

fn default_true() -> bool {
	true
}

fn default_batch_size() -> u32 {
	50
}

fn default_polling_interval_ms() -> u64 {
	1000
}

fn default_confirmation_blocks() -> u64 {
	1
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_fill_missing_tables() {
		let config: MonitoringConfig = toml::from_str("").unwrap();
		assert!(config.transfers.enabled);
		assert_eq!(config.transfers.batch_size, 50);
		assert_eq!(config.token_minting.polling_interval_ms, 1000);
	}

	#[test]
	fn test_contract_sets_merge_per_standard() {
		let raw = r#"
			[contracts]
			erc20_contracts = ["0xaaa"]
			trc20_contracts = ["TXYZ"]
			erc721_contracts = ["0xbbb"]
		"#;
		let config: TargetsConfig = toml::from_str(raw).unwrap();
		let fungible: Vec<_> = config.fungible_contracts().collect();
		assert_eq!(fungible, vec!["0xaaa", "TXYZ"]);
		let nft: Vec<_> = config.nft_contracts().collect();
		assert_eq!(nft, vec!["0xbbb"]);
	}

	#[test]
	fn test_enhanced_targets_decode() {
		let raw = r#"
			[[enhanced_targets]]
			id = "whale-1"
			type = "address"
			address = "0x1111111111111111111111111111111111111111"
			event_types = ["native_transfer"]
		"#;
		let config: TargetsConfig = toml::from_str(raw).unwrap();
		assert_eq!(config.enhanced_targets.len(), 1);
		assert_eq!(config.enhanced_targets[0].id, "whale-1");
	}
}
