//! Application configuration: a single TOML document decoded into statically
//! shaped sections, validated as a whole before the listener starts.

use std::collections::HashMap;
use std::path::Path;

mod chain_config;
mod error;
mod monitoring_config;
mod notification_config;

pub use chain_config::{ChainConfig, Commitment};
pub use error::ConfigError;
pub use monitoring_config::{
	AddressTargetsConfig, ContractTargetsConfig, FilterDefaultsConfig, FiltersConfig,
	MonitoringConfig, MonitoringJobConfig, TargetsConfig,
};
pub use notification_config::{
	DatabaseConfig, LogFormat, LogLevel, LoggingConfig, NotificationChannel, NotificationsConfig,
	PerformanceConfig,
};

use crate::models::ChainKind;

/// The whole configuration document
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct AppConfig {
	#[serde(default)]
	pub database: DatabaseConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
	#[serde(default)]
	pub chains: HashMap<ChainKind, ChainConfig>,
	#[serde(default)]
	pub monitoring: MonitoringConfig,
	#[serde(default)]
	pub targets: TargetsConfig,
	#[serde(default)]
	pub filters: FiltersConfig,
	#[serde(default)]
	pub notifications: NotificationsConfig,
	#[serde(default)]
	pub performance: PerformanceConfig,
}

impl AppConfig {
	/// Load and validate a configuration file
	///
	/// Fatal at startup: any decode or validation failure is returned as a
	/// [`ConfigError`] and the caller is expected to abort.
	pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		let config: AppConfig = toml::from_str(&raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Validate every section after decode
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.chains.is_empty() {
			return Err(ConfigError::validation_error(
				"At least one [chains.<name>] table is required",
			));
		}
		for (chain, config) in &self.chains {
			config
				.validate(*chain)
				.map_err(ConfigError::validation_error)?;
		}
		self.notifications
			.validate()
			.map_err(ConfigError::validation_error)?;
		for target in &self.targets.enhanced_targets {
			target.validate().map_err(ConfigError::validation_error)?;
		}
		let mut seen = std::collections::HashSet::new();
		for target in &self.targets.enhanced_targets {
			if !seen.insert(target.id.as_str()) {
				return Err(ConfigError::validation_error(format!(
					"Duplicate enhanced target id '{}'",
					target.id
				)));
			}
		}
		if self.performance.request_timeout_ms == 0 {
			return Err(ConfigError::validation_error(
				"performance.request_timeout_ms must be greater than 0",
			));
		}
		Ok(())
	}

	pub fn chain(&self, chain: ChainKind) -> Option<&ChainConfig> {
		self.chains.get(&chain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"
		[database]
		redis_url = "redis://localhost:6379"
		connection_pool_size = 8

		[logging]
		level = "debug"
		format = "json"
		correlation_tracking = true

		[chains.ethereum]
		rpc_url = "https://eth.example.com"
		websocket_url = "wss://eth.example.com/ws"
		chain_id = 1
		block_confirmation_count = 12

		[chains.solana]
		rpc_url = "https://sol.example.com"
		websocket_url = "wss://sol.example.com"
		commitment = "finalized"

		[monitoring.transfers]
		enabled = true
		batch_size = 25
		polling_interval_ms = 500
		confirmation_blocks = 6

		[targets.addresses]
		watch_addresses = ["0x1111111111111111111111111111111111111111"]

		[targets.contracts]
		erc20_contracts = ["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"]

		[[targets.enhanced_targets]]
		id = "usdc"
		type = "contract"
		address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
		event_types = ["transfer"]

		[filters.transfer]
		min_amount = "100"
		confirmation_blocks = 3

		[notifications]
		enabled = true
		channels = ["webhook"]
		webhook_url = "https://hooks.example.com/in"

		[performance]
		worker_pool_size = 2
	"#;

	#[test]
	fn test_full_document_decodes_and_validates() {
		let config: AppConfig = toml::from_str(SAMPLE).unwrap();
		config.validate().unwrap();
		assert_eq!(config.chains.len(), 2);
		assert_eq!(
			config.chain(ChainKind::Solana).unwrap().commitment,
			Some(Commitment::Finalized)
		);
		assert_eq!(config.filters.transfer.min_amount.as_deref(), Some("100"));
		assert_eq!(config.monitoring.transfers.batch_size, 25);
	}

	#[test]
	fn test_empty_chains_rejected() {
		let config: AppConfig = toml::from_str("").unwrap();
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_duplicate_enhanced_target_ids_rejected() {
		let raw = format!(
			"{}\n{}",
			SAMPLE,
			r#"
			[[targets.enhanced_targets]]
			id = "usdc"
			type = "contract"
			address = "0xdac17f958d2ee523a2206206994597c13d831ec7"
			event_types = ["transfer"]
			"#
		);
		let config: AppConfig = toml::from_str(&raw).unwrap();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("Duplicate enhanced target id"));
	}

	#[test]
	fn test_malformed_target_rejected() {
		let raw = SAMPLE.replace(r#"event_types = ["transfer"]"#, "event_types = []");
		let config: AppConfig = toml::from_str(&raw).unwrap();
		assert!(config.validate().is_err());
	}
}
