//! Mint supply cache for token-mint detection.
//!
//! Solana has no mint event to subscribe to; the adapter instead caches the
//! last known supply of each watched mint account and diffs it on every
//! account change. A supply increase is a mint, a decrease is not reported
//! here (burns flow through the program-log parser).

use std::collections::HashMap;

use crate::models::format_units;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MintInfo {
	pub supply: u64,
	pub decimals: u32,
}

/// Per-adapter cache keyed by mint address
#[derive(Debug, Default)]
pub struct MintSupplyCache {
	entries: HashMap<String, MintInfo>,
}

impl MintSupplyCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a fresh observation and returns the formatted minted amount
	/// when the supply increased
	///
	/// The first observation of a mint only seeds the cache. The cache is
	/// always updated, so a decrease resets the baseline.
	pub fn observe(&mut self, mint: &str, info: MintInfo) -> Option<String> {
		let previous = self.entries.insert(mint.to_string(), info);
		match previous {
			Some(old) if info.supply > old.supply => {
				let delta = info.supply - old.supply;
				Some(format_units(&delta.to_string(), info.decimals))
			}
			_ => None,
		}
	}

	pub fn get(&self, mint: &str) -> Option<&MintInfo> {
		self.entries.get(mint)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_first_observation_seeds_only() {
		let mut cache = MintSupplyCache::new();
		assert_eq!(
			cache.observe(
				"mint1",
				MintInfo {
					supply: 1000,
					decimals: 2
				}
			),
			None
		);
		assert_eq!(cache.get("mint1").unwrap().supply, 1000);
	}

	#[test]
	fn test_supply_increase_emits_formatted_delta() {
		let mut cache = MintSupplyCache::new();
		cache.observe(
			"mint1",
			MintInfo {
				supply: 1000,
				decimals: 2,
			},
		);
		let minted = cache.observe(
			"mint1",
			MintInfo {
				supply: 1500,
				decimals: 2,
			},
		);
		assert_eq!(minted.as_deref(), Some("5"));
		assert_eq!(cache.get("mint1").unwrap().supply, 1500);
	}

	#[test]
	fn test_supply_decrease_or_equal_is_silent() {
		let mut cache = MintSupplyCache::new();
		cache.observe(
			"mint1",
			MintInfo {
				supply: 1000,
				decimals: 2,
			},
		);
		assert_eq!(
			cache.observe(
				"mint1",
				MintInfo {
					supply: 1000,
					decimals: 2
				}
			),
			None
		);
		assert_eq!(
			cache.observe(
				"mint1",
				MintInfo {
					supply: 400,
					decimals: 2
				}
			),
			None
		);
		// The decreased supply became the new baseline
		let minted = cache.observe(
			"mint1",
			MintInfo {
				supply: 500,
				decimals: 2,
			},
		);
		assert_eq!(minted.as_deref(), Some("1"));
	}
}
