//! Chain identification types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of chain families the listener can attach to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
	Ethereum,
	Bsc,
	Solana,
	Sui,
	Bitcoin,
	Tron,
}

impl ChainKind {
	/// All supported chain kinds, in declaration order
	pub fn all() -> &'static [ChainKind] {
		&[
			ChainKind::Ethereum,
			ChainKind::Bsc,
			ChainKind::Solana,
			ChainKind::Sui,
			ChainKind::Bitcoin,
			ChainKind::Tron,
		]
	}

	/// The lowercase identifier used in event ids and configuration tables
	pub fn as_str(&self) -> &'static str {
		match self {
			ChainKind::Ethereum => "ethereum",
			ChainKind::Bsc => "bsc",
			ChainKind::Solana => "solana",
			ChainKind::Sui => "sui",
			ChainKind::Bitcoin => "bitcoin",
			ChainKind::Tron => "tron",
		}
	}

	/// Whether addresses on this chain compare case-insensitively
	///
	/// EVM hex addresses are case-normalized before comparison; every other
	/// chain uses the exact textual form.
	pub fn case_insensitive_addresses(&self) -> bool {
		matches!(self, ChainKind::Ethereum | ChainKind::Bsc)
	}
}

impl fmt::Display for ChainKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for ChainKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"ethereum" | "eth" => Ok(ChainKind::Ethereum),
			"bsc" | "binance" => Ok(ChainKind::Bsc),
			"solana" | "sol" => Ok(ChainKind::Solana),
			"sui" => Ok(ChainKind::Sui),
			"bitcoin" | "btc" => Ok(ChainKind::Bitcoin),
			"tron" | "trx" => Ok(ChainKind::Tron),
			other => Err(format!("Unknown chain kind: {}", other)),
		}
	}
}
