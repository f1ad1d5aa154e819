//! Per-chain connection configuration.
//!
//! Decodes the `[chains.<name>]` tables of the TOML document. EVM chains
//! carry a chain id and confirmation depth; Solana carries a commitment
//! level; every chain carries an RPC URL and optional WebSocket URL.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::ChainKind;

/// Solana finality level a client asks for
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
	Processed,
	Confirmed,
	Finalized,
}

impl Default for Commitment {
	fn default() -> Self {
		Commitment::Confirmed
	}
}

impl Commitment {
	pub fn as_str(&self) -> &'static str {
		match self {
			Commitment::Processed => "processed",
			Commitment::Confirmed => "confirmed",
			Commitment::Finalized => "finalized",
		}
	}
}

/// One `[chains.<name>]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub rpc_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub websocket_url: Option<String>,
	#[serde(default = "default_max_retry_attempts")]
	pub max_retry_attempts: u32,
	/// EVM chains only
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
	/// EVM chains only; falls back to the chain's conventional depth
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_confirmation_count: Option<u64>,
	/// Solana only
	#[serde(skip_serializing_if = "Option::is_none")]
	pub commitment: Option<Commitment>,
}

fn default_max_retry_attempts() -> u32 {
	3
}

impl ChainConfig {
	/// Effective confirmation depth for the chain
	///
	/// Explicit `block_confirmation_count` wins; otherwise the conventional
	/// depth per chain family (Ethereum 12, BSC 6, Bitcoin 6, others 1).
	pub fn confirmations_for(&self, chain: ChainKind) -> u64 {
		self.block_confirmation_count.unwrap_or(match chain {
			ChainKind::Ethereum => 12,
			ChainKind::Bsc => 6,
			ChainKind::Bitcoin => 6,
			ChainKind::Solana | ChainKind::Sui | ChainKind::Tron => 1,
		})
	}

	pub fn validate(&self, chain: ChainKind) -> Result<(), String> {
		let rpc = Url::parse(&self.rpc_url)
			.map_err(|e| format!("Chain '{}': bad rpc_url: {}", chain, e))?;
		if !matches!(rpc.scheme(), "http" | "https") {
			return Err(format!(
				"Chain '{}': rpc_url must use http:// or https://",
				chain
			));
		}
		if let Some(ws) = &self.websocket_url {
			let ws = Url::parse(ws)
				.map_err(|e| format!("Chain '{}': bad websocket_url: {}", chain, e))?;
			if !matches!(ws.scheme(), "ws" | "wss") {
				return Err(format!(
					"Chain '{}': websocket_url must use ws:// or wss://",
					chain
				));
			}
		}
		match chain {
			ChainKind::Ethereum | ChainKind::Bsc => {
				if self.chain_id.is_none() {
					return Err(format!("Chain '{}': chain_id is required", chain));
				}
			}
			ChainKind::Solana => {}
			_ => {
				if self.commitment.is_some() {
					return Err(format!(
						"Chain '{}': commitment only applies to solana",
						chain
					));
				}
			}
		}
		if self.max_retry_attempts == 0 {
			return Err(format!(
				"Chain '{}': max_retry_attempts must be greater than 0",
				chain
			));
		}
		Ok(())
	}
}
