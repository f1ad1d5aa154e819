//! Canonical event model.
//!
//! Every chain adapter, regardless of source, translates its native
//! observations into [`CanonicalEvent`] records. This is the only type that
//! crosses the adapter → pipeline boundary. The payload is a tagged union on
//! the event kind so that fields a kind does not use are absent rather than
//! nullable.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::core::chain::ChainKind;

/// Closed set of event kinds the pipeline understands
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	Transfer,
	NativeTransfer,
	TokenMint,
	TokenBurn,
	NftTransfer,
	NftMint,
	ContractCreation,
}

impl EventKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::Transfer => "transfer",
			EventKind::NativeTransfer => "native_transfer",
			EventKind::TokenMint => "token_mint",
			EventKind::TokenBurn => "token_burn",
			EventKind::NftTransfer => "nft_transfer",
			EventKind::NftMint => "nft_mint",
			EventKind::ContractCreation => "contract_creation",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Free-form metadata map attached to event payloads
pub type EventMetadata = HashMap<String, serde_json::Value>;

/// Token movement between two parties (ERC-20/SPL/TRC-20 style)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_symbol: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_decimals: Option<u32>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Native coin movement (ETH/BNB value, lamports, satoshis, TRX)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NativeTransferPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	/// Base units (wei, lamports, satoshis, sun, MIST), base-10
	pub amount: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fee: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gas_used: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Supply increase on a token contract or mint account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenMintPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub minter: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_symbol: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_decimals: Option<u32>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Supply decrease on a token contract
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenBurnPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_symbol: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_decimals: Option<u32>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Non-fungible token movement (ERC-721 style, token id instead of amount)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NftTransferPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Non-fungible token mint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NftMintPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// New contract or package deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractCreationPayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creator: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub metadata: EventMetadata,
}

/// Kind-tagged event payload
///
/// The variant determines the event kind; constructing a [`CanonicalEvent`]
/// derives its `kind` field from the payload, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
	Transfer(TransferPayload),
	NativeTransfer(NativeTransferPayload),
	TokenMint(TokenMintPayload),
	TokenBurn(TokenBurnPayload),
	NftTransfer(NftTransferPayload),
	NftMint(NftMintPayload),
	ContractCreation(ContractCreationPayload),
}

impl EventPayload {
	pub fn kind(&self) -> EventKind {
		match self {
			EventPayload::Transfer(_) => EventKind::Transfer,
			EventPayload::NativeTransfer(_) => EventKind::NativeTransfer,
			EventPayload::TokenMint(_) => EventKind::TokenMint,
			EventPayload::TokenBurn(_) => EventKind::TokenBurn,
			EventPayload::NftTransfer(_) => EventKind::NftTransfer,
			EventPayload::NftMint(_) => EventKind::NftMint,
			EventPayload::ContractCreation(_) => EventKind::ContractCreation,
		}
	}

	/// Sending party, where the kind has one
	pub fn from(&self) -> Option<&str> {
		match self {
			EventPayload::Transfer(p) => p.from.as_deref(),
			EventPayload::NativeTransfer(p) => p.from.as_deref(),
			EventPayload::TokenBurn(p) => p.from.as_deref(),
			EventPayload::NftTransfer(p) => p.from.as_deref(),
			EventPayload::ContractCreation(p) => p.creator.as_deref(),
			_ => None,
		}
	}

	/// Receiving party, where the kind has one
	pub fn to(&self) -> Option<&str> {
		match self {
			EventPayload::Transfer(p) => p.to.as_deref(),
			EventPayload::NativeTransfer(p) => p.to.as_deref(),
			EventPayload::TokenMint(p) => p.to.as_deref(),
			EventPayload::NftTransfer(p) => p.to.as_deref(),
			EventPayload::NftMint(p) => p.to.as_deref(),
			_ => None,
		}
	}

	/// Decimal amount string, where the kind carries value
	pub fn amount(&self) -> Option<&str> {
		match self {
			EventPayload::Transfer(p) => p.amount.as_deref(),
			EventPayload::NativeTransfer(p) => Some(p.amount.as_str()),
			EventPayload::TokenMint(p) => p.amount.as_deref(),
			EventPayload::TokenBurn(p) => p.amount.as_deref(),
			_ => None,
		}
	}

	pub fn token_address(&self) -> Option<&str> {
		match self {
			EventPayload::Transfer(p) => p.token_address.as_deref(),
			EventPayload::TokenMint(p) => p.token_address.as_deref(),
			EventPayload::TokenBurn(p) => p.token_address.as_deref(),
			_ => None,
		}
	}

	pub fn contract_address(&self) -> Option<&str> {
		match self {
			EventPayload::NftTransfer(p) => p.contract_address.as_deref(),
			EventPayload::NftMint(p) => p.contract_address.as_deref(),
			EventPayload::ContractCreation(p) => p.contract_address.as_deref(),
			_ => None,
		}
	}

	pub fn token_id(&self) -> Option<&str> {
		match self {
			EventPayload::NftTransfer(p) => p.token_id.as_deref(),
			EventPayload::NftMint(p) => p.token_id.as_deref(),
			_ => None,
		}
	}

	pub fn token_decimals(&self) -> Option<u32> {
		match self {
			EventPayload::Transfer(p) => p.token_decimals,
			EventPayload::TokenMint(p) => p.token_decimals,
			EventPayload::TokenBurn(p) => p.token_decimals,
			_ => None,
		}
	}

	pub fn fee(&self) -> Option<&str> {
		match self {
			EventPayload::NativeTransfer(p) => p.fee.as_deref(),
			_ => None,
		}
	}

	pub fn metadata(&self) -> &EventMetadata {
		match self {
			EventPayload::Transfer(p) => &p.metadata,
			EventPayload::NativeTransfer(p) => &p.metadata,
			EventPayload::TokenMint(p) => &p.metadata,
			EventPayload::TokenBurn(p) => &p.metadata,
			EventPayload::NftTransfer(p) => &p.metadata,
			EventPayload::NftMint(p) => &p.metadata,
			EventPayload::ContractCreation(p) => &p.metadata,
		}
	}

	pub fn metadata_mut(&mut self) -> &mut EventMetadata {
		match self {
			EventPayload::Transfer(p) => &mut p.metadata,
			EventPayload::NativeTransfer(p) => &mut p.metadata,
			EventPayload::TokenMint(p) => &mut p.metadata,
			EventPayload::TokenBurn(p) => &mut p.metadata,
			EventPayload::NftTransfer(p) => &mut p.metadata,
			EventPayload::NftMint(p) => &mut p.metadata,
			EventPayload::ContractCreation(p) => &mut p.metadata,
		}
	}
}

/// The single record shape every adapter emits and the pipeline consumes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
	/// `<chain>_<tx_hash>[_<sub_index>]`, unique per physical observation
	/// within a process lifetime
	pub id: String,
	pub chain: ChainKind,
	pub kind: EventKind,
	/// Block / slot / checkpoint / height, per chain semantics
	pub block_number: u64,
	pub tx_hash: String,
	/// Unix milliseconds
	pub timestamp: i64,
	pub confirmed: bool,
	/// `current_tip - block_number` at emission time, never negative
	pub confirmation_count: u64,
	pub data: EventPayload,
}

impl CanonicalEvent {
	/// Builds an event with its id derived from chain and transaction hash
	///
	/// `sub_index` disambiguates multiple observations in one transaction
	/// (log index, event sequence, output index).
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		chain: ChainKind,
		tx_hash: impl Into<String>,
		sub_index: Option<u64>,
		block_number: u64,
		tip: u64,
		required_confirmations: u64,
		timestamp: i64,
		data: EventPayload,
	) -> Self {
		let tx_hash = tx_hash.into();
		let id = match sub_index {
			Some(idx) => format!("{}_{}_{}", chain, tx_hash, idx),
			None => format!("{}_{}", chain, tx_hash),
		};
		let confirmation_count = tip.saturating_sub(block_number);
		Self {
			id,
			chain,
			kind: data.kind(),
			block_number,
			tx_hash,
			timestamp,
			confirmed: confirmation_count >= required_confirmations,
			confirmation_count,
			data,
		}
	}

	/// Builds a synthetic event that has no transaction hash of its own
	/// (account-change pushes). The id stays stable for the same underlying
	/// observation: `<kind>_<address>_<block>`.
	pub fn synthetic(
		chain: ChainKind,
		address: &str,
		block_number: u64,
		tip: u64,
		required_confirmations: u64,
		timestamp: i64,
		data: EventPayload,
	) -> Self {
		let kind = data.kind();
		let id = format!("{}_{}_{}_{}", chain, kind, address, block_number);
		let confirmation_count = tip.saturating_sub(block_number);
		Self {
			id,
			chain,
			kind,
			block_number,
			tx_hash: format!("{}_{}_{}", kind, address, block_number),
			timestamp,
			confirmed: confirmation_count >= required_confirmations,
			confirmation_count,
			data,
		}
	}
}

/// Formats a base-unit integer amount with the given decimals, trimming
/// trailing zeros (and a trailing dot) from the fractional part.
///
/// `format_units("1500", 2)` → `"15"`, `format_units("1050", 2)` → `"10.5"`.
pub fn format_units(raw: &str, decimals: u32) -> String {
	if decimals == 0 {
		return raw.to_string();
	}
	let negative = raw.starts_with('-');
	let digits = raw.trim_start_matches('-');
	let decimals = decimals as usize;
	let padded = if digits.len() <= decimals {
		format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
	} else {
		digits.to_string()
	};
	let split = padded.len() - decimals;
	let whole = &padded[..split];
	let frac = padded[split..].trim_end_matches('0');
	let formatted = if frac.is_empty() {
		whole.to_string()
	} else {
		format!("{}.{}", whole, frac)
	};
	if negative {
		format!("-{}", formatted)
	} else {
		formatted
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_id_format() {
		let event = CanonicalEvent::new(
			ChainKind::Ethereum,
			"0xabc",
			Some(3),
			100,
			106,
			6,
			1_700_000_000_000,
			EventPayload::Transfer(TransferPayload::default()),
		);
		assert_eq!(event.id, "ethereum_0xabc_3");
		assert_eq!(event.kind, EventKind::Transfer);
		assert_eq!(event.confirmation_count, 6);
		assert!(event.confirmed);
	}

	#[test]
	fn test_confirmation_count_never_negative() {
		// Tip briefly behind the observed block must clamp at zero
		let event = CanonicalEvent::new(
			ChainKind::Bsc,
			"0xdef",
			None,
			200,
			198,
			6,
			0,
			EventPayload::Transfer(TransferPayload::default()),
		);
		assert_eq!(event.confirmation_count, 0);
		assert!(!event.confirmed);
	}

	#[test]
	fn test_synthetic_id_is_stable() {
		let make = || {
			CanonicalEvent::synthetic(
				ChainKind::Solana,
				"So11111111111111111111111111111111111111112",
				5000,
				5000,
				1,
				0,
				EventPayload::Transfer(TransferPayload::default()),
			)
		};
		assert_eq!(make().id, make().id);
	}

	#[test]
	fn test_kind_follows_payload() {
		let event = CanonicalEvent::new(
			ChainKind::Sui,
			"digest",
			Some(0),
			10,
			10,
			0,
			0,
			EventPayload::TokenMint(TokenMintPayload {
				amount: Some("5".into()),
				..Default::default()
			}),
		);
		assert_eq!(event.kind, EventKind::TokenMint);
	}

	#[test]
	fn test_format_units() {
		assert_eq!(format_units("1000000000000000000", 18), "1");
		assert_eq!(format_units("1500", 2), "15");
		assert_eq!(format_units("1050", 2), "10.5");
		assert_eq!(format_units("5", 2), "0.05");
		assert_eq!(format_units("500", 0), "500");
		assert_eq!(format_units("0", 6), "0");
		assert_eq!(format_units("-1050", 2), "-10.5");
	}
}
