//! EVM log decoding helpers.
//!
//! ERC-20 and ERC-721 share the Transfer event signature; the two are told
//! apart by where the third parameter lives. ERC-20 puts the amount in the
//! data section, ERC-721 indexes the token id as topic 3 and leaves the data
//! empty.

use serde_json::Value;
use web3::types::{H160, H256, U256};

use crate::services::adapter::error::AdapterError;

/// keccak-256 of `Transfer(address,address,uint256)`
pub const ERC20_TRANSFER_TOPIC: &str =
	"0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// keccak-256 of `Mint(address,uint256)`, the most common explicit mint event
pub const MINT_EVENT_TOPIC: &str =
	"0x0f6798a560793a54c3bcfe86a93cde1e73087d944c0ea20544137d4121396885";

/// Known explicit mint event signatures, checked in addition to
/// zero-address transfers
pub const KNOWN_MINT_TOPICS: &[&str] = &[MINT_EVENT_TOPIC];

pub fn h256_to_string(hash: H256) -> String {
	format!("0x{}", hex::encode(hash.as_bytes()))
}

pub fn string_to_h256(hash_string: &str) -> Result<H256, AdapterError> {
	let without_prefix = hash_string.strip_prefix("0x").unwrap_or(hash_string);
	let bytes = hex::decode(without_prefix)
		.map_err(|e| AdapterError::protocol_error(format!("Bad hash '{}': {}", hash_string, e)))?;
	if bytes.len() != 32 {
		return Err(AdapterError::protocol_error(format!(
			"Hash '{}' is {} bytes, expected 32",
			hash_string,
			bytes.len()
		)));
	}
	Ok(H256::from_slice(&bytes))
}

pub fn h160_to_string(address: H160) -> String {
	format!("0x{}", hex::encode(address.as_bytes()))
}

/// Lower 20 bytes of an indexed address topic
pub fn topic_to_address(topic: H256) -> String {
	h160_to_string(H160::from_slice(&topic.as_bytes()[12..]))
}

/// Pads an address into the 32-byte indexed-topic form
pub fn address_to_topic(address: &str) -> Result<H256, AdapterError> {
	let without_prefix = address.strip_prefix("0x").unwrap_or(address);
	let bytes = hex::decode(without_prefix).map_err(|e| {
		AdapterError::validation_error(format!("Bad address '{}': {}", address, e))
	})?;
	if bytes.len() != 20 {
		return Err(AdapterError::validation_error(format!(
			"Address '{}' is {} bytes, expected 20",
			address,
			bytes.len()
		)));
	}
	let mut padded = [0u8; 32];
	padded[12..].copy_from_slice(&bytes);
	Ok(H256::from(padded))
}

pub fn normalize_address(address: &str) -> String {
	address.trim().to_lowercase()
}

pub fn are_same_address(a: &str, b: &str) -> bool {
	normalize_address(a) == normalize_address(b)
}

pub fn is_zero_address(address: &str) -> bool {
	let without_prefix = address.strip_prefix("0x").unwrap_or(address);
	!without_prefix.is_empty() && without_prefix.chars().all(|c| c == '0')
}

/// Parses a 0x-prefixed hex quantity into u64
pub fn parse_quantity(raw: &str) -> Result<u64, AdapterError> {
	let without_prefix = raw.strip_prefix("0x").unwrap_or(raw);
	u64::from_str_radix(without_prefix, 16)
		.map_err(|e| AdapterError::protocol_error(format!("Bad quantity '{}': {}", raw, e)))
}

/// Parses a 0x-prefixed hex quantity into U256
pub fn parse_u256(raw: &str) -> Result<U256, AdapterError> {
	let without_prefix = raw.strip_prefix("0x").unwrap_or(raw);
	if without_prefix.is_empty() {
		return Ok(U256::zero());
	}
	U256::from_str_radix(without_prefix, 16)
		.map_err(|e| AdapterError::protocol_error(format!("Bad quantity '{}': {}", raw, e)))
}

/// One log entry as delivered by `eth_subscribe`/`eth_getLogs`
#[derive(Debug, Clone)]
pub struct EvmLog {
	pub address: String,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
	pub block_number: u64,
	pub tx_hash: String,
	pub log_index: u64,
}

impl EvmLog {
	pub fn from_value(value: &Value) -> Result<Self, AdapterError> {
		let address = value
			.get("address")
			.and_then(Value::as_str)
			.ok_or_else(|| AdapterError::protocol_error("Log missing address"))?
			.to_lowercase();
		let topics = value
			.get("topics")
			.and_then(Value::as_array)
			.ok_or_else(|| AdapterError::protocol_error("Log missing topics"))?
			.iter()
			.map(|t| {
				t.as_str()
					.ok_or_else(|| AdapterError::protocol_error("Non-string topic"))
					.and_then(string_to_h256)
			})
			.collect::<Result<Vec<_>, _>>()?;
		let data_hex = value.get("data").and_then(Value::as_str).unwrap_or("0x");
		let data = hex::decode(data_hex.strip_prefix("0x").unwrap_or(data_hex))
			.map_err(|e| AdapterError::protocol_error(format!("Bad log data: {}", e)))?;
		let block_number = value
			.get("blockNumber")
			.and_then(Value::as_str)
			.map(parse_quantity)
			.transpose()?
			.ok_or_else(|| AdapterError::protocol_error("Log missing blockNumber"))?;
		let tx_hash = value
			.get("transactionHash")
			.and_then(Value::as_str)
			.ok_or_else(|| AdapterError::protocol_error("Log missing transactionHash"))?
			.to_string();
		let log_index = value
			.get("logIndex")
			.and_then(Value::as_str)
			.map(parse_quantity)
			.transpose()?
			.unwrap_or(0);
		Ok(Self {
			address,
			topics,
			data,
			block_number,
			tx_hash,
			log_index,
		})
	}

	pub fn topic0(&self) -> Option<String> {
		self.topics.first().map(|t| h256_to_string(*t))
	}

	pub fn is_transfer(&self) -> bool {
		self.topic0().as_deref() == Some(ERC20_TRANSFER_TOPIC)
	}

	pub fn is_known_mint_signature(&self) -> bool {
		match self.topic0() {
			Some(topic) => KNOWN_MINT_TOPICS.contains(&topic.as_str()),
			None => false,
		}
	}
}

/// Decoded Transfer event, either fungible or NFT
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransfer {
	pub from: String,
	pub to: String,
	/// Fungible amount; `None` for ERC-721
	pub amount: Option<U256>,
	/// NFT token id; `None` for ERC-20
	pub token_id: Option<U256>,
}

impl DecodedTransfer {
	pub fn is_nft(&self) -> bool {
		self.token_id.is_some()
	}

	pub fn is_mint(&self) -> bool {
		is_zero_address(&self.from)
	}
}

/// Decodes a Transfer-signature log
///
/// ERC-20 carries the amount as a 32-byte big-endian integer in the data
/// section; ERC-721 indexes the token id as topic 3 with empty data. The
/// data length is the discriminator.
pub fn decode_transfer_log(log: &EvmLog) -> Result<DecodedTransfer, AdapterError> {
	if !log.is_transfer() {
		return Err(AdapterError::protocol_error(format!(
			"Not a Transfer log: topic0 {:?}",
			log.topic0()
		)));
	}
	if log.topics.len() < 3 {
		return Err(AdapterError::protocol_error(format!(
			"Transfer log has {} topics, expected at least 3",
			log.topics.len()
		)));
	}
	let from = topic_to_address(log.topics[1]);
	let to = topic_to_address(log.topics[2]);

	if log.data.is_empty() {
		// ERC-721: token id indexed as topic 3
		let token_id = log
			.topics
			.get(3)
			.map(|t| U256::from_big_endian(t.as_bytes()))
			.ok_or_else(|| {
				AdapterError::protocol_error("NFT Transfer log missing token id topic")
			})?;
		return Ok(DecodedTransfer {
			from,
			to,
			amount: None,
			token_id: Some(token_id),
		});
	}

	if log.data.len() != 32 {
		return Err(AdapterError::protocol_error(format!(
			"Transfer data is {} bytes, expected 32",
			log.data.len()
		)));
	}
	Ok(DecodedTransfer {
		from,
		to,
		amount: Some(U256::from_big_endian(&log.data)),
		token_id: None,
	})
}

/// Re-encodes a fungible transfer into its log form (topics + data)
///
/// Inverse of [`decode_transfer_log`] for ERC-20 shaped events.
pub fn encode_transfer_log(
	from: &str,
	to: &str,
	amount: U256,
) -> Result<(Vec<H256>, Vec<u8>), AdapterError> {
	let topics = vec![
		string_to_h256(ERC20_TRANSFER_TOPIC)?,
		address_to_topic(from)?,
		address_to_topic(to)?,
	];
	let mut data = [0u8; 32];
	amount.to_big_endian(&mut data);
	Ok((topics, data.to_vec()))
}
