//! Tron chain support.
//!
//! Address helpers live here because the TRX-as-EVM variant shares the
//! Base58check validator with the native polling adapter.

#[allow(clippy::module_inception)]
mod adapter;

pub use adapter::TronAdapter;

use sha2::{Digest, Sha256};

/// Tron mainnet address version byte
const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Validates a Base58check `T…` address: 34 characters, 0x41 version byte,
/// 4-byte double-sha256 checksum
pub fn validate_tron_address(address: &str) -> bool {
	if address.len() != 34 || !address.starts_with('T') {
		return false;
	}
	let Ok(decoded) = bs58::decode(address).into_vec() else {
		return false;
	};
	if decoded.len() != 25 || decoded[0] != TRON_ADDRESS_PREFIX {
		return false;
	}
	let (payload, checksum) = decoded.split_at(21);
	let digest = Sha256::digest(Sha256::digest(payload));
	digest[..4] == checksum[..]
}

/// Encodes a 21-byte `41…` hex address into its Base58check form
pub fn tron_hex_to_base58(hex_address: &str) -> Option<String> {
	let raw = hex_address.strip_prefix("0x").unwrap_or(hex_address);
	let bytes = hex::decode(raw).ok()?;
	if bytes.len() != 21 || bytes[0] != TRON_ADDRESS_PREFIX {
		return None;
	}
	let digest = Sha256::digest(Sha256::digest(&bytes));
	let mut payload = bytes;
	payload.extend_from_slice(&digest[..4]);
	Some(bs58::encode(payload).into_string())
}
