//! Move event type classification.
//!
//! Sui events carry a fully qualified Move type
//! (`0x2::coin::MintEvent<0x..::usdc::USDC>`); the event kind is decided by
//! string matching on that name. The heuristic is deliberately permissive —
//! any type containing `Transfer` classifies as a transfer — and lives in
//! one function so a stricter selector list can replace it in one place.

use crate::models::EventKind;

/// Classifies a Move event type name, `None` meaning the event is dropped
pub fn classify_move_type(move_type: &str) -> Option<EventKind> {
	let base = move_type.split('<').next().unwrap_or(move_type);
	if base.contains("::coin::MintEvent") || base.contains("Mint") {
		return Some(EventKind::TokenMint);
	}
	if base.contains("BurnEvent") || base.contains("Burn") {
		return Some(EventKind::TokenBurn);
	}
	if base.contains("::pay::") || base.contains("::coin::") || base.contains("Transfer") {
		return Some(EventKind::Transfer);
	}
	if base.contains("::package::") || base.contains("Publish") {
		return Some(EventKind::ContractCreation);
	}
	None
}

/// Extracts the token type from the angle-bracket parameters of a Move type
pub fn extract_token_type(move_type: &str) -> Option<String> {
	let start = move_type.find('<')?;
	let end = move_type.rfind('>')?;
	if end <= start + 1 {
		return None;
	}
	Some(move_type[start + 1..end].to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mint_event() {
		assert_eq!(
			classify_move_type("0x2::coin::MintEvent<0xabc::usdc::USDC>"),
			Some(EventKind::TokenMint)
		);
		assert_eq!(
			classify_move_type("0xdead::token::MintCap"),
			Some(EventKind::TokenMint)
		);
	}

	#[test]
	fn test_burn_event() {
		assert_eq!(
			classify_move_type("0x2::coin::BurnEvent<0xabc::usdc::USDC>"),
			Some(EventKind::TokenBurn)
		);
	}

	#[test]
	fn test_transfer_variants() {
		assert_eq!(
			classify_move_type("0x2::pay::PayEvent"),
			Some(EventKind::Transfer)
		);
		assert_eq!(
			classify_move_type("0x2::coin::CoinEvent"),
			Some(EventKind::Transfer)
		);
		assert_eq!(
			classify_move_type("0xabc::thing::TransferRecord"),
			Some(EventKind::Transfer)
		);
	}

	#[test]
	fn test_publish() {
		assert_eq!(
			classify_move_type("0x2::package::UpgradeEvent"),
			Some(EventKind::ContractCreation)
		);
		assert_eq!(
			classify_move_type("0xabc::registry::PublishRecord"),
			Some(EventKind::ContractCreation)
		);
	}

	#[test]
	fn test_unknown_is_dropped() {
		assert_eq!(classify_move_type("0x3::staking::RewardEvent"), None);
	}

	#[test]
	fn test_mint_wins_over_coin_match() {
		// `::coin::MintEvent` also contains `::coin::`; the mint rule must
		// win
		assert_eq!(
			classify_move_type("0x2::coin::MintEvent"),
			Some(EventKind::TokenMint)
		);
	}

	#[test]
	fn test_extract_token_type() {
		assert_eq!(
			extract_token_type("0x2::coin::MintEvent<0xabc::usdc::USDC>").as_deref(),
			Some("0xabc::usdc::USDC")
		);
		assert_eq!(
			extract_token_type("0x2::pay::PayEvent<0x2::sui::SUI>").as_deref(),
			Some("0x2::sui::SUI")
		);
		assert_eq!(extract_token_type("0x2::pay::PayEvent"), None);
		assert_eq!(
			extract_token_type("0x2::a::B<0x2::c::D<0x2::e::F>>").as_deref(),
			Some("0x2::c::D<0x2::e::F>")
		);
	}
}
