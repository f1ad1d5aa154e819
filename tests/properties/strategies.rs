//! proptest strategies for the canonical model.

use chainwatch::models::{CanonicalEvent, ChainKind, EventPayload, TransferPayload};
use proptest::prelude::*;

pub fn chain_kind_strategy() -> impl Strategy<Value = ChainKind> {
	prop::sample::select(ChainKind::all().to_vec())
}

pub fn hex_address_strategy() -> impl Strategy<Value = String> {
	proptest::array::uniform20(any::<u8>()).prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

pub fn tx_hash_strategy() -> impl Strategy<Value = String> {
	proptest::array::uniform32(any::<u8>()).prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

prop_compose! {
	pub fn canonical_event_strategy()(
		chain in chain_kind_strategy(),
		tx_hash in tx_hash_strategy(),
		sub_index in prop::option::of(0u64..100),
		block_number in 0u64..10_000_000,
		tip_offset in 0u64..1_000,
		required in 0u64..32,
		timestamp in 0i64..2_000_000_000_000,
		from in hex_address_strategy(),
		to in hex_address_strategy(),
		amount in 0u128..u128::MAX,
	) -> CanonicalEvent {
		CanonicalEvent::new(
			chain,
			tx_hash,
			sub_index,
			block_number,
			block_number + tip_offset,
			required,
			timestamp,
			EventPayload::Transfer(TransferPayload {
				from: Some(from),
				to: Some(to),
				amount: Some(amount.to_string()),
				..Default::default()
			}),
		)
	}
}
