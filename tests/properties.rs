#[path = "properties/strategies.rs"]
mod strategies;

#[cfg(test)]
mod model_properties {
	use crate::strategies::canonical_event_strategy;
	use chainwatch::models::format_units;
	use proptest::prelude::*;
	use rust_decimal::Decimal;
	use std::str::FromStr;

	proptest! {
		#[test]
		fn event_id_carries_chain_prefix(event in canonical_event_strategy()) {
			let expected_prefix = format!("{}_", event.chain);
			prop_assert!(event.id.starts_with(&expected_prefix));
			prop_assert!(event.id.len() > event.chain.as_str().len() + 1);
		}

		#[test]
		fn confirmation_count_clamps_at_zero(
			event in canonical_event_strategy(),
			behind in 1u64..1_000,
		) {
			// The strategy builds tip >= block, so the count equals the
			// offset; a tip behind the block must clamp, not wrap
			prop_assert!(event.confirmation_count < 1_000);
			let stale = chainwatch::models::CanonicalEvent::new(
				event.chain,
				event.tx_hash.clone(),
				None,
				event.block_number + behind,
				event.block_number,
				6,
				event.timestamp,
				event.data.clone(),
			);
			prop_assert_eq!(stale.confirmation_count, 0);
			prop_assert!(!stale.confirmed);
		}

		#[test]
		fn format_units_preserves_value(raw in 0u64..1_000_000_000_000_000, decimals in 0u32..12) {
			let formatted = format_units(&raw.to_string(), decimals);
			// No trailing zeros in the fraction, no bare trailing dot
			if formatted.contains('.') {
				prop_assert!(!formatted.ends_with('0'));
				prop_assert!(!formatted.ends_with('.'));
			}
			// Scaling back up reproduces the raw value
			let parsed = Decimal::from_str(&formatted).unwrap();
			let scale = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
			prop_assert_eq!(parsed * scale, Decimal::from(raw));
		}
	}
}

#[cfg(test)]
mod decode_properties {
	use chainwatch::services::adapter::evm::decode::{decode_transfer_log, encode_transfer_log, EvmLog};
	use proptest::prelude::*;
	use web3::types::U256;

	proptest! {
		#[test]
		fn transfer_encode_decode_round_trips(
			from in proptest::array::uniform20(any::<u8>()),
			to in proptest::array::uniform20(any::<u8>()),
			amount in any::<u128>(),
		) {
			let from = format!("0x{}", hex::encode(from));
			let to = format!("0x{}", hex::encode(to));
			let amount = U256::from(amount);

			let (topics, data) = encode_transfer_log(&from, &to, amount).unwrap();
			let log = EvmLog {
				address: "0xtoken".into(),
				topics: topics.clone(),
				data: data.clone(),
				block_number: 0,
				tx_hash: "0x0".into(),
				log_index: 0,
			};
			let decoded = decode_transfer_log(&log).unwrap();
			prop_assert_eq!(&decoded.from, &from);
			prop_assert_eq!(&decoded.to, &to);
			prop_assert_eq!(decoded.amount.unwrap(), amount);

			let (topics2, data2) = encode_transfer_log(&decoded.from, &decoded.to, amount).unwrap();
			prop_assert_eq!(topics, topics2);
			prop_assert_eq!(data, data2);
		}
	}
}

#[cfg(test)]
mod retry_properties {
	use chainwatch::utils::RetryConfig;
	use proptest::prelude::*;
	use std::time::Duration;

	proptest! {
		#[test]
		fn delays_are_nondecreasing_and_capped(
			base_ms in 1u64..5_000,
			cap_ms in 1u64..60_000,
			attempts in 1u32..24,
		) {
			let config = RetryConfig::new(
				attempts,
				Duration::from_millis(base_ms),
				Duration::from_millis(cap_ms),
			);
			let mut last = Duration::ZERO;
			for attempt in 0..attempts {
				let delay = config.delay_for(attempt);
				prop_assert!(delay >= last);
				prop_assert!(delay <= Duration::from_millis(cap_ms));
				last = delay;
			}
		}
	}
}

#[cfg(test)]
mod dedup_properties {
	use chainwatch::utils::BoundedDedupSet;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn size_stays_bounded_and_recent_ids_survive(
			ids in proptest::collection::vec("[a-z0-9]{4,12}", 1..200),
			capacity in 1usize..64,
		) {
			let mut set = BoundedDedupSet::with_capacity(capacity);
			for id in &ids {
				set.insert(id.clone());
			}
			prop_assert!(set.len() <= capacity);

			// The most recently inserted distinct ids are still present
			let mut distinct_tail: Vec<&String> = Vec::new();
			for id in ids.iter().rev() {
				if !distinct_tail.contains(&id) {
					distinct_tail.push(id);
				}
				if distinct_tail.len() == capacity.min(3) {
					break;
				}
			}
			for id in distinct_tail {
				prop_assert!(set.contains(id));
			}
		}
	}
}

#[cfg(test)]
mod bitcoin_properties {
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn net_delta_is_absolute_difference(
			inputs_from in 0u64..21_000_000_00_000_000,
			outputs_to in 0u64..21_000_000_00_000_000,
		) {
			// The adapter reports |outputs_to - inputs_from| with the
			// direction carried separately
			let amount = outputs_to.abs_diff(inputs_from);
			if outputs_to >= inputs_from {
				prop_assert_eq!(inputs_from + amount, outputs_to);
			} else {
				prop_assert_eq!(outputs_to + amount, inputs_from);
			}
		}
	}
}
