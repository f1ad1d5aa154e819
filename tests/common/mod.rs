//! Shared builders for integration tests.
#![allow(dead_code)]

use chainwatch::models::{
	CanonicalEvent, ChainKind, EventPayload, MonitoringTarget, TargetKind, TransferPayload,
};
use chainwatch::models::{EventKind, FilterDefaultsConfig};
use chainwatch::services::resolver::TargetConfigResolver;
use std::sync::Arc;

pub fn transfer_event(
	chain: ChainKind,
	tx_hash: &str,
	from: &str,
	to: &str,
	amount: &str,
	token: &str,
) -> CanonicalEvent {
	CanonicalEvent::new(
		chain,
		tx_hash,
		Some(0),
		100,
		110,
		6,
		1_700_000_000_000,
		EventPayload::Transfer(TransferPayload {
			from: Some(from.into()),
			to: Some(to.into()),
			amount: Some(amount.into()),
			token_address: Some(token.into()),
			..Default::default()
		}),
	)
}

pub fn contract_target(id: &str, address: &str) -> MonitoringTarget {
	MonitoringTarget::new(
		id,
		TargetKind::Contract,
		address,
		vec![EventKind::Transfer, EventKind::TokenMint],
	)
}

pub fn empty_resolver() -> Arc<TargetConfigResolver> {
	TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![])
}
