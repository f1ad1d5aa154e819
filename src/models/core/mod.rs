//! Core domain models for the multi-chain event listener.
//!
//! This module contains the fundamental data structures that represent:
//! - Canonical events: the uniform record every chain adapter emits
//! - Processed events: the pipeline's per-event output with delivery records
//! - Monitoring targets: user declarations of on-chain interest

mod chain;
mod event;
mod processed;
mod target;

pub use chain::ChainKind;
pub use event::{
	format_units, CanonicalEvent, ContractCreationPayload, EventKind, EventMetadata, EventPayload,
	NativeTransferPayload, NftMintPayload, NftTransferPayload, TokenBurnPayload, TokenMintPayload,
	TransferPayload,
};
pub use processed::{
	Classification, NotificationRecord, ProcessedEvent, ProcessingError, ProcessingMetadata,
	ValueCategory,
};
pub use target::{
	CustomRule, MonitoringTarget, RuleOperator, TargetFilterOverrides, TargetKind, TargetPriority,
};
