//! Event pipeline: ordered filters, enrichment, processing and fan-out
//! notification.

mod error;
mod filters;
mod processors;
mod service;

pub use error::PipelineError;
pub use filters::{
	evaluate_rule, AddressFilter, AmountFilter, ConfirmationFilter, ContractFilter,
	CustomRulesFilter, EventFilter, EventKindFilter, PriorityFilter, SelfTransferFilter,
	TargetAmountFilter, TimestampRangeFilter, WatchLists,
};
pub use processors::{
	ClassificationProcessor, EventEnricher, EventProcessor, TargetTagEnricher,
};
pub use service::{EventPipeline, PipelineStatsSnapshot};
