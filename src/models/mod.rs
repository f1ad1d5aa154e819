//! Domain models and data structures for the multi-chain event listener.
//!
//! This module contains all the core data structures used throughout the application:
//!
//! - `config`: TOML configuration sections, loading and validation
//! - `core`: Core domain models (CanonicalEvent, ProcessedEvent, MonitoringTarget)

mod config;
mod core;

// Re-export core types
pub use core::{
	format_units, CanonicalEvent, ChainKind, Classification, ContractCreationPayload, CustomRule,
	EventKind, EventMetadata, EventPayload, MonitoringTarget, NativeTransferPayload,
	NftMintPayload, NftTransferPayload, NotificationRecord, ProcessedEvent, ProcessingError,
	ProcessingMetadata, RuleOperator, TargetFilterOverrides, TargetKind, TargetPriority,
	TokenBurnPayload, TokenMintPayload, TransferPayload, ValueCategory,
};

// Re-export config types
pub use config::{
	AddressTargetsConfig, AppConfig, ChainConfig, Commitment, ConfigError, ContractTargetsConfig,
	DatabaseConfig, FilterDefaultsConfig, FiltersConfig, LogFormat, LogLevel, LoggingConfig,
	MonitoringConfig, MonitoringJobConfig, NotificationChannel, NotificationsConfig,
	PerformanceConfig, TargetsConfig,
};
