//! Core chain adapter interface.
//!
//! This module defines the common contract every chain-specific adapter
//! implements, ensuring consistent lifecycle, target registry and signal
//! behavior across chain families.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::emitter::AdapterEmitter;
use super::error::AdapterError;
use crate::models::ChainKind;

/// Interval between heartbeat tip re-fetches
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Connection state an adapter reports upward
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	Disconnected,
	Connecting,
	Connected,
	Monitoring,
	Stopping,
}

/// Transaction sketch handed to `estimate_fee`
#[derive(Debug, Clone, Default)]
pub struct FeeEstimateRequest {
	pub from: Option<String>,
	pub to: Option<String>,
	/// Base units, base-10
	pub value: Option<String>,
	/// Hex-encoded call data, EVM-style chains only
	pub data: Option<String>,
}

/// Defines the core interface for chain adapters
///
/// This trait must be implemented by all chain-specific adapters to provide
/// standardized lifecycle and target management. Signals flow upward through
/// the [`AdapterEmitter`] the adapter was constructed with.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
	/// The chain family this adapter serves
	fn chain(&self) -> ChainKind;

	/// Establishes the transport, fetches the current tip and starts the
	/// 30-second heartbeat. Idempotent.
	async fn connect(&self) -> Result<(), AdapterError>;

	/// Tears down subscriptions, timers and the transport. Idempotent.
	async fn disconnect(&self) -> Result<(), AdapterError>;

	/// Sets up subscriptions or polling for all registered targets.
	/// May only run after a successful `connect`.
	async fn start_monitoring(&self) -> Result<(), AdapterError>;

	/// Stops subscriptions/polling without dropping the connection.
	async fn stop_monitoring(&self) -> Result<(), AdapterError>;

	/// Validates and registers a target, wiring its subscription or poll
	/// entry when monitoring is active.
	async fn add_monitoring_target(
		&self,
		target: crate::models::MonitoringTarget,
	) -> Result<(), AdapterError>;

	/// Removes a target and tears down its subscriptions.
	async fn remove_monitoring_target(&self, address: &str) -> Result<(), AdapterError>;

	/// Latest observed tip (block / slot / checkpoint / height)
	async fn current_block_number(&self) -> Result<u64, AdapterError>;

	async fn connection_status(&self) -> ConnectionStatus;

	/// Chain-native textual address validation
	fn validate_address(&self, address: &str) -> bool;

	/// Estimates the fee for a sketched transaction, as a base-unit decimal
	/// string
	async fn estimate_fee(&self, request: &FeeEstimateRequest) -> Result<String, AdapterError>;

	/// Instant of the last successful heartbeat, for the manager's health
	/// sweep. `None` before the first beat.
	async fn last_heartbeat(&self) -> Option<Instant>;
}

/// Shared heartbeat bookkeeping
///
/// Owned by each adapter; the spawned timer task records successful beats
/// here and reports failures through the emitter without killing the
/// adapter.
#[derive(Clone, Default)]
pub struct Heartbeat {
	last_beat: Arc<RwLock<Option<Instant>>>,
}

impl Heartbeat {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn beat(&self) {
		*self.last_beat.write().await = Some(Instant::now());
	}

	pub async fn last(&self) -> Option<Instant> {
		*self.last_beat.read().await
	}
}

/// Spawns the 30-second heartbeat loop for an adapter
///
/// `fetch_tip` re-fetches the chain tip (and is expected to store it in the
/// adapter's shared tip cell as a side effect). A failed fetch emits an
/// error signal — the manager may act on staleness — but the loop keeps
/// running until the returned handle is aborted.
pub fn spawn_heartbeat<F, Fut>(
	emitter: AdapterEmitter,
	heartbeat: Heartbeat,
	fetch_tip: F,
) -> JoinHandle<()>
where
	F: Fn() -> Fut + Send + Sync + 'static,
	Fut: std::future::Future<Output = Result<u64, AdapterError>> + Send,
{
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		// First tick completes immediately; skip it so the connect-time tip
		// fetch is not repeated
		interval.tick().await;
		loop {
			interval.tick().await;
			match fetch_tip().await {
				Ok(_) => heartbeat.beat().await,
				Err(e) => emitter.emit_error(e).await,
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_heartbeat_records_beats() {
		let heartbeat = Heartbeat::new();
		assert!(heartbeat.last().await.is_none());
		heartbeat.beat().await;
		assert!(heartbeat.last().await.is_some());
	}
}
