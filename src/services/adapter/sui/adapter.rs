//! Sui chain adapter.
//!
//! The checkpoint sequence number stands in for block height. No native
//! subscription is relied upon: a one-second polling loop runs
//! `suix_queryEvents` with a per-target `{MoveEventType, Package,
//! MoveModule}` selector. The node-returned cursor is carried between polls
//! so bursts larger than one page are not missed, and a bounded
//! `processed_event_ids` set (`<tx_digest>:<event_seq>`) suppresses
//! duplicates across overlapping windows.

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::classify::{classify_move_type, extract_token_type};
use crate::models::{
	CanonicalEvent, ChainConfig, ChainKind, ContractCreationPayload, EventKind, EventPayload,
	MonitoringTarget, PerformanceConfig, TokenBurnPayload, TokenMintPayload, TransferPayload,
};
use crate::services::adapter::adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
};
use crate::services::adapter::emitter::AdapterEmitter;
use crate::services::adapter::error::AdapterError;
use crate::services::adapter::rpc::HttpRpcClient;
use crate::utils::{BoundedDedupSet, RetryConfig, WithRetry};

/// Events per query page
const QUERY_PAGE_LIMIT: u32 = 50;

/// Computation units assumed by the fee estimate
const DEFAULT_GAS_UNITS: u64 = 1_000;

struct SuiInner {
	emitter: AdapterEmitter,
	http: HttpRpcClient,
	poll_interval: Duration,
	retry: WithRetry,
	tip: AtomicU64,
	heartbeat: Heartbeat,
	heartbeat_task: Mutex<Option<JoinHandle<()>>>,
	status: RwLock<ConnectionStatus>,
	monitoring: AtomicBool,
	targets: RwLock<HashMap<String, MonitoringTarget>>,
	/// Per-target query cursor returned by the node
	cursors: Mutex<HashMap<String, Value>>,
	poll_task: Mutex<Option<JoinHandle<()>>>,
	processed_event_ids: Mutex<BoundedDedupSet>,
}

/// Sui adapter polling the JSON-RPC event query API
pub struct SuiAdapter {
	inner: Arc<SuiInner>,
}

impl SuiAdapter {
	pub fn new(
		config: &ChainConfig,
		performance: &PerformanceConfig,
		poll_interval_ms: u64,
		emitter: AdapterEmitter,
	) -> Result<Self, AdapterError> {
		let http = HttpRpcClient::new(
			&config.rpc_url,
			Duration::from_millis(performance.request_timeout_ms),
			config.max_retry_attempts,
		)?;
		Ok(Self {
			inner: Arc::new(SuiInner {
				emitter,
				http,
				poll_interval: Duration::from_millis(poll_interval_ms.max(250)),
				retry: WithRetry::new(RetryConfig::new(
					config.max_retry_attempts,
					Duration::from_secs(1),
					Duration::from_secs(30),
				)),
				tip: AtomicU64::new(0),
				heartbeat: Heartbeat::new(),
				heartbeat_task: Mutex::new(None),
				status: RwLock::new(ConnectionStatus::Disconnected),
				monitoring: AtomicBool::new(false),
				targets: RwLock::new(HashMap::new()),
				cursors: Mutex::new(HashMap::new()),
				poll_task: Mutex::new(None),
				processed_event_ids: Mutex::new(BoundedDedupSet::default()),
			}),
		})
	}

	#[cfg(test)]
	fn inner(&self) -> &Arc<SuiInner> {
		&self.inner
	}
}

/// Accepts a 0x-hex object/package address or a fully qualified Move type
/// (`0xpkg::module::Name`, optionally with type parameters)
pub fn validate_sui_address(address: &str) -> bool {
	fn is_hex_address(part: &str) -> bool {
		let Some(digits) = part.strip_prefix("0x") else {
			return false;
		};
		!digits.is_empty() && digits.len() <= 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
	}
	let base = address.split('<').next().unwrap_or(address);
	let segments: Vec<&str> = base.split("::").collect();
	match segments.len() {
		1 => is_hex_address(segments[0]),
		2 | 3 => {
			is_hex_address(segments[0])
				&& segments[1..]
					.iter()
					.all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_'))
		}
		_ => false,
	}
}

impl SuiInner {
	async fn fetch_tip(&self) -> Result<u64, AdapterError> {
		let result = self
			.http
			.call("sui_getLatestCheckpointSequenceNumber", json!([]))
			.await?;
		let checkpoint = match &result {
			Value::String(s) => s.parse::<u64>().ok(),
			Value::Number(n) => n.as_u64(),
			_ => None,
		}
		.ok_or_else(|| {
			AdapterError::protocol_error("Unexpected checkpoint sequence number shape")
		})?;
		self.tip.fetch_max(checkpoint, Ordering::SeqCst);
		Ok(checkpoint)
	}

	/// Builds the query selector for one target address
	///
	/// A fully qualified type selects `MoveEventType`, a `pkg::module` pair
	/// selects `MoveModule`, a bare address selects `Package`.
	fn event_filter_for(address: &str) -> Value {
		let segments: Vec<&str> = address.split("::").collect();
		match segments.len() {
			3 => json!({"MoveEventType": address}),
			2 => json!({"MoveModule": {"package": segments[0], "module": segments[1]}}),
			_ => json!({"Package": address}),
		}
	}

	/// One queried event → canonical event, classified by Move type name
	async fn handle_event(&self, entry: &Value) {
		let Some(tx_digest) = entry.pointer("/id/txDigest").and_then(Value::as_str) else {
			return;
		};
		let event_seq = match entry.pointer("/id/eventSeq") {
			Some(Value::String(s)) => s.parse::<u64>().unwrap_or(0),
			Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
			_ => 0,
		};
		// Composite id guards against window overlap between polls
		if !self
			.processed_event_ids
			.lock()
			.await
			.insert(format!("{}:{}", tx_digest, event_seq))
		{
			return;
		}

		let Some(move_type) = entry.get("type").and_then(Value::as_str) else {
			return;
		};
		let Some(kind) = classify_move_type(move_type) else {
			return;
		};
		let token_type = extract_token_type(move_type);
		let sender = entry.get("sender").and_then(Value::as_str).map(str::to_string);
		let parsed = entry.get("parsedJson").cloned().unwrap_or(Value::Null);
		let amount = parsed.get("amount").and_then(|v| match v {
			Value::String(s) => Some(s.clone()),
			Value::Number(n) => Some(n.to_string()),
			_ => None,
		});
		let recipient = parsed
			.get("recipient")
			.and_then(Value::as_str)
			.map(str::to_string);

		let payload = match kind {
			EventKind::TokenMint => EventPayload::TokenMint(TokenMintPayload {
				minter: sender,
				amount,
				token_address: token_type,
				..Default::default()
			}),
			EventKind::TokenBurn => EventPayload::TokenBurn(TokenBurnPayload {
				from: sender,
				amount,
				token_address: token_type,
				..Default::default()
			}),
			EventKind::Transfer => EventPayload::Transfer(TransferPayload {
				from: sender,
				to: recipient,
				amount,
				token_address: token_type,
				..Default::default()
			}),
			EventKind::ContractCreation => {
				EventPayload::ContractCreation(ContractCreationPayload {
					creator: sender,
					contract_address: entry
						.get("packageId")
						.and_then(Value::as_str)
						.map(str::to_string),
					..Default::default()
				})
			}
			_ => return,
		};

		let timestamp = entry
			.get("timestampMs")
			.and_then(|v| match v {
				Value::String(s) => s.parse::<i64>().ok(),
				Value::Number(n) => n.as_i64(),
				_ => None,
			})
			.unwrap_or_else(|| Utc::now().timestamp_millis());
		let tip = self.tip.load(Ordering::SeqCst);

		// Queried events are already checkpointed, hence final
		let event = CanonicalEvent::new(
			ChainKind::Sui,
			tx_digest,
			Some(event_seq),
			tip,
			tip,
			0,
			timestamp,
			payload,
		);
		self.emitter.emit_event(event).await;
	}

	async fn poll_target(&self, target: &MonitoringTarget) {
		let filter = Self::event_filter_for(&target.address);
		let cursor = self
			.cursors
			.lock()
			.await
			.get(&target.address)
			.cloned()
			.unwrap_or(Value::Null);

		let params = json!([filter, cursor, QUERY_PAGE_LIMIT, false]);
		let page = match self.http.call("suix_queryEvents", params).await {
			Ok(page) => page,
			Err(e) => {
				warn!("sui: event query for {} failed: {}", target.address, e);
				return;
			}
		};

		if let Some(entries) = page.get("data").and_then(Value::as_array) {
			for entry in entries {
				self.handle_event(entry).await;
			}
		}
		if let Some(next) = page.get("nextCursor") {
			if !next.is_null() {
				self.cursors
					.lock()
					.await
					.insert(target.address.clone(), next.clone());
			}
		}
	}

	async fn poll_tick(&self) {
		if let Err(e) = self.fetch_tip().await {
			self.emitter.emit_error(e).await;
			return;
		}
		let targets: Vec<MonitoringTarget> = self.targets.read().await.values().cloned().collect();
		for target in targets {
			self.poll_target(&target).await;
		}
	}
}

#[async_trait]
impl ChainAdapter for SuiAdapter {
	fn chain(&self) -> ChainKind {
		ChainKind::Sui
	}

	async fn connect(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		if matches!(
			*inner.status.read().await,
			ConnectionStatus::Connected | ConnectionStatus::Monitoring
		) {
			return Ok(());
		}
		*inner.status.write().await = ConnectionStatus::Connecting;
		inner.emitter.emit_status(ConnectionStatus::Connecting).await;

		inner
			.retry
			.attempt("Sui checkpoint fetch", || inner.fetch_tip())
			.await?;
		inner.heartbeat.beat().await;

		let heartbeat_inner = inner.clone();
		let handle = spawn_heartbeat(inner.emitter.clone(), inner.heartbeat.clone(), move || {
			let inner = heartbeat_inner.clone();
			async move { inner.fetch_tip().await }
		});
		*inner.heartbeat_task.lock().await = Some(handle);

		*inner.status.write().await = ConnectionStatus::Connected;
		inner.emitter.emit_status(ConnectionStatus::Connected).await;
		info!(
			"sui: connected (checkpoint {})",
			inner.tip.load(Ordering::SeqCst)
		);
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		if matches!(*inner.status.read().await, ConnectionStatus::Disconnected) {
			return Ok(());
		}
		*inner.status.write().await = ConnectionStatus::Stopping;
		inner.monitoring.store(false, Ordering::SeqCst);
		if let Some(task) = inner.poll_task.lock().await.take() {
			task.abort();
		}
		if let Some(handle) = inner.heartbeat_task.lock().await.take() {
			handle.abort();
		}
		*inner.status.write().await = ConnectionStatus::Disconnected;
		inner
			.emitter
			.emit_status(ConnectionStatus::Disconnected)
			.await;
		Ok(())
	}

	async fn start_monitoring(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		match *inner.status.read().await {
			ConnectionStatus::Connected => {}
			ConnectionStatus::Monitoring => return Ok(()),
			_ => {
				return Err(AdapterError::connection_error(
					"start_monitoring requires a connected adapter",
				))
			}
		}
		inner.monitoring.store(true, Ordering::SeqCst);

		let poll_inner = inner.clone();
		let task = tokio::spawn(async move {
			let mut interval = tokio::time::interval(poll_inner.poll_interval);
			interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			while poll_inner.monitoring.load(Ordering::SeqCst) {
				interval.tick().await;
				poll_inner.poll_tick().await;
			}
		});
		*inner.poll_task.lock().await = Some(task);

		*inner.status.write().await = ConnectionStatus::Monitoring;
		inner
			.emitter
			.emit_status(ConnectionStatus::Monitoring)
			.await;
		Ok(())
	}

	async fn stop_monitoring(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		inner.monitoring.store(false, Ordering::SeqCst);
		if let Some(task) = inner.poll_task.lock().await.take() {
			task.abort();
		}
		if matches!(*inner.status.read().await, ConnectionStatus::Monitoring) {
			*inner.status.write().await = ConnectionStatus::Connected;
			inner.emitter.emit_status(ConnectionStatus::Connected).await;
		}
		Ok(())
	}

	async fn add_monitoring_target(&self, target: MonitoringTarget) -> Result<(), AdapterError> {
		target.validate().map_err(AdapterError::validation_error)?;
		if !self.validate_address(&target.address) {
			return Err(AdapterError::validation_error(format!(
				"'{}' is not a valid sui address or event selector",
				target.address
			)));
		}
		self.inner
			.targets
			.write()
			.await
			.insert(target.address.clone(), target);
		Ok(())
	}

	async fn remove_monitoring_target(&self, address: &str) -> Result<(), AdapterError> {
		self.inner.targets.write().await.remove(address);
		self.inner.cursors.lock().await.remove(address);
		Ok(())
	}

	async fn current_block_number(&self) -> Result<u64, AdapterError> {
		let cached = self.inner.tip.load(Ordering::SeqCst);
		if cached > 0 {
			return Ok(cached);
		}
		self.inner.fetch_tip().await
	}

	async fn connection_status(&self) -> ConnectionStatus {
		*self.inner.status.read().await
	}

	fn validate_address(&self, address: &str) -> bool {
		validate_sui_address(address)
	}

	async fn estimate_fee(&self, _request: &FeeEstimateRequest) -> Result<String, AdapterError> {
		let result = self
			.inner
			.http
			.call("suix_getReferenceGasPrice", json!([]))
			.await?;
		let gas_price = match &result {
			Value::String(s) => s.parse::<u64>().ok(),
			Value::Number(n) => n.as_u64(),
			_ => None,
		}
		.ok_or_else(|| AdapterError::protocol_error("Unexpected reference gas price shape"))?;
		Ok((gas_price * DEFAULT_GAS_UNITS).to_string())
	}

	async fn last_heartbeat(&self) -> Option<Instant> {
		self.inner.heartbeat.last().await
	}
}
