//! Solana chain adapter.
//!
//! A "block" here is a slot, and the configured commitment level
//! (`processed`/`confirmed`/`finalized`) qualifies every read and
//! subscription. Three sources feed the canonical stream:
//!
//! - account-change subscriptions on each monitored address, synthesizing
//!   transfer events from lamports deltas (absolute value in `amount`, the
//!   direction preserved in metadata),
//! - mint-supply diffing for addresses owned by a recognized token program,
//! - a program-log subscription on the SPL token program emitting low-detail
//!   events keyed by transaction signature.
//!
//! Subscriptions are tracked in a map keyed `<purpose>_<address>` so target
//! removal can tear down everything belonging to that address.

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

use super::mint_cache::{MintInfo, MintSupplyCache};
use crate::models::{
	CanonicalEvent, ChainConfig, ChainKind, Commitment, ContractCreationPayload, EventPayload,
	MonitoringTarget, PerformanceConfig, TokenMintPayload, TransferPayload,
};
use crate::services::adapter::adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
};
use crate::services::adapter::emitter::AdapterEmitter;
use crate::services::adapter::error::AdapterError;
use crate::services::adapter::rpc::HttpRpcClient;
use crate::services::adapter::ws::WsRpcClient;
use crate::utils::{BoundedDedupSet, RetryConfig, WithRetry};

/// Canonical SPL token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Token-2022 program, recognized as a fallback
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// Base fee per signature, in lamports
const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

struct SolanaInner {
	emitter: AdapterEmitter,
	http: HttpRpcClient,
	websocket_url: Option<String>,
	ws: RwLock<Option<Arc<WsRpcClient>>>,
	request_timeout: Duration,
	commitment: Commitment,
	retry: WithRetry,
	tip: AtomicU64,
	heartbeat: Heartbeat,
	heartbeat_task: Mutex<Option<JoinHandle<()>>>,
	status: RwLock<ConnectionStatus>,
	monitoring: AtomicBool,
	targets: RwLock<HashMap<String, MonitoringTarget>>,
	/// `<purpose>_<address>` → raw subscription id
	subscriptions: Mutex<HashMap<String, Value>>,
	tasks: Mutex<Vec<JoinHandle<()>>>,
	/// Last observed lamports balance per monitored address
	lamports: Mutex<HashMap<String, u64>>,
	mint_cache: Mutex<MintSupplyCache>,
	dedup: Mutex<BoundedDedupSet>,
}

/// Solana adapter over WebSocket subscriptions with HTTP reads
pub struct SolanaAdapter {
	inner: Arc<SolanaInner>,
}

impl SolanaAdapter {
	pub fn new(
		config: &ChainConfig,
		performance: &PerformanceConfig,
		emitter: AdapterEmitter,
	) -> Result<Self, AdapterError> {
		let request_timeout = Duration::from_millis(performance.request_timeout_ms);
		let http = HttpRpcClient::new(&config.rpc_url, request_timeout, config.max_retry_attempts)?;
		Ok(Self {
			inner: Arc::new(SolanaInner {
				emitter,
				http,
				websocket_url: config.websocket_url.clone(),
				ws: RwLock::new(None),
				request_timeout,
				commitment: config.commitment.unwrap_or_default(),
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
				subscriptions: Mutex::new(HashMap::new()),
				tasks: Mutex::new(Vec::new()),
				lamports: Mutex::new(HashMap::new()),
				mint_cache: Mutex::new(MintSupplyCache::new()),
				dedup: Mutex::new(BoundedDedupSet::default()),
			}),
		})
	}

	#[cfg(test)]
	fn inner(&self) -> &Arc<SolanaInner> {
		&self.inner
	}
}

/// A 32-byte Base58 public key round-trips through decode
pub fn validate_solana_address(address: &str) -> bool {
	if address.is_empty() || address.len() > 44 {
		return false;
	}
	match bs58::decode(address).into_vec() {
		Ok(bytes) => bytes.len() == 32,
		Err(_) => false,
	}
}

impl SolanaInner {
	/// Commitment implies finality: anything at `confirmed` or better is
	/// reported as confirmed immediately
	fn required_confirmations(&self) -> u64 {
		match self.commitment {
			Commitment::Processed => 1,
			Commitment::Confirmed | Commitment::Finalized => 0,
		}
	}

	async fn fetch_tip(&self) -> Result<u64, AdapterError> {
		let result = self
			.http
			.call("getSlot", json!([{"commitment": self.commitment.as_str()}]))
			.await?;
		let slot = result
			.as_u64()
			.ok_or_else(|| AdapterError::protocol_error("getSlot returned non-number"))?;
		self.tip.fetch_max(slot, Ordering::SeqCst);
		Ok(slot)
	}

	async fn ws_client(&self) -> Result<Arc<WsRpcClient>, AdapterError> {
		self.ws
			.read()
			.await
			.clone()
			.ok_or_else(|| AdapterError::connection_error("WebSocket provider not connected"))
	}

	async fn emit_deduped(&self, event: CanonicalEvent) {
		if self.dedup.lock().await.insert(event.id.clone()) {
			self.emitter.emit_event(event).await;
		}
	}

	/// Fetches and parses a mint account's supply and decimals
	///
	/// Tries the canonical SPL token program's layout first, then
	/// Token-2022; both serve the same jsonParsed shape.
	async fn fetch_mint_info(&self, address: &str) -> Result<Option<MintInfo>, AdapterError> {
		let result = self
			.http
			.call(
				"getAccountInfo",
				json!([address, {"encoding": "jsonParsed", "commitment": self.commitment.as_str()}]),
			)
			.await?;
		let Some(owner) = result.pointer("/value/owner").and_then(Value::as_str) else {
			return Ok(None);
		};
		if owner != TOKEN_PROGRAM_ID && owner != TOKEN_2022_PROGRAM_ID {
			return Ok(None);
		}
		let parsed = result.pointer("/value/data/parsed");
		let Some(parsed) = parsed else {
			return Ok(None);
		};
		if parsed.get("type").and_then(Value::as_str) != Some("mint") {
			return Ok(None);
		}
		let info = parsed.get("info").cloned().unwrap_or(Value::Null);
		let supply = info
			.get("supply")
			.and_then(Value::as_str)
			.and_then(|s| s.parse::<u64>().ok())
			.ok_or_else(|| AdapterError::protocol_error("Mint account missing supply"))?;
		let decimals = info
			.get("decimals")
			.and_then(Value::as_u64)
			.unwrap_or(0) as u32;
		Ok(Some(MintInfo { supply, decimals }))
	}

	/// Handles one account-change notification for a monitored address
	async fn handle_account_change(&self, address: &str, notification: Value) {
		let slot = notification
			.pointer("/context/slot")
			.and_then(Value::as_u64)
			.unwrap_or_else(|| self.tip.load(Ordering::SeqCst));
		self.tip.fetch_max(slot, Ordering::SeqCst);
		let tip = self.tip.load(Ordering::SeqCst);

		let Some(new_lamports) = notification.pointer("/value/lamports").and_then(Value::as_u64)
		else {
			warn!("solana: account notification without lamports for {}", address);
			return;
		};
		let owner = notification
			.pointer("/value/owner")
			.and_then(Value::as_str)
			.unwrap_or("");

		// Lamports delta → synthetic transfer
		let previous = {
			let mut lamports = self.lamports.lock().await;
			lamports.insert(address.to_string(), new_lamports)
		};
		if let Some(previous) = previous {
			if previous != new_lamports {
				let (delta, direction) = if new_lamports > previous {
					(new_lamports - previous, "credit")
				} else {
					(previous - new_lamports, "debit")
				};
				let mut payload = TransferPayload {
					amount: Some(delta.to_string()),
					..Default::default()
				};
				if direction == "credit" {
					payload.to = Some(address.to_string());
				} else {
					payload.from = Some(address.to_string());
				}
				payload
					.metadata
					.insert("direction".into(), json!(direction));
				payload.metadata.insert("unit".into(), json!("lamports"));
				let event = CanonicalEvent::synthetic(
					ChainKind::Solana,
					address,
					slot,
					tip,
					self.required_confirmations(),
					Utc::now().timestamp_millis(),
					EventPayload::Transfer(payload),
				);
				self.emit_deduped(event).await;
			}
		}

		// Mint-supply diff when the account is a token mint
		if owner == TOKEN_PROGRAM_ID || owner == TOKEN_2022_PROGRAM_ID {
			match self.fetch_mint_info(address).await {
				Ok(Some(info)) => {
					let minted = self.mint_cache.lock().await.observe(address, info);
					if let Some(amount) = minted {
						let event = CanonicalEvent::synthetic(
							ChainKind::Solana,
							address,
							slot,
							tip,
							self.required_confirmations(),
							Utc::now().timestamp_millis(),
							EventPayload::TokenMint(TokenMintPayload {
								amount: Some(amount),
								token_address: Some(address.to_string()),
								token_decimals: Some(info.decimals),
								..Default::default()
							}),
						);
						self.emit_deduped(event).await;
					}
				}
				Ok(None) => {}
				Err(e) => warn!("solana: mint fetch for {} failed: {}", address, e),
			}
		}
	}

	/// Handles one program-log notification from the SPL token program
	async fn handle_program_logs(&self, program: &str, notification: Value) {
		let slot = notification
			.pointer("/context/slot")
			.and_then(Value::as_u64)
			.unwrap_or_else(|| self.tip.load(Ordering::SeqCst));
		self.tip.fetch_max(slot, Ordering::SeqCst);
		let tip = self.tip.load(Ordering::SeqCst);

		let Some(signature) = notification.pointer("/value/signature").and_then(Value::as_str)
		else {
			return;
		};
		if notification
			.pointer("/value/err")
			.map(|e| !e.is_null())
			.unwrap_or(false)
		{
			return;
		}
		let Some(lines) = notification.pointer("/value/logs").and_then(Value::as_array) else {
			return;
		};

		for (index, line) in lines.iter().enumerate() {
			let Some(line) = line.as_str() else { continue };
			let payload = if line.contains("Instruction: MintTo") {
				let mut p = TokenMintPayload::default();
				p.metadata.insert("source".into(), json!("program_logs"));
				p.metadata.insert("program".into(), json!(program));
				EventPayload::TokenMint(p)
			} else if line.contains("Instruction: InitializeMint") {
				let mut p = ContractCreationPayload::default();
				p.metadata.insert("source".into(), json!("program_logs"));
				p.metadata.insert("program".into(), json!(program));
				EventPayload::ContractCreation(p)
			} else if line.contains("Instruction: Transfer") {
				let mut p = TransferPayload::default();
				p.metadata.insert("source".into(), json!("program_logs"));
				p.metadata.insert("program".into(), json!(program));
				EventPayload::Transfer(p)
			} else {
				continue;
			};

			let event = CanonicalEvent::new(
				ChainKind::Solana,
				signature,
				Some(index as u64),
				slot,
				tip,
				self.required_confirmations(),
				Utc::now().timestamp_millis(),
				payload,
			);
			self.emit_deduped(event).await;
		}
	}

	/// Wires the subscriptions one target needs
	async fn wire_target(self: &Arc<Self>, target: &MonitoringTarget) -> Result<(), AdapterError> {
		if self.ws.read().await.is_none() {
			return Err(AdapterError::connection_error(
				"Solana monitoring requires a websocket_url",
			));
		}
		let address = target.address.clone();
		// Program targets get the log subscription, everything else the
		// account subscription
		if address == TOKEN_PROGRAM_ID || address == TOKEN_2022_PROGRAM_ID {
			self.subscribe_program_logs(&address).await
		} else {
			self.subscribe_account(&address).await
		}
	}

	async fn subscribe_account(self: &Arc<Self>, address: &str) -> Result<(), AdapterError> {
		let ws = self.ws_client().await?;
		let params = json!([
			address,
			{"encoding": "jsonParsed", "commitment": self.commitment.as_str()},
		]);
		let mut subscription = ws.subscribe("accountSubscribe", params).await?;
		self.subscriptions
			.lock()
			.await
			.insert(format!("account_{}", address), subscription.id.clone());

		let inner = self.clone();
		let address = address.to_string();
		let pump = tokio::spawn(async move {
			while let Some(notification) = subscription.receiver.recv().await {
				inner.handle_account_change(&address, notification).await;
			}
		});
		self.tasks.lock().await.push(pump);
		Ok(())
	}

	async fn subscribe_program_logs(self: &Arc<Self>, program: &str) -> Result<(), AdapterError> {
		let ws = self.ws_client().await?;
		let params = json!([
			{"mentions": [program]},
			{"commitment": self.commitment.as_str()},
		]);
		let mut subscription = ws.subscribe("logsSubscribe", params).await?;
		self.subscriptions
			.lock()
			.await
			.insert(format!("logs_{}", program), subscription.id.clone());

		let inner = self.clone();
		let program = program.to_string();
		let pump = tokio::spawn(async move {
			while let Some(notification) = subscription.receiver.recv().await {
				inner.handle_program_logs(&program, notification).await;
			}
		});
		self.tasks.lock().await.push(pump);
		Ok(())
	}

	/// Unsubscribe method per purpose prefix
	fn unsubscribe_method(key: &str) -> &'static str {
		if key.starts_with("logs_") {
			"logsUnsubscribe"
		} else {
			"accountUnsubscribe"
		}
	}

	async fn teardown_monitoring(&self) {
		self.monitoring.store(false, Ordering::SeqCst);
		for task in self.tasks.lock().await.drain(..) {
			task.abort();
		}
		let subscriptions: Vec<(String, Value)> =
			self.subscriptions.lock().await.drain().collect();
		if let Some(ws) = self.ws.read().await.clone() {
			for (key, id) in subscriptions {
				let _ = ws.unsubscribe(Self::unsubscribe_method(&key), &id).await;
			}
		}
	}
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
	fn chain(&self) -> ChainKind {
		ChainKind::Solana
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

		if let Some(ws_url) = &inner.websocket_url {
			let timeout = inner.request_timeout;
			let client = inner
				.retry
				.attempt("Solana WebSocket connect", || {
					WsRpcClient::connect(ws_url, timeout)
				})
				.await?;
			*inner.ws.write().await = Some(Arc::new(client));
		}

		inner
			.retry
			.attempt("Solana slot fetch", || inner.fetch_tip())
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
			"solana: connected (slot {}, commitment {})",
			inner.tip.load(Ordering::SeqCst),
			inner.commitment.as_str()
		);
		Ok(())
	}

	async fn disconnect(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		if matches!(*inner.status.read().await, ConnectionStatus::Disconnected) {
			return Ok(());
		}
		*inner.status.write().await = ConnectionStatus::Stopping;
		inner.teardown_monitoring().await;
		if let Some(handle) = inner.heartbeat_task.lock().await.take() {
			handle.abort();
		}
		if let Some(ws) = inner.ws.write().await.take() {
			ws.close().await;
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

		let targets: Vec<MonitoringTarget> =
			inner.targets.read().await.values().cloned().collect();
		for target in &targets {
			inner.wire_target(target).await?;
		}

		*inner.status.write().await = ConnectionStatus::Monitoring;
		inner
			.emitter
			.emit_status(ConnectionStatus::Monitoring)
			.await;
		Ok(())
	}

	async fn stop_monitoring(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		inner.teardown_monitoring().await;
		if matches!(*inner.status.read().await, ConnectionStatus::Monitoring) {
			*inner.status.write().await = ConnectionStatus::Connected;
			inner.emitter.emit_status(ConnectionStatus::Connected).await;
		}
		Ok(())
	}

	async fn add_monitoring_target(&self, target: MonitoringTarget) -> Result<(), AdapterError> {
		let inner = &self.inner;
		target.validate().map_err(AdapterError::validation_error)?;
		if !self.validate_address(&target.address) {
			return Err(AdapterError::validation_error(format!(
				"'{}' is not a valid solana address",
				target.address
			)));
		}
		inner
			.targets
			.write()
			.await
			.insert(target.address.clone(), target.clone());
		if inner.monitoring.load(Ordering::SeqCst) {
			inner.wire_target(&target).await?;
		}
		Ok(())
	}

	async fn remove_monitoring_target(&self, address: &str) -> Result<(), AdapterError> {
		let inner = &self.inner;
		inner.targets.write().await.remove(address);
		inner.lamports.lock().await.remove(address);

		let to_remove: Vec<(String, Value)> = {
			let mut subscriptions = inner.subscriptions.lock().await;
			let keys: Vec<String> = subscriptions
				.keys()
				.filter(|k| k.ends_with(&format!("_{}", address)))
				.cloned()
				.collect();
			keys.into_iter()
				.filter_map(|k| subscriptions.remove(&k).map(|id| (k, id)))
				.collect()
		};
		if let Some(ws) = inner.ws.read().await.clone() {
			for (key, id) in to_remove {
				let _ = ws
					.unsubscribe(SolanaInner::unsubscribe_method(&key), &id)
					.await;
			}
		}
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
		validate_solana_address(address)
	}

	async fn estimate_fee(&self, _request: &FeeEstimateRequest) -> Result<String, AdapterError> {
		Ok(LAMPORTS_PER_SIGNATURE.to_string())
	}

	async fn last_heartbeat(&self) -> Option<Instant> {
		self.inner.heartbeat.last().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::EventKind;
	use crate::services::adapter::emitter::adapter_channel;

	const WATCHED: &str = "So11111111111111111111111111111111111111112";

	fn build_adapter() -> (SolanaAdapter, crate::services::adapter::emitter::AdapterStreams) {
		let (emitter, streams) = adapter_channel(ChainKind::Solana);
		let config = ChainConfig {
			rpc_url: "http://127.0.0.1:1".into(),
			websocket_url: None,
			max_retry_attempts: 1,
			chain_id: None,
			block_confirmation_count: None,
			commitment: Some(Commitment::Confirmed),
		};
		let adapter =
			SolanaAdapter::new(&config, &PerformanceConfig::default(), emitter).unwrap();
		(adapter, streams)
	}

	fn account_notification(slot: u64, lamports: u64) -> Value {
		json!({
			"context": {"slot": slot},
			"value": {"lamports": lamports, "owner": "11111111111111111111111111111111", "data": ["", "base64"]},
		})
	}

	#[test]
	fn test_validate_address() {
		assert!(validate_solana_address(WATCHED));
		assert!(validate_solana_address(TOKEN_PROGRAM_ID));
		assert!(!validate_solana_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
		assert!(!validate_solana_address(""));
		// Valid Base58 but not 32 bytes
		assert!(!validate_solana_address("abc"));
	}

	#[tokio::test]
	async fn test_first_account_change_only_seeds_balance() {
		let (adapter, mut streams) = build_adapter();
		adapter
			.inner()
			.handle_account_change(WATCHED, account_notification(100, 5_000_000))
			.await;
		assert!(streams.events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_lamports_delta_synthesizes_transfer() {
		let (adapter, mut streams) = build_adapter();
		let inner = adapter.inner();
		inner
			.handle_account_change(WATCHED, account_notification(100, 5_000_000))
			.await;
		inner
			.handle_account_change(WATCHED, account_notification(101, 7_500_000))
			.await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(event.kind, EventKind::Transfer);
		assert_eq!(event.block_number, 101);
		assert_eq!(event.data.amount(), Some("2500000"));
		assert_eq!(event.data.to(), Some(WATCHED));
		assert_eq!(
			event.data.metadata().get("direction").unwrap(),
			&json!("credit")
		);
	}

	#[tokio::test]
	async fn test_debit_direction_preserved() {
		let (adapter, mut streams) = build_adapter();
		let inner = adapter.inner();
		inner
			.handle_account_change(WATCHED, account_notification(100, 5_000_000))
			.await;
		inner
			.handle_account_change(WATCHED, account_notification(102, 4_000_000))
			.await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(event.data.amount(), Some("1000000"));
		assert_eq!(event.data.from(), Some(WATCHED));
		assert_eq!(
			event.data.metadata().get("direction").unwrap(),
			&json!("debit")
		);
	}

	#[tokio::test]
	async fn test_program_logs_emit_low_detail_events() {
		let (adapter, mut streams) = build_adapter();
		let notification = json!({
			"context": {"slot": 500},
			"value": {
				"signature": "5Nf3xyz",
				"err": null,
				"logs": [
					"Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA invoke [1]",
					"Program log: Instruction: Transfer",
					"Program log: Instruction: MintTo",
					"Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA success",
				],
			},
		});
		adapter
			.inner()
			.handle_program_logs(TOKEN_PROGRAM_ID, notification)
			.await;

		let first = streams.events.recv().await.unwrap();
		assert_eq!(first.kind, EventKind::Transfer);
		assert_eq!(first.id, "solana_5Nf3xyz_1");
		let second = streams.events.recv().await.unwrap();
		assert_eq!(second.kind, EventKind::TokenMint);
		assert_eq!(second.id, "solana_5Nf3xyz_2");
	}

	#[tokio::test]
	async fn test_failed_transaction_logs_dropped() {
		let (adapter, mut streams) = build_adapter();
		let notification = json!({
			"context": {"slot": 500},
			"value": {
				"signature": "bad",
				"err": {"InstructionError": [0, "Custom"]},
				"logs": ["Program log: Instruction: Transfer"],
			},
		});
		adapter
			.inner()
			.handle_program_logs(TOKEN_PROGRAM_ID, notification)
			.await;
		assert!(streams.events.try_recv().is_err());
	}
}
