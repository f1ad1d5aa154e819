//! EVM chain adapter.
//!
//! Serves Ethereum and BSC (same logic, different chain id and confirmation
//! depth) plus the Base58-validating TRX variant. A WebSocket provider is
//! preferred for push subscriptions (`newHeads` for the tip, per-target log
//! subscriptions for token activity); the JSON-RPC HTTP provider backs block
//! fetches and doubles as a polling fallback when no WebSocket endpoint is
//! configured. Native value transfers produce no logs, so they are found by
//! scanning the transactions of each new block against address targets.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use web3::types::U256;

use super::decode::{
	self, decode_transfer_log, normalize_address, parse_quantity, parse_u256, EvmLog,
	ERC20_TRANSFER_TOPIC, KNOWN_MINT_TOPICS,
};
use crate::models::{
	CanonicalEvent, ChainConfig, ChainKind, ContractCreationPayload, EventKind, EventPayload,
	MonitoringTarget, NativeTransferPayload, NftMintPayload, NftTransferPayload,
	PerformanceConfig, TargetKind, TokenMintPayload, TransferPayload,
};
use crate::services::adapter::adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
};
use crate::services::adapter::emitter::AdapterEmitter;
use crate::services::adapter::error::AdapterError;
use crate::services::adapter::rpc::HttpRpcClient;
use crate::services::adapter::tron::validate_tron_address;
use crate::services::adapter::ws::WsRpcClient;
use crate::utils::{BoundedDedupSet, RetryConfig, WithRetry};

/// Address forms the adapter's validator accepts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvmAddressFormat {
	/// 0x-prefixed 20-byte hex only
	Hex,
	/// 0x-hex or Base58check `T…` addresses (TRX-as-EVM variant)
	HexOrBase58,
}

const DEFAULT_TRANSFER_GAS: u64 = 21_000;

struct EvmInner {
	chain: ChainKind,
	emitter: AdapterEmitter,
	http: HttpRpcClient,
	websocket_url: Option<String>,
	ws: RwLock<Option<Arc<WsRpcClient>>>,
	request_timeout: Duration,
	poll_interval: Duration,
	confirmations: u64,
	address_format: EvmAddressFormat,
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
	dedup: Mutex<BoundedDedupSet>,
}

/// EVM-compatible chain adapter
pub struct EvmAdapter {
	inner: Arc<EvmInner>,
}

impl EvmAdapter {
	pub fn new(
		chain: ChainKind,
		config: &ChainConfig,
		performance: &PerformanceConfig,
		poll_interval_ms: u64,
		emitter: AdapterEmitter,
		address_format: EvmAddressFormat,
	) -> Result<Self, AdapterError> {
		let request_timeout = Duration::from_millis(performance.request_timeout_ms);
		let http = HttpRpcClient::new(&config.rpc_url, request_timeout, config.max_retry_attempts)?;
		Ok(Self {
			inner: Arc::new(EvmInner {
				chain,
				emitter,
				http,
				websocket_url: config.websocket_url.clone(),
				ws: RwLock::new(None),
				request_timeout,
				poll_interval: Duration::from_millis(poll_interval_ms.max(100)),
				confirmations: config.confirmations_for(chain),
				address_format,
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
				dedup: Mutex::new(BoundedDedupSet::default()),
			}),
		})
	}

	#[cfg(test)]
	fn inner(&self) -> &Arc<EvmInner> {
		&self.inner
	}
}

impl EvmInner {
	async fn fetch_tip(&self) -> Result<u64, AdapterError> {
		let result = self.http.call("eth_blockNumber", json!([])).await?;
		let raw = result
			.as_str()
			.ok_or_else(|| AdapterError::protocol_error("eth_blockNumber returned non-string"))?;
		let tip = parse_quantity(raw)?;
		self.tip.fetch_max(tip, Ordering::SeqCst);
		Ok(tip)
	}

	async fn ws_client(&self) -> Result<Arc<WsRpcClient>, AdapterError> {
		self.ws
			.read()
			.await
			.clone()
			.ok_or_else(|| AdapterError::connection_error("WebSocket provider not connected"))
	}

	/// Addresses of registered address-kind targets, normalized
	async fn address_targets(&self) -> HashSet<String> {
		self.targets
			.read()
			.await
			.values()
			.filter(|t| t.kind == TargetKind::Address)
			.map(|t| normalize_address(&t.address))
			.collect()
	}

	/// Addresses of registered contract/token-kind targets, normalized
	async fn contract_targets(&self) -> HashSet<String> {
		self.targets
			.read()
			.await
			.values()
			.filter(|t| t.kind != TargetKind::Address)
			.map(|t| normalize_address(&t.address))
			.collect()
	}

	fn now_ms() -> i64 {
		Utc::now().timestamp_millis()
	}

	async fn emit_deduped(&self, event: CanonicalEvent) {
		if self.dedup.lock().await.insert(event.id.clone()) {
			self.emitter.emit_event(event).await;
		}
	}

	/// Decodes one log frame and emits the matching canonical event
	///
	/// Any single failed decode logs and continues; event loss is preferred
	/// over adapter death.
	async fn handle_log(&self, value: Value) {
		let log = match EvmLog::from_value(&value) {
			Ok(log) => log,
			Err(e) => {
				warn!("{}: dropping undecodable log: {}", self.chain, e);
				return;
			}
		};

		let contract_targets = self.contract_targets().await;
		let address_targets = self.address_targets().await;
		let tip = self.tip.load(Ordering::SeqCst).max(log.block_number);

		let payload = if log.is_transfer() {
			let decoded = match decode_transfer_log(&log) {
				Ok(decoded) => decoded,
				Err(e) => {
					warn!("{}: dropping malformed Transfer log: {}", self.chain, e);
					return;
				}
			};
			let relevant = contract_targets.contains(&log.address)
				|| address_targets.contains(&decoded.from)
				|| address_targets.contains(&decoded.to);
			if !relevant {
				return;
			}
			if decoded.is_nft() {
				let token_id = decoded.token_id.map(|id| id.to_string());
				if decoded.is_mint() {
					EventPayload::NftMint(NftMintPayload {
						to: Some(decoded.to),
						token_id,
						contract_address: Some(log.address.clone()),
						..Default::default()
					})
				} else {
					EventPayload::NftTransfer(NftTransferPayload {
						from: Some(decoded.from),
						to: Some(decoded.to),
						token_id,
						contract_address: Some(log.address.clone()),
						..Default::default()
					})
				}
			} else if decoded.is_mint() {
				EventPayload::TokenMint(TokenMintPayload {
					to: Some(decoded.to),
					amount: decoded.amount.map(|a| a.to_string()),
					token_address: Some(log.address.clone()),
					..Default::default()
				})
			} else {
				EventPayload::Transfer(TransferPayload {
					from: Some(decoded.from),
					to: Some(decoded.to),
					amount: decoded.amount.map(|a| a.to_string()),
					token_address: Some(log.address.clone()),
					..Default::default()
				})
			}
		} else if log.is_known_mint_signature() {
			if !contract_targets.contains(&log.address) {
				return;
			}
			let to = log.topics.get(1).map(|t| decode::topic_to_address(*t));
			let amount = if log.data.len() == 32 {
				Some(U256::from_big_endian(&log.data).to_string())
			} else {
				None
			};
			EventPayload::TokenMint(TokenMintPayload {
				to,
				amount,
				token_address: Some(log.address.clone()),
				..Default::default()
			})
		} else {
			return;
		};

		let event = CanonicalEvent::new(
			self.chain,
			log.tx_hash.clone(),
			Some(log.log_index),
			log.block_number,
			tip,
			self.confirmations,
			Self::now_ms(),
			payload,
		);
		self.emit_deduped(event).await;
	}

	/// Scans one full block's transactions for native transfers touching
	/// address targets
	async fn process_block(&self, block: &Value) {
		let Some(number) = block
			.get("number")
			.and_then(Value::as_str)
			.and_then(|n| parse_quantity(n).ok())
		else {
			return;
		};
		self.tip.fetch_max(number, Ordering::SeqCst);
		let tip = self.tip.load(Ordering::SeqCst);
		let timestamp = block
			.get("timestamp")
			.and_then(Value::as_str)
			.and_then(|t| parse_quantity(t).ok())
			.map(|secs| secs as i64 * 1000)
			.unwrap_or_else(Self::now_ms);

		let address_targets = self.address_targets().await;
		if address_targets.is_empty() {
			return;
		}
		let Some(transactions) = block.get("transactions").and_then(Value::as_array) else {
			return;
		};

		for tx in transactions {
			let Some(hash) = tx.get("hash").and_then(Value::as_str) else {
				continue;
			};
			let from = tx
				.get("from")
				.and_then(Value::as_str)
				.map(normalize_address);
			let to = tx.get("to").and_then(Value::as_str).map(normalize_address);
			let value = tx
				.get("value")
				.and_then(Value::as_str)
				.and_then(|v| parse_u256(v).ok())
				.unwrap_or_else(U256::zero);
			let gas_price = tx
				.get("gasPrice")
				.and_then(Value::as_str)
				.and_then(|v| parse_u256(v).ok());

			let from_matches = from.as_deref().is_some_and(|a| address_targets.contains(a));
			let to_matches = to.as_deref().is_some_and(|a| address_targets.contains(a));
			if !from_matches && !to_matches {
				continue;
			}

			let payload = if to.is_none() {
				// `to == null` marks a contract deployment; the deployed
				// address only exists in the receipt
				EventPayload::ContractCreation(ContractCreationPayload {
					creator: from.clone(),
					contract_address: None,
					..Default::default()
				})
			} else {
				if value.is_zero() {
					continue;
				}
				EventPayload::NativeTransfer(NativeTransferPayload {
					from: from.clone(),
					to: to.clone(),
					amount: value.to_string(),
					gas_price: gas_price.map(|p| p.to_string()),
					..Default::default()
				})
			};

			let event = CanonicalEvent::new(
				self.chain,
				hash,
				None,
				number,
				tip,
				self.confirmations,
				timestamp,
				payload,
			);
			self.emit_deduped(event).await;
		}
	}

	/// Whether a target needs log subscriptions at all
	fn wants_logs(target: &MonitoringTarget) -> bool {
		target.event_kinds.iter().any(|k| {
			matches!(
				k,
				EventKind::Transfer
					| EventKind::TokenMint
					| EventKind::TokenBurn
					| EventKind::NftTransfer
					| EventKind::NftMint
			)
		})
	}

	/// Registers the WebSocket log subscriptions for one target
	async fn wire_target(self: &Arc<Self>, target: &MonitoringTarget) -> Result<(), AdapterError> {
		if self.ws.read().await.is_none() || !Self::wants_logs(target) {
			// Polling fallback covers log scans; native transfers are
			// handled by the block scan in both modes
			return Ok(());
		}
		let address = normalize_address(&target.address);
		match target.kind {
			TargetKind::Address => {
				let topic = decode::h256_to_string(decode::address_to_topic(&address)?);
				self.subscribe_logs(
					"logs_from",
					&address,
					json!({"topics": [ERC20_TRANSFER_TOPIC, topic.clone()]}),
				)
				.await?;
				self.subscribe_logs(
					"logs_to",
					&address,
					json!({"topics": [ERC20_TRANSFER_TOPIC, Value::Null, topic]}),
				)
				.await?;
			}
			TargetKind::Contract | TargetKind::Token => {
				self.subscribe_logs(
					"logs_contract",
					&address,
					json!({"address": address.clone(), "topics": [ERC20_TRANSFER_TOPIC]}),
				)
				.await?;
				self.subscribe_logs(
					"logs_mint",
					&address,
					json!({"address": address.clone(), "topics": [KNOWN_MINT_TOPICS]}),
				)
				.await?;
			}
		}
		Ok(())
	}

	async fn subscribe_logs(
		self: &Arc<Self>,
		purpose: &str,
		address: &str,
		filter: Value,
	) -> Result<(), AdapterError> {
		let ws = self.ws_client().await?;
		let mut subscription = ws.subscribe("eth_subscribe", json!(["logs", filter])).await?;
		self.subscriptions
			.lock()
			.await
			.insert(format!("{}_{}", purpose, address), subscription.id.clone());

		let inner = self.clone();
		let pump = tokio::spawn(async move {
			while let Some(notification) = subscription.receiver.recv().await {
				inner.handle_log(notification).await;
			}
		});
		self.tasks.lock().await.push(pump);
		Ok(())
	}

	/// Subscribes to new heads: drives the tip and the native-transfer scan
	async fn wire_new_heads(self: &Arc<Self>) -> Result<(), AdapterError> {
		let ws = self.ws_client().await?;
		let mut subscription = ws.subscribe("eth_subscribe", json!(["newHeads"])).await?;
		self.subscriptions
			.lock()
			.await
			.insert("new_heads".to_string(), subscription.id.clone());

		let inner = self.clone();
		let pump = tokio::spawn(async move {
			while let Some(head) = subscription.receiver.recv().await {
				let Some(number) = head.get("number").and_then(Value::as_str) else {
					continue;
				};
				if let Ok(n) = parse_quantity(number) {
					inner.tip.fetch_max(n, Ordering::SeqCst);
				}
				// Heads omit transaction bodies; refetch the block for the
				// native scan
				match inner
					.http
					.call("eth_getBlockByNumber", json!([number, true]))
					.await
				{
					Ok(block) if !block.is_null() => inner.process_block(&block).await,
					Ok(_) => {}
					Err(e) => {
						warn!("{}: block fetch for head {} failed: {}", inner.chain, number, e)
					}
				}
			}
		});
		self.tasks.lock().await.push(pump);
		Ok(())
	}

	/// Polling fallback when no WebSocket endpoint is configured
	async fn spawn_poll_loop(self: &Arc<Self>) {
		let inner = self.clone();
		let task = tokio::spawn(async move {
			let mut last = inner.tip.load(Ordering::SeqCst);
			let mut interval = tokio::time::interval(inner.poll_interval);
			interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			while inner.monitoring.load(Ordering::SeqCst) {
				interval.tick().await;
				let tip = match inner.fetch_tip().await {
					Ok(tip) => tip,
					Err(e) => {
						inner.emitter.emit_error(e).await;
						continue;
					}
				};
				if tip <= last {
					continue;
				}
				// Cap the catch-up window so a long outage cannot stall the
				// loop on thousands of block fetches
				let start = (last + 1).max(tip.saturating_sub(50));
				for number in start..=tip {
					match inner
						.http
						.call(
							"eth_getBlockByNumber",
							json!([format!("0x{:x}", number), true]),
						)
						.await
					{
						Ok(block) if !block.is_null() => inner.process_block(&block).await,
						Ok(_) => {}
						Err(e) => {
							warn!("{}: block {} fetch failed: {}", inner.chain, number, e)
						}
					}
				}
				let filter = json!([{
					"fromBlock": format!("0x{:x}", start),
					"toBlock": format!("0x{:x}", tip),
					"topics": [ERC20_TRANSFER_TOPIC],
				}]);
				match inner.http.call("eth_getLogs", filter).await {
					Ok(Value::Array(logs)) => {
						for log in logs {
							inner.handle_log(log).await;
						}
					}
					Ok(_) => {}
					Err(e) => warn!("{}: eth_getLogs failed: {}", inner.chain, e),
				}
				last = tip;
			}
		});
		self.tasks.lock().await.push(task);
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
				debug!("{}: unsubscribing {}", self.chain, key);
				let _ = ws.unsubscribe("eth_unsubscribe", &id).await;
			}
		}
	}
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
	fn chain(&self) -> ChainKind {
		self.inner.chain
	}

	async fn connect(&self) -> Result<(), AdapterError> {
		let inner = &self.inner;
		{
			let status = inner.status.read().await;
			if matches!(
				*status,
				ConnectionStatus::Connected | ConnectionStatus::Monitoring
			) {
				return Ok(());
			}
		}
		*inner.status.write().await = ConnectionStatus::Connecting;
		inner.emitter.emit_status(ConnectionStatus::Connecting).await;

		if let Some(ws_url) = &inner.websocket_url {
			let timeout = inner.request_timeout;
			let client = inner
				.retry
				.attempt("EVM WebSocket connect", || {
					WsRpcClient::connect(ws_url, timeout)
				})
				.await?;
			*inner.ws.write().await = Some(Arc::new(client));
		}

		inner.retry.attempt("EVM tip fetch", || inner.fetch_tip()).await?;
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
			"{}: connected (tip {})",
			inner.chain,
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
		info!("{}: disconnected", inner.chain);
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

		if inner.ws.read().await.is_some() {
			inner.wire_new_heads().await?;
			let targets: Vec<MonitoringTarget> =
				inner.targets.read().await.values().cloned().collect();
			for target in &targets {
				inner.wire_target(target).await?;
			}
		} else {
			inner.spawn_poll_loop().await;
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
				"'{}' is not a valid {} address",
				target.address, inner.chain
			)));
		}
		let key = normalize_address(&target.address);
		inner.targets.write().await.insert(key, target.clone());
		if inner.monitoring.load(Ordering::SeqCst) {
			inner.wire_target(&target).await?;
		}
		Ok(())
	}

	async fn remove_monitoring_target(&self, address: &str) -> Result<(), AdapterError> {
		let inner = &self.inner;
		let key = normalize_address(address);
		inner.targets.write().await.remove(&key);

		let to_remove: Vec<(String, Value)> = {
			let mut subscriptions = inner.subscriptions.lock().await;
			let keys: Vec<String> = subscriptions
				.keys()
				.filter(|k| k.ends_with(&format!("_{}", key)))
				.cloned()
				.collect();
			keys.into_iter()
				.filter_map(|k| subscriptions.remove(&k).map(|id| (k, id)))
				.collect()
		};
		if let Some(ws) = inner.ws.read().await.clone() {
			for (_, id) in to_remove {
				let _ = ws.unsubscribe("eth_unsubscribe", &id).await;
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
		let is_hex = address.len() == 42
			&& address.starts_with("0x")
			&& address[2..].chars().all(|c| c.is_ascii_hexdigit());
		match self.inner.address_format {
			EvmAddressFormat::Hex => is_hex,
			EvmAddressFormat::HexOrBase58 => is_hex || validate_tron_address(address),
		}
	}

	async fn estimate_fee(&self, request: &FeeEstimateRequest) -> Result<String, AdapterError> {
		let inner = &self.inner;
		let gas_price = inner.http.call("eth_gasPrice", json!([])).await?;
		let gas_price = gas_price
			.as_str()
			.map(parse_u256)
			.transpose()?
			.unwrap_or_else(U256::zero);

		let gas = if request.to.is_some() && request.data.is_some() {
			let mut call = serde_json::Map::new();
			if let Some(from) = &request.from {
				call.insert("from".into(), json!(from));
			}
			call.insert("to".into(), json!(request.to));
			if let Some(data) = &request.data {
				call.insert("data".into(), json!(data));
			}
			match inner.http.call("eth_estimateGas", json!([call])).await {
				Ok(Value::String(raw)) => parse_u256(&raw)?,
				_ => U256::from(DEFAULT_TRANSFER_GAS),
			}
		} else {
			U256::from(DEFAULT_TRANSFER_GAS)
		};
		Ok((gas_price * gas).to_string())
	}

	async fn last_heartbeat(&self) -> Option<Instant> {
		self.inner.heartbeat.last().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::adapter::emitter::adapter_channel;

	fn test_config() -> ChainConfig {
		ChainConfig {
			rpc_url: "http://127.0.0.1:1".into(),
			websocket_url: None,
			max_retry_attempts: 1,
			chain_id: Some(1),
			block_confirmation_count: Some(6),
			commitment: None,
		}
	}

	fn build_adapter(
		chain: ChainKind,
		format: EvmAddressFormat,
	) -> (EvmAdapter, crate::services::adapter::emitter::AdapterStreams) {
		let (emitter, streams) = adapter_channel(chain);
		let adapter = EvmAdapter::new(
			chain,
			&test_config(),
			&PerformanceConfig::default(),
			1000,
			emitter,
			format,
		)
		.unwrap();
		(adapter, streams)
	}

	#[tokio::test]
	async fn test_validate_hex_address() {
		let (adapter, _streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		assert!(adapter.validate_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
		assert!(!adapter.validate_address("0xa0b86991"));
		assert!(!adapter.validate_address("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
		assert!(!adapter.validate_address("TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"));
	}

	#[tokio::test]
	async fn test_trx_variant_accepts_base58() {
		let (adapter, _streams) = build_adapter(ChainKind::Tron, EvmAddressFormat::HexOrBase58);
		assert!(adapter.validate_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
		assert!(adapter.validate_address("TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"));
		assert!(!adapter.validate_address("Tshort"));
	}

	#[tokio::test]
	async fn test_add_target_rejects_bad_address() {
		let (adapter, _streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let target = MonitoringTarget::new(
			"bad",
			TargetKind::Address,
			"not-an-address",
			vec![EventKind::Transfer],
		);
		let err = adapter.add_monitoring_target(target).await.unwrap_err();
		assert!(matches!(err, AdapterError::ValidationError(_)));
	}

	#[tokio::test]
	async fn test_block_scan_emits_native_transfer() {
		let (adapter, mut streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let watched = "0x1111111111111111111111111111111111111111";
		adapter
			.add_monitoring_target(MonitoringTarget::new(
				"w",
				TargetKind::Address,
				watched,
				vec![EventKind::NativeTransfer],
			))
			.await
			.unwrap();

		let block = json!({
			"number": "0x64",
			"timestamp": "0x650000",
			"transactions": [
				{
					"hash": "0xaaa1",
					"from": watched,
					"to": "0x2222222222222222222222222222222222222222",
					"value": "0xde0b6b3a7640000",
					"gasPrice": "0x3b9aca00",
				},
				{
					"hash": "0xaaa2",
					"from": "0x3333333333333333333333333333333333333333",
					"to": "0x4444444444444444444444444444444444444444",
					"value": "0x1",
				},
			],
		});
		adapter.inner().process_block(&block).await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(event.kind, EventKind::NativeTransfer);
		assert_eq!(event.block_number, 100);
		assert_eq!(event.data.amount(), Some("1000000000000000000"));
		assert_eq!(event.data.from(), Some(watched));
		// The unrelated transaction must not have produced a second event
		assert!(streams.events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_block_scan_skips_zero_value() {
		let (adapter, mut streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let watched = "0x1111111111111111111111111111111111111111";
		adapter
			.add_monitoring_target(MonitoringTarget::new(
				"w",
				TargetKind::Address,
				watched,
				vec![EventKind::NativeTransfer],
			))
			.await
			.unwrap();

		let block = json!({
			"number": "0x65",
			"transactions": [
				{"hash": "0xbbb", "from": watched, "to": watched, "value": "0x0"},
			],
		});
		adapter.inner().process_block(&block).await;
		assert!(streams.events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_handle_log_emits_transfer_for_contract_target() {
		let (adapter, mut streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let token = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
		adapter
			.add_monitoring_target(MonitoringTarget::new(
				"usdc",
				TargetKind::Contract,
				token,
				vec![EventKind::Transfer],
			))
			.await
			.unwrap();
		adapter.inner().tip.store(106, Ordering::SeqCst);

		let log = json!({
			"address": token,
			"topics": [
				ERC20_TRANSFER_TOPIC,
				format!("0x{:0>64}", "a1b2000000000000000000000000000000000000"),
				format!("0x{:0>64}", "c3d4000000000000000000000000000000000000"),
			],
			"data": "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
			"blockNumber": "0x64",
			"transactionHash": "0xcafe",
			"logIndex": "0x0",
		});
		adapter.inner().handle_log(log).await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(event.kind, EventKind::Transfer);
		assert_eq!(event.confirmation_count, 6);
		assert!(event.confirmed);
		assert_eq!(event.data.amount(), Some("1000000000000000000"));
		assert_eq!(event.data.token_address(), Some(token));
	}

	#[tokio::test]
	async fn test_duplicate_log_suppressed() {
		let (adapter, mut streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let token = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
		adapter
			.add_monitoring_target(MonitoringTarget::new(
				"usdc",
				TargetKind::Contract,
				token,
				vec![EventKind::Transfer],
			))
			.await
			.unwrap();

		let log = json!({
			"address": token,
			"topics": [
				ERC20_TRANSFER_TOPIC,
				format!("0x{:0>64}", "a1"),
				format!("0x{:0>64}", "b2"),
			],
			"data": format!("0x{:064x}", 5),
			"blockNumber": "0x10",
			"transactionHash": "0xdup",
			"logIndex": "0x1",
		});
		adapter.inner().handle_log(log.clone()).await;
		adapter.inner().handle_log(log).await;

		assert!(streams.events.recv().await.is_some());
		assert!(streams.events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_start_monitoring_requires_connection() {
		let (adapter, _streams) = build_adapter(ChainKind::Ethereum, EvmAddressFormat::Hex);
		let err = adapter.start_monitoring().await.unwrap_err();
		assert!(matches!(err, AdapterError::ConnectionError(_)));
	}
}
