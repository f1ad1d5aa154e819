//! Bitcoin chain adapter.
//!
//! UTXO model over an esplora-shaped REST API, polled on a 30-second
//! cadence. For each address target the adapter fetches recent transactions
//! and emits one `native_transfer` per transaction that references the
//! address in inputs or outputs, with the net value delta as the amount.
//! The UTXO set keyed `txid:vout`, seeded at setup, is replayed against
//! every observed transaction so each event carries the address's resulting
//! balance. A per-target block height cursor plus a seen-txid set keep
//! overlapping windows from missing or duplicating observations.

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::models::{
	CanonicalEvent, ChainConfig, ChainKind, EventKind, EventPayload, MonitoringTarget,
	NativeTransferPayload, PerformanceConfig,
};
use crate::services::adapter::adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
};
use crate::services::adapter::emitter::AdapterEmitter;
use crate::services::adapter::error::AdapterError;
use crate::services::adapter::rpc::{build_http_client, get_json, get_text};
use crate::utils::{BoundedDedupSet, RetryConfig, WithRetry};

/// Fixed confirmation count reported once the API marks a transaction
/// confirmed
const CONFIRMED_DEPTH: u64 = 6;

/// Virtual size assumed by the fee estimate (two-in, two-out P2WPKH)
const ESTIMATE_VSIZE: f64 = 140.0;

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

struct BitcoinInner {
	emitter: AdapterEmitter,
	http: ClientWithMiddleware,
	base_url: String,
	poll_interval: Duration,
	accept_testnet: bool,
	retry: WithRetry,
	tip: AtomicU64,
	heartbeat: Heartbeat,
	heartbeat_task: Mutex<Option<JoinHandle<()>>>,
	status: RwLock<ConnectionStatus>,
	monitoring: AtomicBool,
	targets: RwLock<HashMap<String, MonitoringTarget>>,
	/// Per-address UTXO set keyed `txid:vout`, value in satoshis
	utxos: Mutex<HashMap<String, HashMap<String, u64>>>,
	/// Per-address highest confirmed block seen
	height_cursors: Mutex<HashMap<String, u64>>,
	poll_task: Mutex<Option<JoinHandle<()>>>,
	seen: Mutex<BoundedDedupSet>,
}

/// Bitcoin adapter polling an esplora-compatible REST API
pub struct BitcoinAdapter {
	inner: Arc<BitcoinInner>,
}

impl BitcoinAdapter {
	pub fn new(
		config: &ChainConfig,
		performance: &PerformanceConfig,
		poll_interval_ms: u64,
		emitter: AdapterEmitter,
	) -> Result<Self, AdapterError> {
		let http = build_http_client(
			Duration::from_millis(performance.request_timeout_ms),
			config.max_retry_attempts,
		)?;
		let accept_testnet =
			config.rpc_url.contains("testnet") || config.rpc_url.contains("signet");
		Ok(Self {
			inner: Arc::new(BitcoinInner {
				emitter,
				http,
				base_url: config.rpc_url.trim_end_matches('/').to_string(),
				poll_interval: Duration::from_millis(poll_interval_ms.max(1000)),
				accept_testnet,
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
				utxos: Mutex::new(HashMap::new()),
				height_cursors: Mutex::new(HashMap::new()),
				poll_task: Mutex::new(None),
				seen: Mutex::new(BoundedDedupSet::default()),
			}),
		})
	}

	#[cfg(test)]
	fn inner(&self) -> &Arc<BitcoinInner> {
		&self.inner
	}
}

fn base58check_version(address: &str) -> Option<u8> {
	let decoded = bs58::decode(address).into_vec().ok()?;
	if decoded.len() != 25 {
		return None;
	}
	let (payload, checksum) = decoded.split_at(21);
	let digest = Sha256::digest(Sha256::digest(payload));
	if digest[..4] != checksum[..] {
		return None;
	}
	Some(payload[0])
}

fn is_bech32_shape(address: &str, hrp: &str) -> bool {
	let lower = address.to_lowercase();
	if address != lower && address != address.to_uppercase() {
		// Mixed case is invalid in bech32
		return false;
	}
	let Some(data) = lower.strip_prefix(&format!("{}1", hrp)) else {
		return false;
	};
	data.len() >= 6
		&& lower.len() <= 90
		&& data.chars().all(|c| BECH32_CHARSET.contains(c))
}

/// Accepts P2PKH (`1…`), P2SH (`3…`) and bech32 (`bc1…`) addresses, plus
/// the testnet variants when the adapter points at a test network
pub fn validate_bitcoin_address(address: &str, accept_testnet: bool) -> bool {
	if address.is_empty() {
		return false;
	}
	if is_bech32_shape(address, "bc") {
		return true;
	}
	if let Some(version) = base58check_version(address) {
		if version == 0x00 || version == 0x05 {
			return true;
		}
		if accept_testnet && (version == 0x6f || version == 0xc4) {
			return true;
		}
	}
	if accept_testnet && (is_bech32_shape(address, "tb") || is_bech32_shape(address, "bcrt")) {
		return true;
	}
	false
}

impl BitcoinInner {
	async fn fetch_tip(&self) -> Result<u64, AdapterError> {
		let url = format!("{}/blocks/tip/height", self.base_url);
		let body = get_text(&self.http, &url).await?;
		let height = body
			.trim()
			.parse::<u64>()
			.map_err(|e| AdapterError::protocol_error(format!("Bad tip height '{}': {}", body, e)))?;
		self.tip.fetch_max(height, Ordering::SeqCst);
		Ok(height)
	}

	/// Seeds the `txid:vout` UTXO set for a newly wired target
	async fn load_utxo_set(&self, address: &str) {
		let url = format!("{}/address/{}/utxo", self.base_url, address);
		match get_json(&self.http, &url).await {
			Ok(Value::Array(entries)) => {
				let mut set = HashMap::new();
				for entry in entries {
					let (Some(txid), Some(vout)) = (
						entry.get("txid").and_then(Value::as_str),
						entry.get("vout").and_then(Value::as_u64),
					) else {
						continue;
					};
					let value = entry.get("value").and_then(Value::as_u64).unwrap_or(0);
					set.insert(format!("{}:{}", txid, vout), value);
				}
				info!("bitcoin: loaded {} utxos for {}", set.len(), address);
				self.utxos.lock().await.insert(address.to_string(), set);
			}
			Ok(_) => {}
			Err(e) => warn!("bitcoin: utxo fetch for {} failed: {}", address, e),
		}
	}

	/// Applies one observed transaction to the cached UTXO set and returns
	/// the address's resulting balance in satoshis
	///
	/// Spent outpoints are removed and new outputs to the address added. No
	/// balance is reported for an address whose set was never seeded.
	async fn apply_to_utxo_set(&self, address: &str, txid: &str, tx: &Value) -> Option<u64> {
		let mut utxos = self.utxos.lock().await;
		let set = utxos.get_mut(address)?;
		if let Some(vin) = tx.get("vin").and_then(Value::as_array) {
			for input in vin {
				let spent_from = input
					.pointer("/prevout/scriptpubkey_address")
					.and_then(Value::as_str);
				if spent_from != Some(address) {
					continue;
				}
				let (Some(prev_txid), Some(prev_vout)) = (
					input.get("txid").and_then(Value::as_str),
					input.get("vout").and_then(Value::as_u64),
				) else {
					continue;
				};
				set.remove(&format!("{}:{}", prev_txid, prev_vout));
			}
		}
		if let Some(vout) = tx.get("vout").and_then(Value::as_array) {
			for (index, output) in vout.iter().enumerate() {
				if output.get("scriptpubkey_address").and_then(Value::as_str) != Some(address) {
					continue;
				}
				let value = output.get("value").and_then(Value::as_u64).unwrap_or(0);
				set.insert(format!("{}:{}", txid, index), value);
			}
		}
		Some(set.values().sum())
	}

	/// Net value movement of one transaction relative to an address:
	/// `(inputs_from, outputs_to, counterparty)`
	fn address_flows(tx: &Value, address: &str) -> (u64, u64, Option<String>) {
		let mut inputs_from = 0u64;
		let mut outputs_to = 0u64;
		let mut counterparty = None;

		if let Some(vin) = tx.get("vin").and_then(Value::as_array) {
			for input in vin {
				let prev_addr = input
					.pointer("/prevout/scriptpubkey_address")
					.and_then(Value::as_str);
				let value = input
					.pointer("/prevout/value")
					.and_then(Value::as_u64)
					.unwrap_or(0);
				if prev_addr == Some(address) {
					inputs_from += value;
				} else if counterparty.is_none() {
					counterparty = prev_addr.map(str::to_string);
				}
			}
		}
		if let Some(vout) = tx.get("vout").and_then(Value::as_array) {
			for output in vout {
				let out_addr = output
					.get("scriptpubkey_address")
					.and_then(Value::as_str);
				let value = output.get("value").and_then(Value::as_u64).unwrap_or(0);
				if out_addr == Some(address) {
					outputs_to += value;
				} else if inputs_from > 0 && counterparty.is_none() {
					counterparty = out_addr.map(str::to_string);
				}
			}
		}
		(inputs_from, outputs_to, counterparty)
	}

	/// One recent transaction for one target → at most one native_transfer
	async fn handle_transaction(&self, address: &str, tx: &Value) {
		let Some(txid) = tx.get("txid").and_then(Value::as_str) else {
			return;
		};
		if !self
			.seen
			.lock()
			.await
			.insert(format!("{}:{}", address, txid))
		{
			return;
		}

		let confirmed = tx
			.pointer("/status/confirmed")
			.and_then(Value::as_bool)
			.unwrap_or(false);
		let block_height = tx.pointer("/status/block_height").and_then(Value::as_u64);
		if let Some(height) = block_height {
			let mut cursors = self.height_cursors.lock().await;
			let cursor = cursors.entry(address.to_string()).or_insert(0);
			*cursor = (*cursor).max(height);
		}

		let (inputs_from, outputs_to, counterparty) = Self::address_flows(tx, address);
		if inputs_from == 0 && outputs_to == 0 {
			return;
		}
		let is_incoming = outputs_to >= inputs_from;
		let amount = outputs_to.abs_diff(inputs_from);
		if amount == 0 {
			return;
		}

		let fee = tx.get("fee").and_then(Value::as_u64);
		let input_count = tx
			.get("vin")
			.and_then(Value::as_array)
			.map(|v| v.len())
			.unwrap_or(0);
		let output_count = tx
			.get("vout")
			.and_then(Value::as_array)
			.map(|v| v.len())
			.unwrap_or(0);
		let vsize = tx
			.get("weight")
			.and_then(Value::as_u64)
			.map(|w| w.div_ceil(4))
			.or_else(|| tx.get("size").and_then(Value::as_u64));

		let mut payload = NativeTransferPayload {
			amount: amount.to_string(),
			fee: fee.map(|f| f.to_string()),
			..Default::default()
		};
		if is_incoming {
			payload.to = Some(address.to_string());
			payload.from = counterparty;
		} else {
			payload.from = Some(address.to_string());
			payload.to = counterparty;
		}
		payload
			.metadata
			.insert("is_incoming".into(), Value::Bool(is_incoming));
		payload
			.metadata
			.insert("input_count".into(), Value::from(input_count));
		payload
			.metadata
			.insert("output_count".into(), Value::from(output_count));
		if let Some(vsize) = vsize {
			payload.metadata.insert("vsize".into(), Value::from(vsize));
		}
		if let Some(balance) = self.apply_to_utxo_set(address, txid, tx).await {
			payload.metadata.insert("balance".into(), Value::from(balance));
		}

		let timestamp = tx
			.pointer("/status/block_time")
			.and_then(Value::as_i64)
			.map(|secs| secs * 1000)
			.unwrap_or_else(|| Utc::now().timestamp_millis());

		// The API's confirmed flag stands in for depth counting
		let event = CanonicalEvent {
			id: format!("{}_{}_{}", ChainKind::Bitcoin, txid, address),
			chain: ChainKind::Bitcoin,
			kind: EventKind::NativeTransfer,
			block_number: block_height.unwrap_or_else(|| self.tip.load(Ordering::SeqCst)),
			tx_hash: txid.to_string(),
			timestamp,
			confirmed,
			confirmation_count: if confirmed { CONFIRMED_DEPTH } else { 0 },
			data: EventPayload::NativeTransfer(payload),
		};
		self.emitter.emit_event(event).await;
	}

	async fn poll_target(&self, address: &str) {
		let url = format!("{}/address/{}/txs", self.base_url, address);
		let page = match get_json(&self.http, &url).await {
			Ok(page) => page,
			Err(e) => {
				warn!("bitcoin: tx poll for {} failed: {}", address, e);
				return;
			}
		};
		let Some(entries) = page.as_array() else {
			return;
		};
		let cursor = self
			.height_cursors
			.lock()
			.await
			.get(address)
			.copied()
			.unwrap_or(0);
		for tx in entries {
			// Confirmed transactions below the height cursor were already
			// observed in a previous window; unconfirmed ones always pass
			let height = tx.pointer("/status/block_height").and_then(Value::as_u64);
			if let Some(height) = height {
				if cursor > 0 && height < cursor {
					continue;
				}
			}
			self.handle_transaction(address, tx).await;
		}
	}

	async fn poll_tick(&self) {
		if let Err(e) = self.fetch_tip().await {
			self.emitter.emit_error(e).await;
			return;
		}
		let addresses: Vec<String> = self.targets.read().await.keys().cloned().collect();
		for address in addresses {
			self.poll_target(&address).await;
		}
	}
}

#[async_trait]
impl ChainAdapter for BitcoinAdapter {
	fn chain(&self) -> ChainKind {
		ChainKind::Bitcoin
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
			.attempt("Bitcoin tip fetch", || inner.fetch_tip())
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
			"bitcoin: connected (height {})",
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

		let addresses: Vec<String> = inner.targets.read().await.keys().cloned().collect();
		for address in &addresses {
			inner.load_utxo_set(address).await;
		}

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
		let inner = &self.inner;
		target.validate().map_err(AdapterError::validation_error)?;
		if !self.validate_address(&target.address) {
			return Err(AdapterError::validation_error(format!(
				"'{}' is not a valid bitcoin address",
				target.address
			)));
		}
		let address = target.address.clone();
		inner.targets.write().await.insert(address.clone(), target);
		if inner.monitoring.load(Ordering::SeqCst) {
			inner.load_utxo_set(&address).await;
		}
		Ok(())
	}

	async fn remove_monitoring_target(&self, address: &str) -> Result<(), AdapterError> {
		let inner = &self.inner;
		inner.targets.write().await.remove(address);
		inner.utxos.lock().await.remove(address);
		inner.height_cursors.lock().await.remove(address);
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
		validate_bitcoin_address(address, self.inner.accept_testnet)
	}

	async fn estimate_fee(&self, _request: &FeeEstimateRequest) -> Result<String, AdapterError> {
		let url = format!("{}/fee-estimates", self.inner.base_url);
		let estimates = get_json(&self.inner.http, &url).await?;
		let rate = estimates
			.get("6")
			.and_then(Value::as_f64)
			.or_else(|| estimates.get("1").and_then(Value::as_f64))
			.unwrap_or(1.0);
		Ok(((rate * ESTIMATE_VSIZE).ceil() as u64).to_string())
	}

	async fn last_heartbeat(&self) -> Option<Instant> {
		self.inner.heartbeat.last().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::adapter::emitter::adapter_channel;
	use serde_json::json;

	const TARGET: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

	fn build_adapter() -> (BitcoinAdapter, crate::services::adapter::emitter::AdapterStreams) {
		let (emitter, streams) = adapter_channel(ChainKind::Bitcoin);
		let config = ChainConfig {
			rpc_url: "http://127.0.0.1:1".into(),
			websocket_url: None,
			max_retry_attempts: 1,
			chain_id: None,
			block_confirmation_count: None,
			commitment: None,
		};
		let adapter =
			BitcoinAdapter::new(&config, &PerformanceConfig::default(), 30_000, emitter).unwrap();
		(adapter, streams)
	}

	#[test]
	fn test_validate_mainnet_addresses() {
		// Genesis block reward address
		assert!(validate_bitcoin_address(
			"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
			false
		));
		// Multisig-style P2SH
		assert!(validate_bitcoin_address(
			"3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
			false
		));
		assert!(validate_bitcoin_address(TARGET, false));
		assert!(!validate_bitcoin_address("", false));
		assert!(!validate_bitcoin_address(
			"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
			false
		));
		// Corrupted base58 checksum
		assert!(!validate_bitcoin_address(
			"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb",
			false
		));
	}

	#[test]
	fn test_testnet_addresses_gated() {
		assert!(!validate_bitcoin_address(
			"tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
			false
		));
		assert!(validate_bitcoin_address(
			"tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
			true
		));
	}

	fn incoming_tx() -> Value {
		json!({
			"txid": "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
			"fee": 1000,
			"weight": 560,
			"status": {"confirmed": true, "block_height": 870000, "block_time": 1700000000},
			"vin": [
				{"prevout": {"scriptpubkey_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "value": 60000}}
			],
			"vout": [
				{"scriptpubkey_address": TARGET, "value": 50000},
				{"scriptpubkey_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "value": 9000}
			],
		})
	}

	#[tokio::test]
	async fn test_incoming_transfer() {
		let (adapter, mut streams) = build_adapter();
		adapter.inner().handle_transaction(TARGET, &incoming_tx()).await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(event.kind, EventKind::NativeTransfer);
		assert_eq!(event.data.amount(), Some("50000"));
		assert_eq!(event.data.fee(), Some("1000"));
		assert_eq!(event.data.to(), Some(TARGET));
		assert!(event.confirmed);
		assert_eq!(event.confirmation_count, 6);
		let metadata = event.data.metadata();
		assert_eq!(metadata.get("is_incoming").unwrap(), &json!(true));
		assert_eq!(metadata.get("vsize").unwrap(), &json!(140));
		// No balance without a seeded UTXO set
		assert!(metadata.get("balance").is_none());
	}

	#[tokio::test]
	async fn test_seeded_utxo_set_reports_balance() {
		let (adapter, mut streams) = build_adapter();
		adapter
			.inner()
			.utxos
			.lock()
			.await
			.insert(TARGET.to_string(), std::collections::HashMap::new());

		adapter.inner().handle_transaction(TARGET, &incoming_tx()).await;

		let event = streams.events.recv().await.unwrap();
		assert_eq!(
			event.data.metadata().get("balance").unwrap(),
			&json!(50000)
		);
		let utxos = adapter.inner().utxos.lock().await;
		let set = utxos.get(TARGET).unwrap();
		assert_eq!(
			set.get("f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16:0"),
			Some(&50000u64)
		);
		assert_eq!(set.len(), 1);
	}

	#[tokio::test]
	async fn test_spend_removes_utxo_and_keeps_change() {
		let (adapter, mut streams) = build_adapter();
		let funding = "aa00000000000000000000000000000000000000000000000000000000000001";
		let spend = "cc00000000000000000000000000000000000000000000000000000000000003";
		adapter.inner().utxos.lock().await.insert(
			TARGET.to_string(),
			std::collections::HashMap::from([(format!("{}:0", funding), 80000u64)]),
		);

		let tx = json!({
			"txid": spend,
			"fee": 500,
			"status": {"confirmed": true, "block_height": 870001},
			"vin": [
				{
					"txid": funding,
					"vout": 0,
					"prevout": {"scriptpubkey_address": TARGET, "value": 80000},
				}
			],
			"vout": [
				{"scriptpubkey_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "value": 70000},
				{"scriptpubkey_address": TARGET, "value": 9500}
			],
		});
		adapter.inner().handle_transaction(TARGET, &tx).await;

		let event = streams.events.recv().await.unwrap();
		// Only the change output remains
		assert_eq!(
			event.data.metadata().get("balance").unwrap(),
			&json!(9500)
		);
		let utxos = adapter.inner().utxos.lock().await;
		let set = utxos.get(TARGET).unwrap();
		assert!(!set.contains_key(&format!("{}:0", funding)));
		assert_eq!(set.get(&format!("{}:1", spend)), Some(&9500u64));
	}

	#[tokio::test]
	async fn test_outgoing_net_delta() {
		let (adapter, mut streams) = build_adapter();
		let tx = json!({
			"txid": "aa00000000000000000000000000000000000000000000000000000000000001",
			"fee": 500,
			"status": {"confirmed": false},
			"vin": [
				{"prevout": {"scriptpubkey_address": TARGET, "value": 80000}}
			],
			"vout": [
				{"scriptpubkey_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "value": 70000},
				{"scriptpubkey_address": TARGET, "value": 9500}
			],
		});
		adapter.inner().handle_transaction(TARGET, &tx).await;

		let event = streams.events.recv().await.unwrap();
		// |outputs_to - inputs_from| = |9500 - 80000|
		assert_eq!(event.data.amount(), Some("70500"));
		assert_eq!(event.data.from(), Some(TARGET));
		assert!(!event.confirmed);
		assert_eq!(event.confirmation_count, 0);
	}

	#[tokio::test]
	async fn test_unrelated_transaction_ignored() {
		let (adapter, mut streams) = build_adapter();
		let tx = json!({
			"txid": "bb00000000000000000000000000000000000000000000000000000000000002",
			"status": {"confirmed": true, "block_height": 1},
			"vin": [{"prevout": {"scriptpubkey_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "value": 100}}],
			"vout": [{"scriptpubkey_address": "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", "value": 90}],
		});
		adapter.inner().handle_transaction(TARGET, &tx).await;
		assert!(streams.events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_seen_txid_suppressed() {
		let (adapter, mut streams) = build_adapter();
		adapter.inner().handle_transaction(TARGET, &incoming_tx()).await;
		adapter.inner().handle_transaction(TARGET, &incoming_tx()).await;
		assert!(streams.events.recv().await.is_some());
		assert!(streams.events.try_recv().is_err());
	}
}
