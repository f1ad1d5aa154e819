//! Native Tron adapter.
//!
//! Polls the Tron HTTP API directly instead of going through the EVM
//! adapter: contract targets poll the per-contract event API on a trailing
//! one-minute window capped at 50 events per poll, address targets poll the
//! account transaction history (native TransferContract plus TRC-20
//! movements). TRC-20/TRC-721 share the Transfer signature with their ERC
//! counterparts, so classification is by event name.

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::{tron_hex_to_base58, validate_tron_address};
use crate::models::{
	format_units, CanonicalEvent, ChainConfig, ChainKind, EventPayload, MonitoringTarget,
	NativeTransferPayload, PerformanceConfig, TargetKind, TokenBurnPayload, TokenMintPayload,
	TransferPayload,
};
use crate::services::adapter::adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
};
use crate::services::adapter::emitter::AdapterEmitter;
use crate::services::adapter::error::AdapterError;
use crate::services::adapter::rpc::{build_http_client, get_json};
use crate::utils::{BoundedDedupSet, RetryConfig, WithRetry};

/// Trailing window each contract-event poll requests
const POLL_WINDOW_MS: i64 = 60_000;

/// Page cap per poll
const POLL_PAGE_LIMIT: u32 = 50;

/// Fallback fee estimate: bandwidth for a ~268 byte transaction at the
/// default 1000 sun per byte
const FALLBACK_FEE_SUN: u64 = 268_000;

struct TronInner {
	emitter: AdapterEmitter,
	http: ClientWithMiddleware,
	base_url: String,
	poll_interval: Duration,
	confirmations: u64,
	retry: WithRetry,
	tip: AtomicU64,
	heartbeat: Heartbeat,
	heartbeat_task: Mutex<Option<JoinHandle<()>>>,
	status: RwLock<ConnectionStatus>,
	monitoring: AtomicBool,
	targets: RwLock<HashMap<String, MonitoringTarget>>,
	poll_task: Mutex<Option<JoinHandle<()>>>,
	dedup: Mutex<BoundedDedupSet>,
}

/// Tron adapter speaking the native HTTP API
pub struct TronAdapter {
	inner: Arc<TronInner>,
}

impl TronAdapter {
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
		Ok(Self {
			inner: Arc::new(TronInner {
				emitter,
				http,
				base_url: config.rpc_url.trim_end_matches('/').to_string(),
				poll_interval: Duration::from_millis(poll_interval_ms.max(500)),
				confirmations: config.confirmations_for(ChainKind::Tron),
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
				poll_task: Mutex::new(None),
				dedup: Mutex::new(BoundedDedupSet::default()),
			}),
		})
	}

	#[cfg(test)]
	fn inner(&self) -> &Arc<TronInner> {
		&self.inner
	}
}

impl TronInner {
	async fn fetch_tip(&self) -> Result<u64, AdapterError> {
		let url = format!("{}/wallet/getnowblock", self.base_url);
		let block = get_json(&self.http, &url).await?;
		let number = block
			.pointer("/block_header/raw_data/number")
			.and_then(Value::as_u64)
			.ok_or_else(|| AdapterError::protocol_error("getnowblock missing block number"))?;
		self.tip.fetch_max(number, Ordering::SeqCst);
		Ok(number)
	}

	async fn emit_deduped(&self, event: CanonicalEvent) {
		if self.dedup.lock().await.insert(event.id.clone()) {
			self.emitter.emit_event(event).await;
		}
	}

	/// One contract-event page entry → canonical event, classified by name
	async fn handle_contract_event(&self, entry: &Value) {
		let Some(tx_id) = entry.get("transaction_id").and_then(Value::as_str) else {
			return;
		};
		let event_name = entry
			.get("event_name")
			.and_then(Value::as_str)
			.unwrap_or("")
			.to_lowercase();
		let contract = entry
			.get("contract_address")
			.and_then(Value::as_str)
			.map(str::to_string);
		let block_number = entry
			.get("block_number")
			.and_then(Value::as_u64)
			.unwrap_or_else(|| self.tip.load(Ordering::SeqCst));
		let timestamp = entry
			.get("block_timestamp")
			.and_then(Value::as_i64)
			.unwrap_or_else(|| Utc::now().timestamp_millis());
		let event_index = entry.get("event_index").and_then(Value::as_u64).unwrap_or(0);

		let result = entry.get("result").cloned().unwrap_or(Value::Null);
		let field = |names: &[&str]| -> Option<String> {
			names
				.iter()
				.find_map(|n| result.get(n).and_then(Value::as_str))
				.map(|raw| {
					// The event API reports 41-prefixed hex parties
					tron_hex_to_base58(raw).unwrap_or_else(|| raw.to_string())
				})
		};
		let amount = ["value", "amount", "2"]
			.iter()
			.find_map(|n| result.get(*n))
			.and_then(|v| match v {
				Value::String(s) => Some(s.clone()),
				Value::Number(n) => Some(n.to_string()),
				_ => None,
			});

		let payload = if event_name.contains("transfer") {
			EventPayload::Transfer(TransferPayload {
				from: field(&["from", "_from", "0"]),
				to: field(&["to", "_to", "1"]),
				amount,
				token_address: contract,
				..Default::default()
			})
		} else if event_name.contains("mint") {
			EventPayload::TokenMint(TokenMintPayload {
				to: field(&["to", "_to", "0"]),
				amount,
				token_address: contract,
				..Default::default()
			})
		} else if event_name.contains("burn") {
			EventPayload::TokenBurn(TokenBurnPayload {
				from: field(&["from", "_from", "0"]),
				amount,
				token_address: contract,
				..Default::default()
			})
		} else {
			return;
		};

		let event = CanonicalEvent::new(
			ChainKind::Tron,
			tx_id,
			Some(event_index),
			block_number,
			self.tip.load(Ordering::SeqCst).max(block_number),
			self.confirmations,
			timestamp,
			payload,
		);
		self.emit_deduped(event).await;
	}

	async fn poll_contract_events(&self, contract: &str) {
		let since = Utc::now().timestamp_millis() - POLL_WINDOW_MS;
		let url = format!(
			"{}/v1/contracts/{}/events?only_confirmed=false&min_block_timestamp={}&limit={}",
			self.base_url, contract, since, POLL_PAGE_LIMIT
		);
		let page = match get_json(&self.http, &url).await {
			Ok(page) => page,
			Err(e) => {
				warn!("tron: contract event poll for {} failed: {}", contract, e);
				return;
			}
		};
		if let Some(entries) = page.get("data").and_then(Value::as_array) {
			for entry in entries {
				self.handle_contract_event(entry).await;
			}
		}
	}

	/// Native TransferContract entries from the account history
	async fn poll_account_native(&self, address: &str) {
		let since = Utc::now().timestamp_millis() - POLL_WINDOW_MS;
		let url = format!(
			"{}/v1/accounts/{}/transactions?only_confirmed=false&min_timestamp={}&limit={}",
			self.base_url, address, since, POLL_PAGE_LIMIT
		);
		let page = match get_json(&self.http, &url).await {
			Ok(page) => page,
			Err(e) => {
				warn!("tron: account poll for {} failed: {}", address, e);
				return;
			}
		};
		let Some(entries) = page.get("data").and_then(Value::as_array) else {
			return;
		};
		for entry in entries {
			let Some(tx_id) = entry.get("txID").and_then(Value::as_str) else {
				continue;
			};
			let Some(contract) = entry.pointer("/raw_data/contract/0") else {
				continue;
			};
			if contract.get("type").and_then(Value::as_str) != Some("TransferContract") {
				continue;
			}
			let value = contract.pointer("/parameter/value").cloned().unwrap_or(Value::Null);
			let amount = value.get("amount").and_then(Value::as_u64).unwrap_or(0);
			if amount == 0 {
				continue;
			}
			let from = value
				.get("owner_address")
				.and_then(Value::as_str)
				.and_then(tron_hex_to_base58);
			let to = value
				.get("to_address")
				.and_then(Value::as_str)
				.and_then(tron_hex_to_base58);
			let timestamp = entry
				.pointer("/raw_data/timestamp")
				.and_then(Value::as_i64)
				.unwrap_or_else(|| Utc::now().timestamp_millis());
			let block_number = entry
				.get("blockNumber")
				.and_then(Value::as_u64)
				.unwrap_or_else(|| self.tip.load(Ordering::SeqCst));
			let fee = entry
				.pointer("/ret/0/fee")
				.and_then(Value::as_u64)
				.map(|f| f.to_string());

			let event = CanonicalEvent::new(
				ChainKind::Tron,
				tx_id,
				None,
				block_number,
				self.tip.load(Ordering::SeqCst).max(block_number),
				self.confirmations,
				timestamp,
				EventPayload::NativeTransfer(NativeTransferPayload {
					from,
					to,
					amount: amount.to_string(),
					fee,
					..Default::default()
				}),
			);
			self.emit_deduped(event).await;
		}
	}

	/// TRC-20 movements from the account history
	async fn poll_account_trc20(&self, address: &str) {
		let since = Utc::now().timestamp_millis() - POLL_WINDOW_MS;
		let url = format!(
			"{}/v1/accounts/{}/transactions/trc20?only_confirmed=false&min_timestamp={}&limit={}",
			self.base_url, address, since, POLL_PAGE_LIMIT
		);
		let page = match get_json(&self.http, &url).await {
			Ok(page) => page,
			Err(e) => {
				warn!("tron: trc20 poll for {} failed: {}", address, e);
				return;
			}
		};
		let Some(entries) = page.get("data").and_then(Value::as_array) else {
			return;
		};
		let tip = self.tip.load(Ordering::SeqCst);
		for entry in entries {
			let Some(tx_id) = entry.get("transaction_id").and_then(Value::as_str) else {
				continue;
			};
			let raw_value = entry
				.get("value")
				.and_then(Value::as_str)
				.unwrap_or("0")
				.to_string();
			let decimals = entry
				.pointer("/token_info/decimals")
				.and_then(Value::as_u64)
				.map(|d| d as u32);
			let amount = match decimals {
				Some(d) => format_units(&raw_value, d),
				None => raw_value,
			};
			let payload = EventPayload::Transfer(TransferPayload {
				from: entry.get("from").and_then(Value::as_str).map(str::to_string),
				to: entry.get("to").and_then(Value::as_str).map(str::to_string),
				amount: Some(amount),
				token_address: entry
					.pointer("/token_info/address")
					.and_then(Value::as_str)
					.map(str::to_string),
				token_symbol: entry
					.pointer("/token_info/symbol")
					.and_then(Value::as_str)
					.map(str::to_string),
				token_decimals: decimals,
				..Default::default()
			});
			let timestamp = entry
				.get("block_timestamp")
				.and_then(Value::as_i64)
				.unwrap_or_else(|| Utc::now().timestamp_millis());
			let event = CanonicalEvent::new(
				ChainKind::Tron,
				tx_id,
				None,
				tip,
				tip,
				self.confirmations,
				timestamp,
				payload,
			);
			self.emit_deduped(event).await;
		}
	}

	async fn poll_tick(&self) {
		if let Err(e) = self.fetch_tip().await {
			self.emitter.emit_error(e).await;
			return;
		}
		let targets: Vec<MonitoringTarget> = self.targets.read().await.values().cloned().collect();
		for target in targets {
			match target.kind {
				TargetKind::Address => {
					self.poll_account_native(&target.address).await;
					self.poll_account_trc20(&target.address).await;
				}
				TargetKind::Contract | TargetKind::Token => {
					self.poll_contract_events(&target.address).await;
				}
			}
		}
	}
}

#[async_trait]
impl ChainAdapter for TronAdapter {
	fn chain(&self) -> ChainKind {
		ChainKind::Tron
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
			.attempt("Tron tip fetch", || inner.fetch_tip())
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
		info!("tron: connected (tip {})", inner.tip.load(Ordering::SeqCst));
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
				"'{}' is not a valid tron address",
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
		validate_tron_address(address)
	}

	async fn estimate_fee(&self, _request: &FeeEstimateRequest) -> Result<String, AdapterError> {
		let url = format!("{}/wallet/getchainparameters", self.inner.base_url);
		let fee = match get_json(&self.inner.http, &url).await {
			Ok(params) => params
				.get("chainParameter")
				.and_then(Value::as_array)
				.and_then(|entries| {
					entries.iter().find(|p| {
						p.get("key").and_then(Value::as_str) == Some("getTransactionFee")
					})
				})
				.and_then(|p| p.get("value").and_then(Value::as_u64))
				.map(|sun_per_byte| sun_per_byte * 268)
				.unwrap_or(FALLBACK_FEE_SUN),
			Err(_) => FALLBACK_FEE_SUN,
		};
		Ok(fee.to_string())
	}

	async fn last_heartbeat(&self) -> Option<Instant> {
		self.inner.heartbeat.last().await
	}
}
