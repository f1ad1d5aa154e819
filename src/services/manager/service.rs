//! Chain manager implementation.
//!
//! Owns one adapter per chain kind, drives them through their lifecycle
//! concurrently (one adapter's failure never prevents another from
//! starting), plumbs their event streams into the pipeline, and runs a
//! periodic health sweep that schedules reconnects for stale adapters.

use futures::future::join_all;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::error::ManagerError;
use crate::models::{ChainKind, MonitoringTarget, ProcessedEvent};
use crate::services::adapter::{AdapterStreams, ChainAdapter, ConnectionStatus};
use crate::services::pipeline::EventPipeline;

/// Per-adapter state machine as seen by the manager
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
	Registered,
	Connecting,
	Connected,
	Monitoring,
	Stopping,
	Disconnected,
}

/// Signals the manager re-emits upward to the facade
#[derive(Debug)]
pub enum ManagerEvent {
	EventProcessed(Box<ProcessedEvent>),
	EventProcessingError {
		event_id: String,
		error: String,
	},
	AdapterError {
		chain: ChainKind,
		error: String,
	},
	ChainStatusUpdate {
		chain: ChainKind,
		status: ConnectionStatus,
	},
}

/// Manager tunables
#[derive(Debug, Clone)]
pub struct ChainManagerConfig {
	pub health_check_interval: Duration,
	pub reconnect_delay: Duration,
	pub auto_reconnect: bool,
}

impl Default for ChainManagerConfig {
	fn default() -> Self {
		Self {
			health_check_interval: Duration::from_secs(60),
			reconnect_delay: Duration::from_secs(5),
			auto_reconnect: true,
		}
	}
}

struct AdapterEntry {
	adapter: Arc<dyn ChainAdapter>,
	state: AdapterState,
	plumbing: Vec<JoinHandle<()>>,
}

struct ManagerInner {
	config: ChainManagerConfig,
	pipeline: Arc<EventPipeline>,
	adapters: RwLock<HashMap<ChainKind, AdapterEntry>>,
	/// `(chain, address)` → target, the authoritative registry
	targets: RwLock<HashMap<(ChainKind, String), MonitoringTarget>>,
	events_out: mpsc::Sender<ManagerEvent>,
	health_task: Mutex<Option<JoinHandle<()>>>,
	reconnecting: Mutex<HashSet<ChainKind>>,
	running: AtomicBool,
}

/// Registers adapters, routes their events into the pipeline and supervises
/// their health
pub struct ChainManager {
	inner: Arc<ManagerInner>,
}

impl ChainManager {
	/// Builds a manager and the receiving half of its upward signal channel
	pub fn new(
		config: ChainManagerConfig,
		pipeline: Arc<EventPipeline>,
	) -> (Self, mpsc::Receiver<ManagerEvent>) {
		let (events_out, events_rx) = mpsc::channel(1024);
		(
			Self {
				inner: Arc::new(ManagerInner {
					config,
					pipeline,
					adapters: RwLock::new(HashMap::new()),
					targets: RwLock::new(HashMap::new()),
					events_out,
					health_task: Mutex::new(None),
					reconnecting: Mutex::new(HashSet::new()),
					running: AtomicBool::new(false),
				}),
			},
			events_rx,
		)
	}

	/// Registers an adapter and takes ownership of its signal streams
	///
	/// Duplicate chain kinds are rejected.
	pub async fn register(
		&self,
		adapter: Arc<dyn ChainAdapter>,
		streams: AdapterStreams,
	) -> Result<(), ManagerError> {
		let chain = adapter.chain();
		let mut adapters = self.inner.adapters.write().await;
		if adapters.contains_key(&chain) {
			return Err(ManagerError::registration_error(format!(
				"Adapter for {} is already registered",
				chain
			)));
		}
		let plumbing = self.inner.spawn_plumbing(chain, streams);
		adapters.insert(
			chain,
			AdapterEntry {
				adapter,
				state: AdapterState::Registered,
				plumbing,
			},
		);
		info!("Registered {} adapter", chain);
		Ok(())
	}

	/// Starts every registered adapter concurrently
	///
	/// Results are settled individually: a failing adapter is reported via
	/// `AdapterError` and left disconnected while the others proceed.
	pub async fn start(&self) -> Result<(), ManagerError> {
		let inner = &self.inner;
		inner.running.store(true, Ordering::SeqCst);

		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();

		let results = join_all(adapters.into_iter().map(|(chain, adapter)| {
			let inner = inner.clone();
			async move {
				inner.set_state(chain, AdapterState::Connecting).await;
				let result = async {
					adapter.connect().await?;
					inner.set_state(chain, AdapterState::Connected).await;
					adapter.start_monitoring().await
				}
				.await;
				(chain, result)
			}
		}))
		.await;

		let mut started = 0;
		for (chain, result) in results {
			match result {
				Ok(()) => {
					inner.set_state(chain, AdapterState::Monitoring).await;
					started += 1;
				}
				Err(e) => {
					inner.set_state(chain, AdapterState::Disconnected).await;
					inner
						.emit(ManagerEvent::AdapterError {
							chain,
							error: e.to_string(),
						})
						.await;
				}
			}
		}

		let health_inner = inner.clone();
		let task = tokio::spawn(async move {
			health_inner.health_sweep_loop().await;
		});
		*inner.health_task.lock().await = Some(task);

		info!("Chain manager started ({} adapters monitoring)", started);
		Ok(())
	}

	/// Stops every adapter, best-effort, in reverse lifecycle order
	pub async fn stop(&self) -> Result<(), ManagerError> {
		let inner = &self.inner;
		inner.running.store(false, Ordering::SeqCst);
		if let Some(task) = inner.health_task.lock().await.take() {
			task.abort();
		}

		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();

		join_all(adapters.into_iter().map(|(chain, adapter)| {
			let inner = inner.clone();
			async move {
				inner.set_state(chain, AdapterState::Stopping).await;
				if let Err(e) = adapter.stop_monitoring().await {
					warn!("{}: stop_monitoring failed: {}", chain, e);
				}
				if let Err(e) = adapter.disconnect().await {
					warn!("{}: disconnect failed: {}", chain, e);
				}
				inner.set_state(chain, AdapterState::Disconnected).await;
			}
		}))
		.await;

		info!("Chain manager stopped");
		Ok(())
	}

	/// Full reconnect sequence for one chain
	pub async fn reconnect(&self, chain: ChainKind) -> Result<(), ManagerError> {
		self.inner.reconnect(chain).await
	}

	/// Registers a target on every eligible adapter
	///
	/// Returns the chains that accepted it; rejects when no adapter's
	/// validator accepts the address.
	pub async fn add_target(
		&self,
		target: MonitoringTarget,
		chains: Option<&[ChainKind]>,
	) -> Result<Vec<ChainKind>, ManagerError> {
		let inner = &self.inner;
		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();

		let mut accepted = Vec::new();
		for (chain, adapter) in adapters {
			if let Some(chains) = chains {
				if !chains.contains(&chain) {
					continue;
				}
			}
			if !target.applies_to_chain(chain) || !adapter.validate_address(&target.address) {
				continue;
			}
			match adapter.add_monitoring_target(target.clone()).await {
				Ok(()) => {
					inner
						.targets
						.write()
						.await
						.insert((chain, target.address.clone()), target.clone());
					accepted.push(chain);
				}
				Err(e) => {
					warn!("{}: target '{}' rejected: {}", chain, target.id, e);
				}
			}
		}
		if accepted.is_empty() {
			return Err(ManagerError::target_error(format!(
				"No adapter accepted target '{}' ({})",
				target.id, target.address
			)));
		}
		Ok(accepted)
	}

	/// Removes a target address from the given chains (or every chain)
	pub async fn remove_target(
		&self,
		address: &str,
		chains: Option<&[ChainKind]>,
	) -> Result<Vec<ChainKind>, ManagerError> {
		let inner = &self.inner;
		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();

		let mut removed = Vec::new();
		for (chain, adapter) in adapters {
			if let Some(chains) = chains {
				if !chains.contains(&chain) {
					continue;
				}
			}
			let known = inner
				.targets
				.write()
				.await
				.remove(&(chain, address.to_string()))
				.is_some();
			if known {
				if let Err(e) = adapter.remove_monitoring_target(address).await {
					warn!("{}: target removal failed: {}", chain, e);
				}
				removed.push(chain);
			}
		}
		Ok(removed)
	}

	pub async fn chain_states(&self) -> HashMap<ChainKind, AdapterState> {
		self.inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.state))
			.collect()
	}

	pub async fn connection_statuses(&self) -> HashMap<ChainKind, ConnectionStatus> {
		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = self
			.inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();
		let mut statuses = HashMap::new();
		for (chain, adapter) in adapters {
			statuses.insert(chain, adapter.connection_status().await);
		}
		statuses
	}

	/// Probes every adapter's tip fetch in parallel
	pub async fn test_connections(&self) -> HashMap<ChainKind, bool> {
		let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>)> = self
			.inner
			.adapters
			.read()
			.await
			.iter()
			.map(|(chain, entry)| (*chain, entry.adapter.clone()))
			.collect();
		join_all(adapters.into_iter().map(|(chain, adapter)| async move {
			(chain, adapter.current_block_number().await.is_ok())
		}))
		.await
		.into_iter()
		.collect()
	}

	pub async fn registered_chains(&self) -> Vec<ChainKind> {
		self.inner.adapters.read().await.keys().copied().collect()
	}

	pub async fn is_registered(&self, chain: ChainKind) -> bool {
		self.inner.adapters.read().await.contains_key(&chain)
	}

	pub async fn targets(&self) -> Vec<MonitoringTarget> {
		self.inner.targets.read().await.values().cloned().collect()
	}
}

impl ManagerInner {
	async fn emit(&self, event: ManagerEvent) {
		if self.events_out.send(event).await.is_err() {
			warn!("Manager signal channel closed");
		}
	}

	async fn set_state(&self, chain: ChainKind, state: AdapterState) {
		if let Some(entry) = self.adapters.write().await.get_mut(&chain) {
			entry.state = state;
		}
	}

	/// Spawns the three stream pumps for one adapter
	fn spawn_plumbing(
		self: &Arc<Self>,
		_chain: ChainKind,
		streams: AdapterStreams,
	) -> Vec<JoinHandle<()>> {
		let AdapterStreams {
			mut events,
			mut status,
			mut errors,
		} = streams;

		let event_pump = tokio::spawn({
			let inner = self.clone();
			async move {
				while let Some(event) = events.recv().await {
					let event_id = event.id.clone();
					match inner.pipeline.execute(event).await {
						Ok(Some(processed)) => {
							inner
								.emit(ManagerEvent::EventProcessed(Box::new(processed)))
								.await;
						}
						Ok(None) => {}
						Err(e) => {
							inner
								.emit(ManagerEvent::EventProcessingError {
									event_id,
									error: e.to_string(),
								})
								.await;
						}
					}
				}
			}
		});

		let status_pump = tokio::spawn({
			let inner = self.clone();
			async move {
				while let Some((chain, connection_status)) = status.recv().await {
					inner
						.emit(ManagerEvent::ChainStatusUpdate {
							chain,
							status: connection_status,
						})
						.await;
				}
			}
		});

		let error_pump = tokio::spawn({
			let inner = self.clone();
			async move {
				while let Some((chain, error)) = errors.recv().await {
					inner
						.emit(ManagerEvent::AdapterError {
							chain,
							error: error.to_string(),
						})
						.await;
				}
			}
		});

		vec![event_pump, status_pump, error_pump]
	}

	async fn reconnect(self: &Arc<Self>, chain: ChainKind) -> Result<(), ManagerError> {
		let adapter = {
			let adapters = self.adapters.read().await;
			adapters
				.get(&chain)
				.map(|entry| entry.adapter.clone())
				.ok_or_else(|| {
					ManagerError::lifecycle_error(format!("No adapter registered for {}", chain))
				})?
		};

		info!("{}: reconnecting", chain);
		self.set_state(chain, AdapterState::Stopping).await;
		if let Err(e) = adapter.disconnect().await {
			warn!("{}: disconnect during reconnect failed: {}", chain, e);
		}
		tokio::time::sleep(self.config.reconnect_delay).await;

		self.set_state(chain, AdapterState::Connecting).await;
		let result = async {
			adapter.connect().await?;
			self.set_state(chain, AdapterState::Connected).await;
			adapter.start_monitoring().await
		}
		.await;

		match result {
			Ok(()) => {
				self.set_state(chain, AdapterState::Monitoring).await;
				Ok(())
			}
			Err(e) => {
				self.set_state(chain, AdapterState::Disconnected).await;
				self.emit(ManagerEvent::AdapterError {
					chain,
					error: e.to_string(),
				})
				.await;
				Err(ManagerError::lifecycle_error(format!(
					"{} reconnect failed: {}",
					chain, e
				)))
			}
		}
	}

	/// Staleness-driven reconnect scheduling
	async fn health_sweep_loop(self: Arc<Self>) {
		let mut interval = tokio::time::interval(self.config.health_check_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		interval.tick().await;
		while self.running.load(Ordering::SeqCst) {
			interval.tick().await;
			let stale_threshold = 2 * self.config.health_check_interval;
			let adapters: Vec<(ChainKind, Arc<dyn ChainAdapter>, AdapterState)> = self
				.adapters
				.read()
				.await
				.iter()
				.map(|(chain, entry)| (*chain, entry.adapter.clone(), entry.state))
				.collect();

			for (chain, adapter, state) in adapters {
				if !matches!(state, AdapterState::Connected | AdapterState::Monitoring) {
					continue;
				}
				let staleness = match adapter.last_heartbeat().await {
					Some(last) => Instant::now().saturating_duration_since(last),
					None => continue,
				};
				if staleness <= stale_threshold || !self.config.auto_reconnect {
					continue;
				}
				if !self.reconnecting.lock().await.insert(chain) {
					continue;
				}
				warn!(
					"{}: heartbeat stale for {}s, scheduling reconnect",
					chain,
					staleness.as_secs()
				);
				let inner = self.clone();
				tokio::spawn(async move {
					let _ = inner.reconnect(chain).await;
					inner.reconnecting.lock().await.remove(&chain);
				});
			}
		}
	}
}
