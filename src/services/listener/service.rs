//! Listener facade implementation.
//!
//! The public surface of the service: a thin coordinator owning one chain
//! manager and the shared pipeline. It mirrors the manager's signals to its
//! own observers, maintains the event counters, and routes dynamic target
//! mutations through the manager, the resolver and the filter watch lists
//! in one place.

use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::error::ListenerError;
use crate::models::{
	ChainKind, EventKind, MonitoringTarget, ProcessedEvent, TargetFilterOverrides, TargetKind,
	TargetPriority,
};
use crate::services::adapter::ConnectionStatus;
use crate::services::manager::{AdapterState, ChainManager, ManagerEvent};
use crate::services::pipeline::{EventPipeline, PipelineStatsSnapshot, WatchLists};
use crate::services::resolver::TargetConfigResolver;

/// Observable signals mirrored to facade subscribers
#[derive(Debug, Clone)]
pub enum ListenerEvent {
	Starting,
	Started,
	Stopping,
	Stopped,
	EventProcessed(Box<ProcessedEvent>),
	EventProcessingError { event_id: String, error: String },
	ChainStatusUpdate { chain: ChainKind, status: ConnectionStatus },
	ChainError { chain: ChainKind, error: String },
	WalletAdded { address: String, chains: Vec<ChainKind> },
	WalletRemoved { address: String, chains: Vec<ChainKind> },
	ContractAdded { address: String, chains: Vec<ChainKind> },
	ContractRemoved { address: String, chains: Vec<ChainKind> },
	EnhancedTargetAdded { id: String },
	EnhancedTargetRemoved { id: String },
	EnhancedTargetUpdated { id: String },
	ChainsConnected(Vec<ChainKind>),
	ChainsDisconnected(Vec<ChainKind>),
	ConfigReloaded,
	Error(String),
}

/// Partial update applied to an enhanced target
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TargetPatch {
	pub name: Option<String>,
	pub enabled: Option<bool>,
	pub priority: Option<TargetPriority>,
	pub tags: Option<Vec<String>>,
	pub event_kinds: Option<Vec<EventKind>>,
	pub notification_channels: Option<Vec<String>>,
	pub filters: Option<TargetFilterOverrides>,
}

/// Snapshot returned by `get_stats`
#[derive(Debug, Clone, Serialize)]
pub struct ListenerStats {
	pub uptime_ms: u64,
	pub total_events: u64,
	pub processed_events: u64,
	pub failed_events: u64,
	pub active_chains: usize,
	pub connected_chains: usize,
	pub pipeline_stats: PipelineStatsSnapshot,
}

/// Per-chain status view
#[derive(Debug, Clone, Serialize)]
pub struct ChainStatusView {
	pub chain: ChainKind,
	pub state: AdapterState,
	pub status: ConnectionStatus,
}

/// Public facade over the manager, pipeline and resolver
pub struct EventListener {
	manager: Arc<ChainManager>,
	pipeline: Arc<EventPipeline>,
	resolver: Arc<TargetConfigResolver>,
	watch_lists: Arc<WatchLists>,
	observers: broadcast::Sender<ListenerEvent>,
	manager_rx: Mutex<Option<mpsc::Receiver<ManagerEvent>>>,
	mirror_task: Mutex<Option<JoinHandle<()>>>,
	total_events: Arc<AtomicU64>,
	processed_events: Arc<AtomicU64>,
	failed_events: Arc<AtomicU64>,
	started_at: RwLock<Option<Instant>>,
	running: AtomicBool,
}

impl EventListener {
	pub fn new(
		manager: ChainManager,
		manager_rx: mpsc::Receiver<ManagerEvent>,
		pipeline: Arc<EventPipeline>,
		resolver: Arc<TargetConfigResolver>,
		watch_lists: Arc<WatchLists>,
	) -> Self {
		let (observers, _) = broadcast::channel(1024);
		Self {
			manager: Arc::new(manager),
			pipeline,
			resolver,
			watch_lists,
			observers,
			manager_rx: Mutex::new(Some(manager_rx)),
			mirror_task: Mutex::new(None),
			total_events: Arc::new(AtomicU64::new(0)),
			processed_events: Arc::new(AtomicU64::new(0)),
			failed_events: Arc::new(AtomicU64::new(0)),
			started_at: RwLock::new(None),
			running: AtomicBool::new(false),
		}
	}

	/// Subscribes to the facade's observable signals
	pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
		self.observers.subscribe()
	}

	fn emit(&self, event: ListenerEvent) {
		// No subscribers is fine
		let _ = self.observers.send(event);
	}

	/// Starts the manager and the signal mirror
	///
	/// In strict mode the listener refuses to run with zero connected
	/// chains; otherwise it warns and continues.
	pub async fn start(&self, strict: bool) -> Result<(), ListenerError> {
		if self.running.swap(true, Ordering::SeqCst) {
			return Err(ListenerError::state_error("Listener is already running"));
		}
		self.emit(ListenerEvent::Starting);
		info!("Listener starting");

		let manager_rx = self
			.manager_rx
			.lock()
			.await
			.take()
			.ok_or_else(|| ListenerError::state_error("Listener cannot be restarted"))?;
		self.spawn_mirror(manager_rx).await;

		self.manager.start().await?;

		let states = self.manager.chain_states().await;
		let connected: Vec<ChainKind> = states
			.iter()
			.filter(|(_, s)| matches!(s, AdapterState::Connected | AdapterState::Monitoring))
			.map(|(chain, _)| *chain)
			.collect();
		if connected.is_empty() {
			if strict {
				self.running.store(false, Ordering::SeqCst);
				let _ = self.manager.stop().await;
				return Err(ListenerError::startup_error(
					"No chain adapter could connect",
				));
			}
			warn!("Listener started with zero connected chains");
		} else {
			self.emit(ListenerEvent::ChainsConnected(connected.clone()));
		}

		*self.started_at.write().await = Some(Instant::now());
		self.emit(ListenerEvent::Started);
		info!(
			"Listener started ({} of {} chains up)",
			connected.len(),
			states.len()
		);
		Ok(())
	}

	/// Cooperative shutdown: stops adapters, then the mirror
	pub async fn stop(&self) -> Result<(), ListenerError> {
		if !self.running.swap(false, Ordering::SeqCst) {
			return Ok(());
		}
		self.emit(ListenerEvent::Stopping);
		let chains = self.manager.registered_chains().await;
		self.manager.stop().await?;
		if let Some(task) = self.mirror_task.lock().await.take() {
			task.abort();
		}
		if !chains.is_empty() {
			self.emit(ListenerEvent::ChainsDisconnected(chains));
		}
		self.emit(ListenerEvent::Stopped);
		info!("Listener stopped");
		Ok(())
	}

	async fn spawn_mirror(&self, mut manager_rx: mpsc::Receiver<ManagerEvent>) {
		let observers = self.observers.clone();
		let total = self.total_events.clone();
		let processed_count = self.processed_events.clone();
		let failed = self.failed_events.clone();

		let task = tokio::spawn(async move {
			while let Some(event) = manager_rx.recv().await {
				let mirrored = match event {
					ManagerEvent::EventProcessed(processed) => {
						total.fetch_add(1, Ordering::Relaxed);
						processed_count.fetch_add(1, Ordering::Relaxed);
						ListenerEvent::EventProcessed(processed)
					}
					ManagerEvent::EventProcessingError { event_id, error } => {
						total.fetch_add(1, Ordering::Relaxed);
						failed.fetch_add(1, Ordering::Relaxed);
						ListenerEvent::EventProcessingError { event_id, error }
					}
					ManagerEvent::AdapterError { chain, error } => {
						ListenerEvent::ChainError { chain, error }
					}
					ManagerEvent::ChainStatusUpdate { chain, status } => {
						ListenerEvent::ChainStatusUpdate { chain, status }
					}
				};
				let _ = observers.send(mirrored);
			}
		});
		*self.mirror_task.lock().await = Some(task);
	}

	/// Adds a wallet address to every (or the given) chain adapter and the
	/// address filter set
	pub async fn add_wallet_address(
		&self,
		address: &str,
		chains: Option<Vec<ChainKind>>,
	) -> Result<Vec<ChainKind>, ListenerError> {
		let target = MonitoringTarget::new(
			format!("wallet_{}", address),
			TargetKind::Address,
			address,
			vec![EventKind::Transfer, EventKind::NativeTransfer],
		);
		let accepted = self.manager.add_target(target, chains.as_deref()).await?;
		self.watch_lists
			.addresses
			.write()
			.await
			.insert(address.to_string());
		self.emit(ListenerEvent::WalletAdded {
			address: address.to_string(),
			chains: accepted.clone(),
		});
		Ok(accepted)
	}

	pub async fn remove_wallet_address(
		&self,
		address: &str,
		chains: Option<Vec<ChainKind>>,
	) -> Result<Vec<ChainKind>, ListenerError> {
		let removed = self
			.manager
			.remove_target(address, chains.as_deref())
			.await?;
		self.watch_lists.addresses.write().await.remove(address);
		self.emit(ListenerEvent::WalletRemoved {
			address: address.to_string(),
			chains: removed.clone(),
		});
		Ok(removed)
	}

	/// Adds a token contract to every (or the given) chain adapter and the
	/// contract filter set
	pub async fn add_token_contract(
		&self,
		address: &str,
		chains: Option<Vec<ChainKind>>,
	) -> Result<Vec<ChainKind>, ListenerError> {
		let target = MonitoringTarget::new(
			format!("contract_{}", address),
			TargetKind::Contract,
			address,
			vec![
				EventKind::Transfer,
				EventKind::TokenMint,
				EventKind::TokenBurn,
				EventKind::NftTransfer,
				EventKind::NftMint,
			],
		);
		let accepted = self.manager.add_target(target, chains.as_deref()).await?;
		self.watch_lists
			.fungible_contracts
			.write()
			.await
			.insert(address.to_string());
		self.emit(ListenerEvent::ContractAdded {
			address: address.to_string(),
			chains: accepted.clone(),
		});
		Ok(accepted)
	}

	pub async fn remove_token_contract(
		&self,
		address: &str,
		chains: Option<Vec<ChainKind>>,
	) -> Result<Vec<ChainKind>, ListenerError> {
		let removed = self
			.manager
			.remove_target(address, chains.as_deref())
			.await?;
		self.watch_lists
			.fungible_contracts
			.write()
			.await
			.remove(address);
		self.emit(ListenerEvent::ContractRemoved {
			address: address.to_string(),
			chains: removed.clone(),
		});
		Ok(removed)
	}

	/// Registers a fully described target and makes it visible to the
	/// resolver
	pub async fn add_enhanced_target(
		&self,
		target: MonitoringTarget,
		chains: Option<Vec<ChainKind>>,
	) -> Result<Vec<ChainKind>, ListenerError> {
		target.validate().map_err(ListenerError::target_error)?;
		let accepted = self
			.manager
			.add_target(target.clone(), chains.as_deref())
			.await?;
		let id = target.id.clone();
		self.resolver.upsert_target(target).await;
		self.emit(ListenerEvent::EnhancedTargetAdded { id });
		Ok(accepted)
	}

	pub async fn remove_enhanced_target(
		&self,
		id: &str,
		chains: Option<Vec<ChainKind>>,
	) -> Result<(), ListenerError> {
		let Some(target) = self.resolver.remove_target(id).await else {
			return Err(ListenerError::target_error(format!(
				"No enhanced target with id '{}'",
				id
			)));
		};
		self.manager
			.remove_target(&target.address, chains.as_deref())
			.await?;
		self.emit(ListenerEvent::EnhancedTargetRemoved { id: id.to_string() });
		Ok(())
	}

	/// Applies a partial update to an enhanced target
	///
	/// Rejected with no side effect when the id is unknown.
	pub async fn update_enhanced_target(
		&self,
		id: &str,
		patch: TargetPatch,
	) -> Result<(), ListenerError> {
		let Some(mut target) = self.resolver.get_target(id).await else {
			return Err(ListenerError::target_error(format!(
				"No enhanced target with id '{}'",
				id
			)));
		};
		if let Some(name) = patch.name {
			target.name = Some(name);
		}
		if let Some(enabled) = patch.enabled {
			target.enabled = enabled;
		}
		if let Some(priority) = patch.priority {
			target.priority = Some(priority);
		}
		if let Some(tags) = patch.tags {
			target.tags = tags;
		}
		if let Some(event_kinds) = patch.event_kinds {
			if event_kinds.is_empty() {
				return Err(ListenerError::target_error(
					"event_kinds patch may not be empty",
				));
			}
			target.event_kinds = event_kinds;
		}
		if let Some(channels) = patch.notification_channels {
			target.notification_channels = Some(channels);
		}
		if let Some(filters) = patch.filters {
			target.filters = Some(filters);
		}
		self.resolver.upsert_target(target).await;
		self.emit(ListenerEvent::EnhancedTargetUpdated { id: id.to_string() });
		Ok(())
	}

	/// Replaces the global filter defaults at runtime
	///
	/// Per-target overrides are untouched; the next resolution sees the new
	/// baseline.
	pub async fn reload_filter_defaults(
		&self,
		defaults: crate::models::FilterDefaultsConfig,
	) -> Result<(), ListenerError> {
		self.resolver.set_defaults(defaults).await;
		self.emit(ListenerEvent::ConfigReloaded);
		Ok(())
	}

	pub async fn get_stats(&self) -> ListenerStats {
		let states = self.manager.chain_states().await;
		let connected = states
			.values()
			.filter(|s| matches!(s, AdapterState::Connected | AdapterState::Monitoring))
			.count();
		let uptime_ms = self
			.started_at
			.read()
			.await
			.map(|t| t.elapsed().as_millis() as u64)
			.unwrap_or(0);
		ListenerStats {
			uptime_ms,
			total_events: self.total_events.load(Ordering::Relaxed),
			processed_events: self.processed_events.load(Ordering::Relaxed),
			failed_events: self.failed_events.load(Ordering::Relaxed),
			active_chains: states.len(),
			connected_chains: connected,
			pipeline_stats: self.pipeline.stats(),
		}
	}

	pub async fn get_chain_statuses(&self) -> Vec<ChainStatusView> {
		let states = self.manager.chain_states().await;
		let statuses = self.manager.connection_statuses().await;
		let mut views: Vec<ChainStatusView> = states
			.into_iter()
			.map(|(chain, state)| ChainStatusView {
				chain,
				state,
				status: statuses
					.get(&chain)
					.copied()
					.unwrap_or(ConnectionStatus::Disconnected),
			})
			.collect();
		views.sort_by_key(|v| v.chain.as_str());
		views
	}

	pub async fn get_supported_chains(&self) -> Vec<ChainKind> {
		self.manager.registered_chains().await
	}

	pub async fn is_chain_supported(&self, chain: ChainKind) -> bool {
		self.manager.is_registered(chain).await
	}

	pub async fn test_connections(&self) -> HashMap<ChainKind, bool> {
		self.manager.test_connections().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::FilterDefaultsConfig;
	use crate::services::manager::ChainManagerConfig;

	fn build_listener() -> EventListener {
		let resolver = TargetConfigResolver::new(FilterDefaultsConfig::default(), vec![]);
		let pipeline = Arc::new(EventPipeline::new(resolver.clone()));
		let (manager, manager_rx) =
			ChainManager::new(ChainManagerConfig::default(), pipeline.clone());
		EventListener::new(
			manager,
			manager_rx,
			pipeline,
			resolver,
			WatchLists::new(),
		)
	}

	#[tokio::test]
	async fn test_start_stop_signals() {
		let listener = build_listener();
		let mut observer = listener.subscribe();

		// No adapters registered: non-strict start warns and continues
		listener.start(false).await.unwrap();
		assert!(matches!(observer.recv().await.unwrap(), ListenerEvent::Starting));
		assert!(matches!(observer.recv().await.unwrap(), ListenerEvent::Started));

		listener.stop().await.unwrap();
		assert!(matches!(observer.recv().await.unwrap(), ListenerEvent::Stopping));
		assert!(matches!(observer.recv().await.unwrap(), ListenerEvent::Stopped));
	}

	#[tokio::test]
	async fn test_strict_start_fails_with_no_chains() {
		let listener = build_listener();
		let err = listener.start(true).await.unwrap_err();
		assert!(matches!(err, ListenerError::StartupError(_)));
	}

	#[tokio::test]
	async fn test_double_start_rejected() {
		let listener = build_listener();
		listener.start(false).await.unwrap();
		let err = listener.start(false).await.unwrap_err();
		assert!(matches!(err, ListenerError::StateError(_)));
		listener.stop().await.unwrap();
	}

	#[tokio::test]
	async fn test_update_unknown_target_rejected_without_side_effect() {
		let listener = build_listener();
		let err = listener
			.update_enhanced_target("ghost", TargetPatch::default())
			.await
			.unwrap_err();
		assert!(matches!(err, ListenerError::TargetError(_)));
	}

	#[tokio::test]
	async fn test_stats_start_empty() {
		let listener = build_listener();
		let stats = listener.get_stats().await;
		assert_eq!(stats.total_events, 0);
		assert_eq!(stats.active_chains, 0);
		assert_eq!(stats.uptime_ms, 0);
	}
}
