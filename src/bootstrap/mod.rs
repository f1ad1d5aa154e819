//! Bootstrap module for initializing services from configuration.
//!
//! Wires the decoded TOML document into a running object graph: resolver →
//! watch lists → pipeline (filters, enricher, processor, notifiers) →
//! adapters → chain manager → listener facade, then seeds the configured
//! monitoring targets through the facade so startup and runtime mutations
//! share one code path.
//!
//! # Services
//! - `TargetConfigResolver`: per-target filter precedence
//! - `EventPipeline`: filter/enrich/process/notify chain
//! - `ChainManager`: adapter lifecycle and event plumbing
//! - `EventListener`: the public facade returned to `main`

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::models::{
	AppConfig, ChainKind, EventKind, NotificationChannel, TargetPriority,
};
use crate::services::adapter::{
	adapter_channel, BitcoinAdapter, ChainAdapter, EvmAdapter, EvmAddressFormat, SolanaAdapter,
	SuiAdapter, TronAdapter,
};
use crate::services::listener::EventListener;
use crate::services::manager::{ChainManager, ChainManagerConfig};
use crate::services::notification::{
	LogNotifier, LogNotifierConfig, RedisPubSubNotifier, WebhookNotifier,
};
use crate::services::pipeline::{
	AddressFilter, ClassificationProcessor, ConfirmationFilter, ContractFilter,
	CustomRulesFilter, EventKindFilter, EventPipeline, PriorityFilter, SelfTransferFilter,
	TargetAmountFilter, TargetTagEnricher, WatchLists,
};
use crate::services::resolver::TargetConfigResolver;

/// Type alias for bootstrap results
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

const NOTIFIER_RETRY_ATTEMPTS: u32 = 3;
const NOTIFIER_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Builds the full service graph from a validated configuration
pub async fn initialize_listener(config: &AppConfig) -> Result<EventListener> {
	let resolver = TargetConfigResolver::new(
		config.filters.transfer.clone(),
		config
			.targets
			.enhanced_targets
			.iter()
			.filter(|t| t.enabled)
			.cloned(),
	);
	let watch_lists = WatchLists::new();
	seed_watch_lists(config, &watch_lists).await;

	let pipeline = Arc::new(EventPipeline::new(resolver.clone()));
	register_pipeline_components(config, &pipeline, &resolver, &watch_lists).await?;

	let (manager, manager_rx) = ChainManager::new(
		ChainManagerConfig {
			health_check_interval: Duration::from_secs(60),
			reconnect_delay: Duration::from_secs(5),
			auto_reconnect: true,
		},
		pipeline.clone(),
	);
	register_adapters(config, &manager).await?;

	let listener = EventListener::new(
		manager,
		manager_rx,
		pipeline,
		resolver,
		watch_lists,
	);
	seed_targets(config, &listener).await?;
	Ok(listener)
}

async fn seed_watch_lists(config: &AppConfig, watch_lists: &Arc<WatchLists>) {
	let mut addresses = watch_lists.addresses.write().await;
	for address in &config.targets.addresses.watch_addresses {
		addresses.insert(address.clone());
	}
	drop(addresses);

	let mut fungible = watch_lists.fungible_contracts.write().await;
	for contract in config.targets.fungible_contracts() {
		fungible.insert(contract.clone());
	}
	for program in &config.targets.contracts.spl_token_programs {
		fungible.insert(program.clone());
	}
	drop(fungible);

	let mut nft = watch_lists.nft_contracts.write().await;
	for contract in config.targets.nft_contracts() {
		nft.insert(contract.clone());
	}
}

/// Event kinds admitted by the configured monitoring jobs
fn allowed_event_kinds(config: &AppConfig) -> Vec<EventKind> {
	let mut kinds = vec![EventKind::ContractCreation];
	if config.monitoring.transfers.enabled {
		kinds.extend([
			EventKind::Transfer,
			EventKind::NativeTransfer,
			EventKind::NftTransfer,
		]);
	}
	if config.monitoring.token_minting.enabled {
		kinds.extend([
			EventKind::TokenMint,
			EventKind::TokenBurn,
			EventKind::NftMint,
		]);
	}
	kinds
}

async fn register_pipeline_components(
	config: &AppConfig,
	pipeline: &Arc<EventPipeline>,
	resolver: &Arc<TargetConfigResolver>,
	watch_lists: &Arc<WatchLists>,
) -> Result<()> {
	pipeline
		.add_filter(Arc::new(AddressFilter::new(watch_lists.clone())))
		.await?;
	pipeline
		.add_filter(Arc::new(ContractFilter::new(watch_lists.clone())))
		.await?;
	pipeline
		.add_filter(Arc::new(TargetAmountFilter::new(resolver.clone())))
		.await?;
	pipeline
		.add_filter(Arc::new(EventKindFilter::new(allowed_event_kinds(config))))
		.await?;
	pipeline
		.add_filter(Arc::new(SelfTransferFilter::new(resolver.clone())))
		.await?;
	pipeline
		.add_filter(Arc::new(ConfirmationFilter::new(
			config.filters.transfer.confirmation_blocks,
		)))
		.await?;
	pipeline
		.add_filter(Arc::new(CustomRulesFilter::new(resolver.clone())))
		.await?;
	pipeline
		.add_filter(Arc::new(PriorityFilter::new(
			resolver.clone(),
			TargetPriority::Low,
		)))
		.await?;

	pipeline
		.add_enricher(Arc::new(TargetTagEnricher::new(resolver.clone())))
		.await?;
	pipeline
		.add_processor(Arc::new(ClassificationProcessor::new(resolver.clone())))
		.await?;

	if config.notifications.enabled {
		let timeout = Duration::from_millis(config.performance.request_timeout_ms);
		if config
			.notifications
			.channels
			.contains(&NotificationChannel::Webhook)
		{
			let url = config
				.notifications
				.webhook_url
				.clone()
				.unwrap_or_default();
			pipeline
				.add_notifier(Arc::new(WebhookNotifier::new(
					url,
					timeout,
					NOTIFIER_RETRY_ATTEMPTS,
					NOTIFIER_RETRY_DELAY,
				)?))
				.await?;
		}
		if config
			.notifications
			.channels
			.contains(&NotificationChannel::RedisPubsub)
		{
			let channel = config
				.notifications
				.redis_channel
				.clone()
				.unwrap_or_default();
			pipeline
				.add_notifier(Arc::new(RedisPubSubNotifier::new(
					&config.database.redis_url,
					channel,
					NOTIFIER_RETRY_ATTEMPTS,
					NOTIFIER_RETRY_DELAY,
				)?))
				.await?;
		}
	}
	// The structured log sink is always on
	pipeline
		.add_notifier(Arc::new(LogNotifier::new(LogNotifierConfig {
			format: config.logging.format,
			level: config.logging.level,
			..Default::default()
		})?))
		.await?;
	Ok(())
}

async fn register_adapters(config: &AppConfig, manager: &ChainManager) -> Result<()> {
	for (chain, chain_config) in &config.chains {
		let (emitter, streams) = adapter_channel(*chain);
		let poll_interval = config.monitoring.transfers.polling_interval_ms;
		let adapter: Arc<dyn ChainAdapter> = match chain {
			ChainKind::Ethereum | ChainKind::Bsc => Arc::new(EvmAdapter::new(
				*chain,
				chain_config,
				&config.performance,
				poll_interval,
				emitter,
				EvmAddressFormat::Hex,
			)?),
			ChainKind::Solana => Arc::new(SolanaAdapter::new(
				chain_config,
				&config.performance,
				emitter,
			)?),
			ChainKind::Sui => Arc::new(SuiAdapter::new(
				chain_config,
				&config.performance,
				poll_interval,
				emitter,
			)?),
			ChainKind::Tron => Arc::new(TronAdapter::new(
				chain_config,
				&config.performance,
				poll_interval.max(2000),
				emitter,
			)?),
			ChainKind::Bitcoin => Arc::new(BitcoinAdapter::new(
				chain_config,
				&config.performance,
				30_000,
				emitter,
			)?),
		};
		manager.register(adapter, streams).await?;
	}
	Ok(())
}

/// Seeds configured targets through the facade
///
/// A malformed address in a target is fatal at startup.
async fn seed_targets(config: &AppConfig, listener: &EventListener) -> Result<()> {
	for address in &config.targets.addresses.watch_addresses {
		listener.add_wallet_address(address, None).await?;
	}
	let contracts = config
		.targets
		.fungible_contracts()
		.chain(config.targets.nft_contracts())
		.chain(config.targets.contracts.spl_token_programs.iter());
	for contract in contracts {
		listener.add_token_contract(contract, None).await?;
	}
	for target in &config.targets.enhanced_targets {
		if !target.enabled {
			continue;
		}
		let chains = target.chains.clone();
		listener.add_enhanced_target(target.clone(), chains).await?;
	}
	info!(
		"Seeded {} watch addresses, {} contracts, {} enhanced targets",
		config.targets.addresses.watch_addresses.len(),
		config.targets.contracts.erc20_contracts.len()
			+ config.targets.contracts.erc721_contracts.len()
			+ config.targets.contracts.trc20_contracts.len()
			+ config.targets.contracts.trc721_contracts.len()
			+ config.targets.contracts.spl_token_programs.len(),
		config.targets.enhanced_targets.len(),
	);
	Ok(())
}
