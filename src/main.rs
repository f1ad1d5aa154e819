use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use chainwatch::bootstrap;
use chainwatch::models::AppConfig;
use chainwatch::utils::setup_logging;

const DEFAULT_CONFIG_PATH: &str = "config/chainwatch.toml";

#[tokio::main]
async fn main() -> ExitCode {
	let config_path = std::env::args()
		.nth(1)
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

	// Configuration errors are fatal before logging is even up
	let config = match AppConfig::load_from_path(&config_path) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("Failed to load {}: {}", config_path.display(), e);
			return ExitCode::FAILURE;
		}
	};

	if let Err(e) = setup_logging(&config.logging) {
		eprintln!("Failed to set up logging: {}", e);
		return ExitCode::FAILURE;
	}

	let listener = match bootstrap::initialize_listener(&config).await {
		Ok(listener) => listener,
		Err(e) => {
			error!("Initialization failed: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let strict = std::env::var("CHAINWATCH_STRICT").is_ok();
	if let Err(e) = listener.start(strict).await {
		error!("Start failed: {}", e);
		return ExitCode::FAILURE;
	}

	info!("Service started. Press Ctrl+C to shutdown");
	wait_for_shutdown_signal().await;
	info!("Shutdown signal received, stopping services...");

	if let Err(e) = listener.stop().await {
		error!("Error during shutdown: {}", e);
		return ExitCode::FAILURE;
	}
	info!("Shutdown complete");
	ExitCode::SUCCESS
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
	use tokio::signal::unix::{signal, SignalKind};
	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(sigterm) => sigterm,
		Err(e) => {
			error!("Failed to install SIGTERM handler: {}", e);
			let _ = tokio::signal::ctrl_c().await;
			return;
		}
	};
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		_ = sigterm.recv() => {}
	}
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
}
