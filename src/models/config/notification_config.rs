//! Database, logging, notification and performance configuration sections.

use serde::{Deserialize, Serialize};

/// `[database]` section: the Redis connection the pub/sub notifier uses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
	pub redis_url: String,
	#[serde(default = "default_pool_size")]
	pub connection_pool_size: u32,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			redis_url: "redis://127.0.0.1:6379".into(),
			connection_pool_size: default_pool_size(),
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Text,
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
	#[serde(default = "default_log_level")]
	pub level: LogLevel,
	#[serde(default = "default_log_format")]
	pub format: LogFormat,
	#[serde(default)]
	pub correlation_tracking: bool,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_log_level(),
			format: default_log_format(),
			correlation_tracking: false,
		}
	}
}

/// Delivery channels `[notifications].channels` may enable
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
	Webhook,
	RedisPubsub,
}

/// `[notifications]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationsConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub channels: Vec<NotificationChannel>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub webhook_url: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redis_channel: Option<String>,
}

impl NotificationsConfig {
	pub fn validate(&self) -> Result<(), String> {
		if !self.enabled {
			return Ok(());
		}
		if self.channels.contains(&NotificationChannel::Webhook)
			&& self.webhook_url.as_deref().unwrap_or("").is_empty()
		{
			return Err("notifications: webhook channel enabled without webhook_url".into());
		}
		if self.channels.contains(&NotificationChannel::RedisPubsub)
			&& self.redis_channel.as_deref().unwrap_or("").is_empty()
		{
			return Err("notifications: redis_pubsub channel enabled without redis_channel".into());
		}
		Ok(())
	}
}

/// `[performance]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
	#[serde(default = "default_worker_pool_size")]
	pub worker_pool_size: u32,
	#[serde(default = "default_max_concurrent_requests")]
	pub max_concurrent_requests: u32,
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	#[serde(default = "default_circuit_breaker_threshold")]
	pub circuit_breaker_threshold: u32,
}

impl Default for PerformanceConfig {
	fn default() -> Self {
		Self {
			worker_pool_size: default_worker_pool_size(),
			max_concurrent_requests: default_max_concurrent_requests(),
			request_timeout_ms: default_request_timeout_ms(),
			circuit_breaker_threshold: default_circuit_breaker_threshold(),
		}
	}
}

fn default_pool_size() -> u32 {
	10
}

fn default_log_level() -> LogLevel {
	LogLevel::Info
}

fn default_log_format() -> LogFormat {
	LogFormat::Text
}

fn default_worker_pool_size() -> u32 {
	4
}

fn default_max_concurrent_requests() -> u32 {
	32
}

fn default_request_timeout_ms() -> u64 {
	10_000
}

fn default_circuit_breaker_threshold() -> u32 {
	5
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_webhook_channel_requires_url() {
		let config = NotificationsConfig {
			enabled: true,
			channels: vec![NotificationChannel::Webhook],
			webhook_url: None,
			redis_channel: None,
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_disabled_notifications_skip_validation() {
		let config = NotificationsConfig {
			enabled: false,
			channels: vec![NotificationChannel::Webhook],
			webhook_url: None,
			redis_channel: None,
		};
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_channel_names_decode() {
		let raw = r#"
			enabled = true
			channels = ["webhook", "redis_pubsub"]
			webhook_url = "https://hooks.example.com/x"
			redis_channel = "chain-events"
		"#;
		let config: NotificationsConfig = toml::from_str(raw).unwrap();
		assert_eq!(
			config.channels,
			vec![NotificationChannel::Webhook, NotificationChannel::RedisPubsub]
		);
		assert!(config.validate().is_ok());
	}
}
