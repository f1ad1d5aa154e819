//! Structured log notification implementation.
//!
//! Writes one JSON or plain-text record per processed event at a configured
//! severity: to the console through the logging facade, and to a
//! size-capped rotating file sink (`listener.log`, `listener.log.1`, … up
//! to N rotations, oldest deleted).

use async_trait::async_trait;
use byte_unit::Byte;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{LogFormat, LogLevel, ProcessedEvent};
use crate::services::notification::{NotificationError, Notifier};

/// Configuration of the structured log sink
#[derive(Debug, Clone)]
pub struct LogNotifierConfig {
	/// Base file path; rotations append `.1`, `.2`, …
	pub path: PathBuf,
	/// Size cap per file, human-readable ("10MB", "512KiB")
	pub max_file_size: String,
	/// Rotated files kept before the oldest is deleted
	pub max_rotations: u32,
	pub format: LogFormat,
	pub level: LogLevel,
}

impl Default for LogNotifierConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from("logs/events.log"),
			max_file_size: "10MB".into(),
			max_rotations: 5,
			format: LogFormat::Json,
			level: LogLevel::Info,
		}
	}
}

struct Sink {
	file: Option<File>,
}

/// Structured log sink with rotated files and a console record
pub struct LogNotifier {
	config: LogNotifierConfig,
	size_cap: u64,
	sink: Mutex<Sink>,
}

impl LogNotifier {
	pub fn new(config: LogNotifierConfig) -> Result<Self, NotificationError> {
		let size_cap = Byte::from_str(&config.max_file_size)
			.map_err(|e| {
				NotificationError::config_error(format!(
					"Invalid max_file_size '{}': {}",
					config.max_file_size, e
				))
			})?
			.as_u64();
		if size_cap == 0 {
			return Err(NotificationError::config_error(
				"max_file_size must be greater than zero",
			));
		}
		if let Some(parent) = config.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		Ok(Self {
			config,
			size_cap,
			sink: Mutex::new(Sink { file: None }),
		})
	}

	fn render(&self, event: &ProcessedEvent) -> Result<String, NotificationError> {
		match self.config.format {
			LogFormat::Json => Ok(serde_json::to_string(event)?),
			LogFormat::Text => {
				let classification = event
					.metadata
					.classification
					.as_ref()
					.map(|c| format!("{:?}", c.category))
					.unwrap_or_else(|| "unclassified".into());
				Ok(format!(
					"{} chain={} kind={} block={} tx={} confirmed={} amount={} class={}",
					event.id,
					event.original.chain,
					event.original.kind,
					event.original.block_number,
					event.original.tx_hash,
					event.original.confirmed,
					event.original.data.amount().unwrap_or("-"),
					classification
				))
			}
		}
	}

	fn console_record(&self, line: &str) {
		match self.config.level {
			LogLevel::Debug => log::debug!("{}", line),
			LogLevel::Info => log::info!("{}", line),
			LogLevel::Warn => log::warn!("{}", line),
			LogLevel::Error => log::error!("{}", line),
		}
	}

	/// Shifts `path.N-1` → `path.N`, dropping the oldest rotation
	fn rotate(&self) -> Result<(), NotificationError> {
		let base = &self.config.path;
		let rotation_path = |n: u32| {
			let mut p = base.clone().into_os_string();
			p.push(format!(".{}", n));
			PathBuf::from(p)
		};
		let oldest = rotation_path(self.config.max_rotations);
		if oldest.exists() {
			std::fs::remove_file(&oldest)?;
		}
		for n in (1..self.config.max_rotations).rev() {
			let from = rotation_path(n);
			if from.exists() {
				std::fs::rename(&from, rotation_path(n + 1))?;
			}
		}
		if base.exists() {
			std::fs::rename(base, rotation_path(1))?;
		}
		Ok(())
	}

	fn write_line(&self, sink: &mut Sink, line: &str) -> Result<(), NotificationError> {
		if sink.file.is_none() {
			sink.file = Some(
				OpenOptions::new()
					.create(true)
					.append(true)
					.open(&self.config.path)?,
			);
		}
		let file = sink.file.as_mut().expect("file opened above");
		writeln!(file, "{}", line)?;
		file.flush()?;

		let size = file.metadata()?.len();
		if size >= self.size_cap {
			sink.file = None;
			self.rotate()?;
		}
		Ok(())
	}
}

#[async_trait]
impl Notifier for LogNotifier {
	fn id(&self) -> &str {
		"structured_log"
	}

	fn retry_attempts(&self) -> u32 {
		1
	}

	fn retry_delay(&self) -> Duration {
		Duration::from_millis(100)
	}

	async fn notify(&self, event: &ProcessedEvent) -> Result<(), NotificationError> {
		let line = self.render(event)?;
		self.console_record(&line);
		let mut sink = self.sink.lock().await;
		self.write_line(&mut sink, &line)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{CanonicalEvent, ChainKind, EventPayload, TransferPayload};
	use tempfile::TempDir;

	fn sample_processed(n: u64) -> ProcessedEvent {
		let event = CanonicalEvent::new(
			ChainKind::Bsc,
			format!("0x{:x}", n),
			None,
			n,
			n,
			0,
			0,
			EventPayload::Transfer(TransferPayload {
				amount: Some("12345".into()),
				..Default::default()
			}),
		);
		ProcessedEvent::new(event, format!("corr-{}", n))
	}

	fn config_in(dir: &TempDir, max_size: &str, rotations: u32, format: LogFormat) -> LogNotifierConfig {
		LogNotifierConfig {
			path: dir.path().join("events.log"),
			max_file_size: max_size.into(),
			max_rotations: rotations,
			format,
			level: LogLevel::Info,
		}
	}

	#[test]
	fn test_bad_size_rejected() {
		let dir = TempDir::new().unwrap();
		let config = config_in(&dir, "lots", 3, LogFormat::Json);
		assert!(matches!(
			LogNotifier::new(config),
			Err(NotificationError::ConfigError(_))
		));
	}

	#[tokio::test]
	async fn test_json_record_written() {
		let dir = TempDir::new().unwrap();
		let config = config_in(&dir, "1MB", 3, LogFormat::Json);
		let path = config.path.clone();
		let notifier = LogNotifier::new(config).unwrap();

		notifier.notify(&sample_processed(1)).await.unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		let record: serde_json::Value =
			serde_json::from_str(contents.lines().next().unwrap()).unwrap();
		assert_eq!(record["id"], "processed_bsc_0x1");
		assert_eq!(record["original"]["chain"], "bsc");
	}

	#[tokio::test]
	async fn test_text_record_written() {
		let dir = TempDir::new().unwrap();
		let config = config_in(&dir, "1MB", 3, LogFormat::Text);
		let path = config.path.clone();
		let notifier = LogNotifier::new(config).unwrap();

		notifier.notify(&sample_processed(2)).await.unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		assert!(contents.contains("chain=bsc"));
		assert!(contents.contains("amount=12345"));
	}

	#[tokio::test]
	async fn test_rotation_on_size_cap() {
		let dir = TempDir::new().unwrap();
		// Tiny cap so every record rotates
		let config = config_in(&dir, "64B", 2, LogFormat::Text);
		let base = config.path.clone();
		let notifier = LogNotifier::new(config).unwrap();

		for n in 0..4 {
			notifier.notify(&sample_processed(n)).await.unwrap();
		}

		let first = PathBuf::from(format!("{}.1", base.display()));
		let second = PathBuf::from(format!("{}.2", base.display()));
		let third = PathBuf::from(format!("{}.3", base.display()));
		assert!(first.exists());
		assert!(second.exists());
		// Rotations beyond the cap are dropped
		assert!(!third.exists());
	}
}
