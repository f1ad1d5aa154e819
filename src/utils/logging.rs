//! Logging utilities for the application
//!
//! This module provides utilities for setting up and configuring logging for the application.
//! It uses the `tracing_subscriber` crate to configure the logging.
//!
//! The `[logging]` section of the configuration selects the base level and
//! whether records are rendered as compact text or JSON; the `RUST_LOG`
//! environment variable still overrides the configured level.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::models::{LogFormat, LoggingConfig};

/// Setup logging for the application from the `[logging]` config section
///
/// Writes to stdout. The `RUST_LOG` environment variable, when set, takes
/// precedence over the configured level.
pub fn setup_logging(
	config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	setup_logging_with_writer(config, std::io::stdout)?;
	Ok(())
}

/// Setup logging for the application with a custom writer
pub fn setup_logging_with_writer<W>(
	config: &LoggingConfig,
	writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

	match config.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(writer).json())
				.try_init()?;
		}
		LogFormat::Text => {
			tracing_subscriber::registry()
				.with(filter)
				.with(
					fmt::layer()
						.with_writer(writer)
						.event_format(
							fmt::format()
								.with_level(true)
								.with_target(true)
								.with_thread_ids(false)
								.with_thread_names(false)
								.with_ansi(true)
								.compact(),
						)
						.fmt_fields(fmt::format::PrettyFields::new()),
				)
				.try_init()?;
		}
	}
	Ok(())
}
