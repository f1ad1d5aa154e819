//! Notification error types and handling.
//!
//! Provides error types for notification-related operations,
//! including delivery failures and configuration problems.

use log::error;
use std::{error::Error, fmt};

/// Represents possible errors during notification operations
#[derive(Debug)]
pub enum NotificationError {
	/// Delivery failed (webhook status, pub/sub publish, file write)
	DeliveryError(String),
	/// Configuration-related errors
	ConfigError(String),
	/// Internal errors (e.g. payload serialization)
	InternalError(String),
}

impl NotificationError {
	/// Formats the error message based on the error type
	fn format_message(&self) -> String {
		match self {
			Self::DeliveryError(msg) => format!("Delivery error: {}", msg),
			Self::ConfigError(msg) => format!("Config error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new delivery error with logging
	pub fn delivery_error(msg: impl Into<String>) -> Self {
		let error = Self::DeliveryError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new configuration error with logging
	pub fn config_error(msg: impl Into<String>) -> Self {
		let error = Self::ConfigError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl From<reqwest::Error> for NotificationError {
	fn from(error: reqwest::Error) -> Self {
		Self::delivery_error(error.to_string())
	}
}

impl From<redis::RedisError> for NotificationError {
	fn from(error: redis::RedisError) -> Self {
		Self::delivery_error(error.to_string())
	}
}

impl From<serde_json::Error> for NotificationError {
	fn from(error: serde_json::Error) -> Self {
		Self::internal_error(error.to_string())
	}
}

impl From<std::io::Error> for NotificationError {
	fn from(error: std::io::Error) -> Self {
		Self::delivery_error(error.to_string())
	}
}

impl fmt::Display for NotificationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for NotificationError {}
