//! Adapter error types and handling.
//!
//! Chain-local failures stay chain-local: connection problems surface through
//! the adapter's error signal for the manager to act on, decode failures drop
//! the offending observation, and validation failures are returned
//! synchronously to the caller mutating targets.

use log::error;
use std::fmt;

/// Represents possible errors that can occur inside a chain adapter
#[derive(Debug)]
pub enum AdapterError {
	/// Transport-level failure: RPC, WebSocket or HTTP connectivity
	ConnectionError(String),

	/// Malformed request or unexpected response from the node
	RequestError(String),

	/// An on-chain event could not be decoded; the observation is dropped
	ProtocolError(String),

	/// Address or target rejected before registration
	ValidationError(String),

	/// Subscription setup or teardown failure
	SubscriptionError(String),

	/// Internal errors within the adapter
	InternalError(String),
}

impl AdapterError {
	/// Formats the error message based on the error type
	fn format_message(&self) -> String {
		match self {
			Self::ConnectionError(msg) => format!("Connection error: {}", msg),
			Self::RequestError(msg) => format!("Request error: {}", msg),
			Self::ProtocolError(msg) => format!("Protocol error: {}", msg),
			Self::ValidationError(msg) => format!("Validation error: {}", msg),
			Self::SubscriptionError(msg) => format!("Subscription error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new connection error with logging
	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new request error with logging
	pub fn request_error(msg: impl Into<String>) -> Self {
		let error = Self::RequestError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new protocol error with logging
	pub fn protocol_error(msg: impl Into<String>) -> Self {
		let error = Self::ProtocolError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new validation error with logging
	pub fn validation_error(msg: impl Into<String>) -> Self {
		let error = Self::ValidationError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new subscription error with logging
	pub fn subscription_error(msg: impl Into<String>) -> Self {
		let error = Self::SubscriptionError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Whether the failure is worth a reconnection attempt
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Self::ConnectionError(_) | Self::RequestError(_) | Self::SubscriptionError(_)
		)
	}
}

impl fmt::Display for AdapterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for AdapterError {}

impl From<reqwest::Error> for AdapterError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_connect() || err.is_timeout() {
			Self::connection_error(err.to_string())
		} else {
			Self::request_error(err.to_string())
		}
	}
}

impl From<reqwest_middleware::Error> for AdapterError {
	fn from(err: reqwest_middleware::Error) -> Self {
		match err {
			reqwest_middleware::Error::Reqwest(e) => e.into(),
			reqwest_middleware::Error::Middleware(e) => Self::request_error(e.to_string()),
		}
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for AdapterError {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Self::connection_error(err.to_string())
	}
}

impl From<serde_json::Error> for AdapterError {
	fn from(err: serde_json::Error) -> Self {
		Self::protocol_error(err.to_string())
	}
}
