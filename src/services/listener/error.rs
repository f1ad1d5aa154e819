//! Listener facade error types.

use log::error;
use std::fmt;

use crate::services::manager::ManagerError;

/// Represents possible errors at the listener facade
#[derive(Debug)]
pub enum ListenerError {
	/// `start()` failed (no adapter connected in strict mode, wiring error)
	StartupError(String),

	/// A lifecycle call arrived in the wrong state
	StateError(String),

	/// Target mutation rejected
	TargetError(String),
}

impl ListenerError {
	fn format_message(&self) -> String {
		match self {
			Self::StartupError(msg) => format!("Startup error: {}", msg),
			Self::StateError(msg) => format!("State error: {}", msg),
			Self::TargetError(msg) => format!("Target error: {}", msg),
		}
	}

	/// Creates a new startup error with logging
	pub fn startup_error(msg: impl Into<String>) -> Self {
		let error = Self::StartupError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new state error with logging
	pub fn state_error(msg: impl Into<String>) -> Self {
		let error = Self::StateError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new target error with logging
	pub fn target_error(msg: impl Into<String>) -> Self {
		let error = Self::TargetError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for ListenerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for ListenerError {}

impl From<ManagerError> for ListenerError {
	fn from(err: ManagerError) -> Self {
		match err {
			ManagerError::TargetError(msg) => Self::TargetError(msg),
			other => Self::StartupError(other.to_string()),
		}
	}
}
