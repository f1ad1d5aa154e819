//! Chain manager error types and handling.

use log::error;
use std::fmt;

/// Represents possible errors during chain manager operations
#[derive(Debug)]
pub enum ManagerError {
	/// Adapter registration conflicts (duplicate chain kinds)
	RegistrationError(String),

	/// Lifecycle transition failures (start/stop/reconnect)
	LifecycleError(String),

	/// Target mutations rejected by every eligible adapter
	TargetError(String),
}

impl ManagerError {
	fn format_message(&self) -> String {
		match self {
			Self::RegistrationError(msg) => format!("Registration error: {}", msg),
			Self::LifecycleError(msg) => format!("Lifecycle error: {}", msg),
			Self::TargetError(msg) => format!("Target error: {}", msg),
		}
	}

	/// Creates a new registration error with logging
	pub fn registration_error(msg: impl Into<String>) -> Self {
		let error = Self::RegistrationError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new lifecycle error with logging
	pub fn lifecycle_error(msg: impl Into<String>) -> Self {
		let error = Self::LifecycleError(msg.into());
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

impl fmt::Display for ManagerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for ManagerError {}
