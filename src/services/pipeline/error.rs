//! Pipeline error types and handling.

use log::error;
use std::fmt;

/// Represents possible errors inside the event pipeline
#[derive(Debug)]
pub enum PipelineError {
	/// A component with the same id is already registered
	DuplicateComponent(String),

	/// A filter raised instead of returning a verdict
	FilterError(String),

	/// An enricher failed; the event passes through unchanged
	EnrichmentError(String),

	/// A processor failed to produce a processed event
	ProcessorError(String),

	/// Failure outside any single component
	InternalError(String),
}

impl PipelineError {
	fn format_message(&self) -> String {
		match self {
			Self::DuplicateComponent(id) => format!("Duplicate component id: {}", id),
			Self::FilterError(msg) => format!("Filter error: {}", msg),
			Self::EnrichmentError(msg) => format!("Enrichment error: {}", msg),
			Self::ProcessorError(msg) => format!("Processor error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new duplicate-component error with logging
	pub fn duplicate_component(id: impl Into<String>) -> Self {
		let error = Self::DuplicateComponent(id.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new filter error with logging
	pub fn filter_error(msg: impl Into<String>) -> Self {
		let error = Self::FilterError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new enrichment error with logging
	pub fn enrichment_error(msg: impl Into<String>) -> Self {
		let error = Self::EnrichmentError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new processor error with logging
	pub fn processor_error(msg: impl Into<String>) -> Self {
		let error = Self::ProcessorError(msg.into());
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

impl fmt::Display for PipelineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for PipelineError {}

impl From<serde_json::Error> for PipelineError {
	fn from(err: serde_json::Error) -> Self {
		Self::internal_error(err.to_string())
	}
}
