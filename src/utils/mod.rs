//! Utility modules for common functionality.
//!
//! This module provides various utility functions and types that are used across
//! the application. Currently includes:
//!
//! - retry: Configurable retry mechanism for async operations
//! - dedup: Bounded de-duplication set for event ids
//! - logging: tracing-subscriber setup from the `[logging]` config section

mod dedup;
mod logging;
mod retry;

pub use dedup::*;
pub use logging::*;
pub use retry::*;
