//! Sui chain support.

#[allow(clippy::module_inception)]
mod adapter;
mod classify;

pub use adapter::{validate_sui_address, SuiAdapter};
pub use classify::{classify_move_type, extract_token_type};
