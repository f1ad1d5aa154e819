//! Bitcoin chain support.

#[allow(clippy::module_inception)]
mod adapter;

pub use adapter::{validate_bitcoin_address, BitcoinAdapter};
