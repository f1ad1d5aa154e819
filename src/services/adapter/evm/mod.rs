//! EVM-compatible chain support (Ethereum, BSC, TRX-as-EVM variant).

#[allow(clippy::module_inception)]
mod adapter;
pub mod decode;

pub use adapter::{EvmAdapter, EvmAddressFormat};
pub use decode::{ERC20_TRANSFER_TOPIC, KNOWN_MINT_TOPICS};
