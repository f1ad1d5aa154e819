//! Solana chain support.

#[allow(clippy::module_inception)]
mod adapter;
mod mint_cache;

pub use adapter::{
	validate_solana_address, SolanaAdapter, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use mint_cache::{MintInfo, MintSupplyCache};
