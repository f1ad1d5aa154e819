//! Chain adapter framework and concrete adapters.
//!
//! The adapter layer translates native chain observations into canonical
//! events. Each chain family gets one adapter implementing [`ChainAdapter`];
//! all of them share the transports (`ws`, `rpc`), the typed signal channels
//! (`emitter`) and the heartbeat/retry conventions.

#[allow(clippy::module_inception)]
mod adapter;
mod emitter;
mod error;
mod rpc;
mod ws;

pub mod bitcoin;
pub mod evm;
pub mod solana;
pub mod sui;
pub mod tron;

pub use adapter::{
	spawn_heartbeat, ChainAdapter, ConnectionStatus, FeeEstimateRequest, Heartbeat,
	HEARTBEAT_INTERVAL,
};
pub use emitter::{adapter_channel, AdapterEmitter, AdapterStreams, EVENT_CHANNEL_DEPTH};
pub use error::AdapterError;
pub use rpc::{build_http_client, get_json, get_text, HttpRpcClient};
pub use ws::{Subscription, WsRpcClient};

pub use bitcoin::BitcoinAdapter;
pub use evm::{EvmAdapter, EvmAddressFormat};
pub use solana::SolanaAdapter;
pub use sui::SuiAdapter;
pub use tron::TronAdapter;
