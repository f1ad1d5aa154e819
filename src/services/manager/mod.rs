//! Chain manager: adapter registry, lifecycle supervision and event
//! plumbing into the pipeline.

mod error;
mod service;

pub use error::ManagerError;
pub use service::{
	AdapterState, ChainManager, ChainManagerConfig, ManagerEvent,
};
