//! Listener facade: the service's public programmatic surface.

mod error;
mod service;

pub use error::ListenerError;
pub use service::{
	ChainStatusView, EventListener, ListenerEvent, ListenerStats, TargetPatch,
};
