//! Typed signal channels between adapters and the chain manager.
//!
//! Instead of a general-purpose event emitter, each adapter is handed an
//! [`AdapterEmitter`] holding three independent senders — canonical events,
//! connection status updates, and errors — so each observer's contract is
//! checkable at the boundary. The manager owns the receiving halves.

use log::warn;
use tokio::sync::mpsc;

use super::adapter::ConnectionStatus;
use super::error::AdapterError;
use crate::models::{CanonicalEvent, ChainKind};

/// Default depth of the event channel between an adapter and the pipeline
pub const EVENT_CHANNEL_DEPTH: usize = 1024;

/// Sending half handed to an adapter
#[derive(Clone)]
pub struct AdapterEmitter {
	chain: ChainKind,
	events: mpsc::Sender<CanonicalEvent>,
	status: mpsc::Sender<(ChainKind, ConnectionStatus)>,
	errors: mpsc::Sender<(ChainKind, AdapterError)>,
}

impl AdapterEmitter {
	/// Emits one canonical event upward
	///
	/// Awaits when the channel is full (backpressure); a closed channel means
	/// the manager is gone and the event is logged and dropped — event loss
	/// is preferred over adapter death.
	pub async fn emit_event(&self, event: CanonicalEvent) {
		if let Err(e) = self.events.send(event).await {
			warn!("{}: event channel closed, dropping event {}", self.chain, e.0.id);
		}
	}

	pub async fn emit_status(&self, status: ConnectionStatus) {
		if self.status.send((self.chain, status)).await.is_err() {
			warn!("{}: status channel closed", self.chain);
		}
	}

	pub async fn emit_error(&self, error: AdapterError) {
		if self.errors.send((self.chain, error)).await.is_err() {
			warn!("{}: error channel closed", self.chain);
		}
	}
}

/// Receiving halves owned by the manager
pub struct AdapterStreams {
	pub events: mpsc::Receiver<CanonicalEvent>,
	pub status: mpsc::Receiver<(ChainKind, ConnectionStatus)>,
	pub errors: mpsc::Receiver<(ChainKind, AdapterError)>,
}

/// Builds the paired channel set for one adapter
pub fn adapter_channel(chain: ChainKind) -> (AdapterEmitter, AdapterStreams) {
	let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
	let (status_tx, status_rx) = mpsc::channel(64);
	let (error_tx, error_rx) = mpsc::channel(64);
	(
		AdapterEmitter {
			chain,
			events: event_tx,
			status: status_tx,
			errors: error_tx,
		},
		AdapterStreams {
			events: event_rx,
			status: status_rx,
			errors: error_rx,
		},
	)
}
