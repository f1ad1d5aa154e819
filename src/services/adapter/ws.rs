//! JSON-RPC over WebSocket transport.
//!
//! Shared by the EVM and Solana adapters: both speak the same envelope
//! (incrementing request ids, `result`/`error` responses, and notification
//! frames carrying a `params.subscription` routing key). The client owns a
//! reader task that correlates responses with pending requests and fans
//! notification payloads out to per-subscription channels in arrival order.

use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::error::AdapterError;

/// Depth of each per-subscription notification channel
const SUBSCRIPTION_CHANNEL_DEPTH: usize = 256;

/// An active push subscription
pub struct Subscription {
	/// Raw subscription id as returned by the node (hex string or number)
	pub id: Value,
	/// Canonical routing key derived from the id
	pub key: String,
	/// Notification payloads (`params.result`), in arrival order
	pub receiver: mpsc::Receiver<Value>,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, AdapterError>>>>>;
type SubscriptionMap = Arc<Mutex<HashMap<String, mpsc::Sender<Value>>>>;

/// JSON-RPC WebSocket client with request correlation and subscription
/// routing
pub struct WsRpcClient {
	outgoing: mpsc::Sender<Message>,
	pending: PendingMap,
	subscriptions: SubscriptionMap,
	next_id: AtomicU64,
	healthy: Arc<AtomicBool>,
	request_timeout: Duration,
	reader: Mutex<Option<JoinHandle<()>>>,
	writer: Mutex<Option<JoinHandle<()>>>,
}

impl WsRpcClient {
	/// Connects to the endpoint and spawns the reader/writer tasks
	pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self, AdapterError> {
		let (stream, _) = connect_async(url).await?;
		let (mut sink, mut source) = stream.split();

		let (outgoing, mut outgoing_rx) = mpsc::channel::<Message>(64);
		let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
		let subscriptions: SubscriptionMap = Arc::new(Mutex::new(HashMap::new()));
		let healthy = Arc::new(AtomicBool::new(true));

		let writer = tokio::spawn({
			let healthy = healthy.clone();
			async move {
				while let Some(message) = outgoing_rx.recv().await {
					if sink.send(message).await.is_err() {
						healthy.store(false, Ordering::SeqCst);
						break;
					}
				}
			}
		});

		let reader = tokio::spawn({
			let pending = pending.clone();
			let subscriptions = subscriptions.clone();
			let healthy = healthy.clone();
			async move {
				while let Some(message) = source.next().await {
					let text = match message {
						Ok(Message::Text(text)) => text.to_string(),
						Ok(Message::Close(_)) | Err(_) => break,
						Ok(_) => continue,
					};
					let frame: Value = match serde_json::from_str(&text) {
						Ok(frame) => frame,
						Err(e) => {
							warn!("Dropping undecodable WebSocket frame: {}", e);
							continue;
						}
					};
					route_frame(frame, &pending, &subscriptions).await;
				}
				healthy.store(false, Ordering::SeqCst);
				// Fail fast for anyone still awaiting a response
				let mut pending = pending.lock().await;
				for (_, sender) in pending.drain() {
					let _ = sender.send(Err(AdapterError::ConnectionError(
						"WebSocket closed".into(),
					)));
				}
			}
		});

		Ok(Self {
			outgoing,
			pending,
			subscriptions,
			next_id: AtomicU64::new(1),
			healthy,
			request_timeout,
			reader: Mutex::new(Some(reader)),
			writer: Mutex::new(Some(writer)),
		})
	}

	pub fn is_healthy(&self) -> bool {
		self.healthy.load(Ordering::SeqCst)
	}

	/// Sends one request and awaits its response
	pub async fn request(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
		if !self.is_healthy() {
			return Err(AdapterError::connection_error("WebSocket not connected"));
		}
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let envelope = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let (tx, rx) = oneshot::channel();
		self.pending.lock().await.insert(id, tx);

		let frame = Message::Text(envelope.to_string().into());
		if self.outgoing.send(frame).await.is_err() {
			self.pending.lock().await.remove(&id);
			return Err(AdapterError::connection_error("WebSocket writer gone"));
		}

		match tokio::time::timeout(self.request_timeout, rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(AdapterError::connection_error(
				"WebSocket closed while awaiting response",
			)),
			Err(_) => {
				self.pending.lock().await.remove(&id);
				Err(AdapterError::request_error(format!(
					"{} timed out after {}ms",
					method,
					self.request_timeout.as_millis()
				)))
			}
		}
	}

	/// Issues a subscription request and registers a routing channel for its
	/// notifications
	pub async fn subscribe(&self, method: &str, params: Value) -> Result<Subscription, AdapterError> {
		let id = self.request(method, params).await?;
		if id.is_null() {
			return Err(AdapterError::subscription_error(format!(
				"{} returned a null subscription id",
				method
			)));
		}
		let key = subscription_key(&id);
		let (tx, rx) = mpsc::channel(SUBSCRIPTION_CHANNEL_DEPTH);
		self.subscriptions.lock().await.insert(key.clone(), tx);
		debug!("Registered subscription {} via {}", key, method);
		Ok(Subscription {
			id,
			key,
			receiver: rx,
		})
	}

	/// Cancels a subscription and removes its routing channel
	pub async fn unsubscribe(&self, method: &str, subscription: &Value) -> Result<(), AdapterError> {
		self.subscriptions
			.lock()
			.await
			.remove(&subscription_key(subscription));
		// Best effort: the node may already consider the subscription gone
		match self.request(method, json!([subscription])).await {
			Ok(_) => Ok(()),
			Err(e) => {
				warn!("Unsubscribe via {} failed: {}", method, e);
				Ok(())
			}
		}
	}

	/// Closes the socket and stops the reader/writer tasks
	pub async fn close(&self) {
		self.healthy.store(false, Ordering::SeqCst);
		let _ = self.outgoing.send(Message::Close(None)).await;
		if let Some(writer) = self.writer.lock().await.take() {
			writer.abort();
		}
		if let Some(reader) = self.reader.lock().await.take() {
			reader.abort();
		}
		self.subscriptions.lock().await.clear();
	}
}

/// Routes one incoming frame to a pending request or a subscription channel
async fn route_frame(frame: Value, pending: &PendingMap, subscriptions: &SubscriptionMap) {
	if let Some(id) = frame.get("id").and_then(Value::as_u64) {
		let sender = pending.lock().await.remove(&id);
		if let Some(sender) = sender {
			let outcome = match frame.get("error") {
				Some(error) if !error.is_null() => {
					Err(AdapterError::RequestError(error.to_string()))
				}
				_ => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
			};
			let _ = sender.send(outcome);
		}
		return;
	}

	let Some(params) = frame.get("params") else {
		return;
	};
	let Some(sub_id) = params.get("subscription") else {
		return;
	};
	let key = subscription_key(sub_id);
	let sender = subscriptions.lock().await.get(&key).cloned();
	if let Some(sender) = sender {
		let payload = params.get("result").cloned().unwrap_or(Value::Null);
		// Awaiting preserves per-subscription arrival order under slow
		// consumers
		if sender.send(payload).await.is_err() {
			subscriptions.lock().await.remove(&key);
		}
	}
}

/// Canonical routing key for a subscription id (hex string on EVM nodes,
/// integer on Solana nodes)
fn subscription_key(id: &Value) -> String {
	match id.as_str() {
		Some(s) => s.to_string(),
		None => id.to_string(),
	}
}
