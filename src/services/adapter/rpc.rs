//! JSON-RPC and REST over HTTP.
//!
//! One retry-wrapped `reqwest` client is built per adapter; JSON-RPC chains
//! (EVM receipts/blocks, Solana account reads, Sui event queries) go through
//! [`HttpRpcClient::call`], REST chains (Bitcoin, Tron) use the raw client
//! through the `get`/`post` helpers.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::error::AdapterError;

/// Builds the shared retry-wrapped HTTP client
pub fn build_http_client(
	timeout: Duration,
	max_retries: u32,
) -> Result<ClientWithMiddleware, AdapterError> {
	let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
	let client = reqwest::Client::builder()
		.timeout(timeout)
		.build()
		.map_err(|e| AdapterError::internal_error(format!("HTTP client build failed: {}", e)))?;
	Ok(ClientBuilder::new(client)
		.with(RetryTransientMiddleware::new_with_policy(retry_policy))
		.build())
}

/// JSON-RPC over HTTP client
pub struct HttpRpcClient {
	client: ClientWithMiddleware,
	url: String,
	next_id: AtomicU64,
}

impl HttpRpcClient {
	pub fn new(url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self, AdapterError> {
		Ok(Self {
			client: build_http_client(timeout, max_retries)?,
			url: url.into(),
			next_id: AtomicU64::new(1),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Sends one JSON-RPC call and returns its `result`
	pub async fn call(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let envelope = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.url)
			.json(&envelope)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(AdapterError::request_error(format!(
				"{} returned HTTP {}",
				method, status
			)));
		}

		let body: Value = response
			.json()
			.await
			.map_err(|e| AdapterError::protocol_error(format!("{}: {}", method, e)))?;

		if let Some(error) = body.get("error") {
			if !error.is_null() {
				return Err(AdapterError::request_error(format!(
					"{} failed: {}",
					method, error
				)));
			}
		}
		Ok(body.get("result").cloned().unwrap_or(Value::Null))
	}
}

/// GET a JSON document from a REST endpoint
pub async fn get_json(
	client: &ClientWithMiddleware,
	url: &str,
) -> Result<Value, AdapterError> {
	let response = client.get(url).send().await?;
	let status = response.status();
	if !status.is_success() {
		return Err(AdapterError::request_error(format!(
			"GET {} returned HTTP {}",
			url, status
		)));
	}
	response
		.json()
		.await
		.map_err(|e| AdapterError::protocol_error(format!("GET {}: {}", url, e)))
}

/// GET a plain-text document from a REST endpoint (esplora tip height style)
pub async fn get_text(
	client: &ClientWithMiddleware,
	url: &str,
) -> Result<String, AdapterError> {
	let response = client.get(url).send().await?;
	let status = response.status();
	if !status.is_success() {
		return Err(AdapterError::request_error(format!(
			"GET {} returned HTTP {}",
			url, status
		)));
	}
	response
		.text()
		.await
		.map_err(|e| AdapterError::request_error(format!("GET {}: {}", url, e)))
}
