//!
//! JSON-RPC client for read-only Solana chain queries.
//!
//! Balance and cluster lookups for the Solana adapters go to a network RPC
//! endpoint rather than through the wallet extension. Requests are plain
//! request/response with no retries; callers keep their previous value on
//! failure.

use reqwest::Client;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Read-only chain queries used by the Solana adapters.
#[async_trait::async_trait]
pub trait SolanaRpc: Send + Sync {
	/// Balance of `address` in lamports.
	async fn get_balance(&self, address: &str) -> Result<u64, RpcError>;

	/// Genesis hash of the cluster behind the endpoint.
	async fn get_genesis_hash(&self) -> Result<String, RpcError>;
}

/// Error types for RPC operations
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("HTTP status {0}")]
	StatusError(u16),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("RPC error {code}: {message}")]
	RpcError { code: i64, message: String },

	#[error("No data returned")]
	NoData,
}

/// Solana JSON-RPC 2.0 client
#[derive(Debug)]
pub struct SolanaRpcClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The RPC endpoint.
	rpc_url: String,
	/// Monotonic JSON-RPC request id.
	next_id: AtomicU64,
}

impl SolanaRpcClient {
	/// Create a new RPC client.
	///
	/// # Arguments
	/// * `rpc_url` - The HTTP JSON-RPC endpoint.
	/// * `timeout` - Per-request timeout.
	pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, RpcError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			next_id: AtomicU64::new(1),
		})
	}

	pub fn rpc_url(&self) -> &str {
		&self.rpc_url
	}

	/// Execute a JSON-RPC call and return its `result` member.
	///
	/// # Arguments
	/// * `method` - The RPC method name.
	/// * `params` - Positional parameters.
	///
	/// # Returns
	/// The `result` value, or an `RpcError` if the transport fails or the
	/// node answers with an error object.
	pub async fn execute(&self, method: &str, params: Value) -> Result<Value, RpcError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("RPC request {} -> {}", method, self.rpc_url);

		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(RpcError::StatusError(response.status().as_u16()));
		}

		let response_json: Value = response.json().await?;
		parse_rpc_response(response_json)
	}
}

/// Split a JSON-RPC response into its result or error.
fn parse_rpc_response(mut response: Value) -> Result<Value, RpcError> {
	if let Some(error) = response.get("error") {
		let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("Unknown RPC error")
			.to_string();
		return Err(RpcError::RpcError { code, message });
	}

	match response.get_mut("result").map(Value::take) {
		Some(Value::Null) | None => Err(RpcError::NoData),
		Some(result) => Ok(result),
	}
}

#[async_trait::async_trait]
impl SolanaRpc for SolanaRpcClient {
	async fn get_balance(&self, address: &str) -> Result<u64, RpcError> {
		let result = self
			.execute("getBalance", json!([address, { "commitment": "confirmed" }]))
			.await?;

		// { "context": { "slot": .. }, "value": <lamports> }
		result
			.get("value")
			.and_then(Value::as_u64)
			.ok_or(RpcError::NoData)
	}

	async fn get_genesis_hash(&self) -> Result<String, RpcError> {
		let result = self.execute("getGenesisHash", json!([])).await?;
		result
			.as_str()
			.map(str::to_string)
			.ok_or(RpcError::NoData)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_result() {
		let response = json!({ "jsonrpc": "2.0", "id": 1, "result": { "value": 42 } });
		let result = parse_rpc_response(response).unwrap();
		assert_eq!(result["value"], 42);
	}

	#[test]
	fn surfaces_error_object() {
		let response = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"error": { "code": -32602, "message": "Invalid param: WrongSize" }
		});
		match parse_rpc_response(response) {
			Err(RpcError::RpcError { code, message }) => {
				assert_eq!(code, -32602);
				assert!(message.contains("WrongSize"));
			}
			other => panic!("unexpected: {:?}", other),
		}
	}

	#[test]
	fn null_result_is_no_data() {
		let response = json!({ "jsonrpc": "2.0", "id": 1, "result": null });
		assert!(matches!(parse_rpc_response(response), Err(RpcError::NoData)));
	}
}
