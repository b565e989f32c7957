use super::{
	AccountsHandler, ChainHandler, DisconnectHandler, ETH_DECIMALS, Subscription, WalletAdapter,
	is_evm_address,
};
use crate::provider::injected::resolve_eip1193;
use crate::provider::{
	Eip1193Provider, Listener, NetworkInfo, ProviderEnvironment, ProviderError, ProviderKind,
	networks,
};
use crate::utils::{format_token_amount, parse_hex_quantity};
use crate::wallet::{ConnectError, ConnectedAccount, WalletError};

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// EIP-1193: user rejected the request.
const USER_REJECTED: i64 = 4001;
/// EIP-1193: the requested account or method has not been authorized.
const UNAUTHORIZED: i64 = 4100;
/// JSON-RPC "resource unavailable"; MetaMask's code for an open prompt.
const RESOURCE_UNAVAILABLE: i64 = -32002;

/// Adapter for the EIP-1193 provider injected at `window.ethereum`.
pub struct EvmAdapter {
	environment: Arc<dyn ProviderEnvironment>,
}

impl EvmAdapter {
	pub fn new(environment: Arc<dyn ProviderEnvironment>) -> Self {
		Self { environment }
	}

	fn provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
		resolve_eip1193(self.environment.as_ref(), ProviderKind::EvmA)
	}

	fn require_provider(&self) -> Result<Arc<dyn Eip1193Provider>, WalletError> {
		self.provider()
			.ok_or(WalletError::NotInstalled(ProviderKind::EvmA))
	}

	fn subscribe(&self, event: &'static str, listener: Listener) -> Subscription {
		let Some(provider) = self.provider() else {
			return Subscription::noop();
		};
		let id = provider.on(event, listener);
		Subscription::new(move || provider.remove_listener(event, id))
	}
}

/// Map an EIP-1193 error to the connect taxonomy.
pub fn classify_error(error: &ProviderError) -> ConnectError {
	match error.code {
		Some(USER_REJECTED) => ConnectError::UserRejected,
		Some(RESOURCE_UNAVAILABLE) => ConnectError::RequestPending,
		Some(UNAUTHORIZED) => ConnectError::WalletLocked,
		_ if error.message_contains(&["already pending", "already processing"]) => {
			ConnectError::RequestPending
		}
		_ if error.message_contains(&["locked", "unlock"]) => ConnectError::WalletLocked,
		_ => ConnectError::unknown(error.to_string()),
	}
}

fn string_list(payload: &Value) -> Vec<String> {
	payload
		.as_array()
		.map(|items| {
			items
				.iter()
				.filter_map(Value::as_str)
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}

/// Accounts from an `accountsChanged` payload, dropping malformed entries.
///
/// Returns `None` when the payload is not an array, or when a non-empty
/// array holds no valid address, so a garbled event never ends the session.
fn changed_accounts(payload: &Value) -> Option<Vec<String>> {
	let items = payload.as_array()?;
	let accounts: Vec<String> = items
		.iter()
		.filter_map(Value::as_str)
		.filter(|address| is_evm_address(address))
		.map(str::to_string)
		.collect();
	if accounts.is_empty() && !items.is_empty() {
		return None;
	}
	if accounts.len() < items.len() {
		debug!("Dropped {} malformed accounts", items.len() - accounts.len());
	}
	Some(accounts)
}

#[async_trait::async_trait]
impl WalletAdapter for EvmAdapter {
	fn kind(&self) -> ProviderKind {
		ProviderKind::EvmA
	}

	async fn connect(&self) -> Result<ConnectedAccount, ConnectError> {
		let provider = self
			.provider()
			.ok_or(ConnectError::NotInstalled(ProviderKind::EvmA))?;

		let accounts = provider
			.request("eth_requestAccounts", json!([]))
			.await
			.map_err(|e| classify_error(&e))?;

		let address = string_list(&accounts)
			.into_iter()
			.next()
			.ok_or_else(|| ConnectError::unknown("eth_requestAccounts returned no accounts"))?;
		if !is_evm_address(&address) {
			return Err(ConnectError::unknown(format!(
				"eth_requestAccounts returned a malformed address: {}",
				address
			)));
		}

		// The network is display data; a failure here does not fail the connect.
		let network = match provider.request("eth_chainId", json!([])).await {
			Ok(chain_id) => chain_id.as_str().and_then(networks::evm_network),
			Err(e) => {
				warn!("Failed to read chain id after connecting: {}", e);
				None
			}
		};

		Ok(ConnectedAccount { address, network })
	}

	async fn get_balance(&self, address: &str) -> Result<String, WalletError> {
		let provider = self.require_provider()?;
		let result = provider
			.request("eth_getBalance", json!([address, "latest"]))
			.await?;

		let wei = result
			.as_str()
			.and_then(parse_hex_quantity)
			.ok_or_else(|| WalletError::InvalidResponse(format!("eth_getBalance returned {}", result)))?;
		Ok(format_token_amount(wei, ETH_DECIMALS))
	}

	async fn get_network(&self) -> Result<NetworkInfo, WalletError> {
		let provider = self.require_provider()?;
		let result = provider.request("eth_chainId", json!([])).await?;
		result
			.as_str()
			.and_then(networks::evm_network)
			.ok_or_else(|| WalletError::InvalidResponse(format!("eth_chainId returned {}", result)))
	}

	async fn disconnect(&self) {
		let Some(provider) = self.provider() else {
			return;
		};
		// EIP-1193 has no disconnect; revoking the account permission is the closest.
		if let Err(e) = provider
			.request("wallet_revokePermissions", json!([{ "eth_accounts": {} }]))
			.await
		{
			debug!("wallet_revokePermissions failed, ignoring: {}", e);
		}
	}

	fn on_accounts_changed(&self, handler: AccountsHandler) -> Subscription {
		self.subscribe(
			"accountsChanged",
			Arc::new(move |payload: Value| match changed_accounts(&payload) {
				Some(accounts) => handler(accounts),
				None => warn!("Ignoring malformed accountsChanged payload: {}", payload),
			}),
		)
	}

	fn on_chain_changed(&self, handler: ChainHandler) -> Subscription {
		self.subscribe(
			"chainChanged",
			Arc::new(move |payload: Value| match payload.as_str() {
				Some(chain_id) => handler(chain_id.to_string()),
				None => warn!("Ignoring malformed chainChanged payload: {}", payload),
			}),
		)
	}

	fn on_disconnect(&self, handler: DisconnectHandler) -> Subscription {
		self.subscribe("disconnect", Arc::new(move |_payload: Value| handler()))
	}
}
