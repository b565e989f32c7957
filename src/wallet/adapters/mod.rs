//! Wallet adapters
//!
//! Each supported wallet exposes a different native API. An adapter
//! normalizes one of them into the [`WalletAdapter`] contract so the session
//! layer never touches a provider-specific shape:
//!
//! - `evm`: EIP-1193 (`window.ethereum`, MetaMask)
//! - `phantom`: Solana wallet at `window.solana`
//! - `solflare`: Solana wallet at `window.solflare`
//!
//! Adapters hold no session state. They resolve the injected object on every
//! call and classify provider errors into [`ConnectError`] before returning.

/// EIP-1193 adapter
pub mod evm;
/// Phantom adapter
pub mod phantom;
/// Solflare adapter
pub mod solflare;

use crate::provider::{
	Listener, NetworkInfo, ProviderEnvironment, ProviderKind, SolanaRpc, networks,
};
use crate::utils::format_token_amount;
use crate::wallet::{ConnectError, ConnectedAccount, WalletError};

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub use evm::EvmAdapter;
pub use phantom::PhantomAdapter;
pub use solflare::SolflareAdapter;

/// Lamports per SOL, as decimals.
pub const SOL_DECIMALS: u32 = 9;
/// Wei per ether, as decimals.
pub const ETH_DECIMALS: u32 = 18;

/// Called with the wallet's authorized accounts; empty means none.
pub type AccountsHandler = Arc<dyn Fn(Vec<String>) + Send + Sync>;
/// Called with the new chain identifier.
pub type ChainHandler = Arc<dyn Fn(String) + Send + Sync>;
/// Called when the extension ends the connection itself.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Uniform contract over one wallet provider.
#[async_trait::async_trait]
pub trait WalletAdapter: Send + Sync {
	fn kind(&self) -> ProviderKind;

	/// Run the wallet's authorization flow. May show a prompt to the user.
	async fn connect(&self) -> Result<ConnectedAccount, ConnectError>;

	/// Balance of `address` as a decimal string in the native unit.
	async fn get_balance(&self, address: &str) -> Result<String, WalletError>;

	/// Network the wallet is currently operating on.
	async fn get_network(&self) -> Result<NetworkInfo, WalletError>;

	/// Best-effort disconnect. Failures are logged, never returned.
	async fn disconnect(&self);

	fn on_accounts_changed(&self, handler: AccountsHandler) -> Subscription;

	fn on_chain_changed(&self, handler: ChainHandler) -> Subscription;

	fn on_disconnect(&self, handler: DisconnectHandler) -> Subscription;
}

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// A live listener registration. Unsubscribing runs at most once.
pub struct Subscription {
	unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl Subscription {
	pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
		Self {
			unsubscribe: Mutex::new(Some(Box::new(unsubscribe))),
		}
	}

	/// Subscription for an event the provider never emits.
	pub fn noop() -> Self {
		Self {
			unsubscribe: Mutex::new(None),
		}
	}

	pub fn is_active(&self) -> bool {
		self.unsubscribe.lock().is_some()
	}

	/// Remove the listener. Returns `false` when already removed.
	pub fn unsubscribe(&self) -> bool {
		// Take first so the callback runs without the lock held.
		let unsubscribe = self.unsubscribe.lock().take();
		match unsubscribe {
			Some(unsubscribe) => {
				unsubscribe();
				true
			}
			None => false,
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.is_active())
			.finish()
	}
}

/// Adapters keyed by provider.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
	adapters: HashMap<ProviderKind, Arc<dyn WalletAdapter>>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry with the adapter for every supported provider.
	pub fn standard(
		environment: Arc<dyn ProviderEnvironment>,
		solana_rpc: Arc<dyn SolanaRpc>,
	) -> Self {
		let mut registry = Self::new();
		registry.register(Arc::new(EvmAdapter::new(environment.clone())));
		registry.register(Arc::new(PhantomAdapter::new(
			environment.clone(),
			solana_rpc.clone(),
		)));
		registry.register(Arc::new(SolflareAdapter::new(environment, solana_rpc)));
		registry
	}

	/// Add or replace the adapter for its provider.
	pub fn register(&mut self, adapter: Arc<dyn WalletAdapter>) {
		self.adapters.insert(adapter.kind(), adapter);
	}

	pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn WalletAdapter>> {
		self.adapters.get(&kind).cloned()
	}
}

/// Accept a base58 string that decodes to a 32-byte Ed25519 public key.
pub(crate) fn is_solana_address(address: &str) -> bool {
	bs58::decode(address)
		.into_vec()
		.map(|bytes| bytes.len() == 32)
		.unwrap_or(false)
}

/// Accept a `0x`-prefixed 20-byte hex address (any checksum casing).
pub(crate) fn is_evm_address(address: &str) -> bool {
	address
		.strip_prefix("0x")
		.filter(|digits| digits.len() == 40)
		.and_then(|digits| hex::decode(digits).ok())
		.is_some()
}

/// Normalize a Solana `accountChanged` payload to an account list.
///
/// Wallets emit the new public key (as a string or `{ publicKey }`), or
/// `null` when no account is authorized any more. Returns `None` for any
/// other payload, including keys that are not valid base58 public keys.
pub(crate) fn solana_accounts_from_payload(payload: &Value) -> Option<Vec<String>> {
	let key = match payload {
		Value::Null => return Some(Vec::new()),
		Value::String(key) => key.as_str(),
		Value::Object(object) => object.get("publicKey").and_then(Value::as_str)?,
		_ => return None,
	};
	is_solana_address(key).then(|| vec![key.to_string()])
}

/// Handler for a Solana `accountChanged` event that drops malformed payloads.
pub(crate) fn solana_accounts_listener(kind: ProviderKind, handler: AccountsHandler) -> Listener {
	Arc::new(move |payload: Value| match solana_accounts_from_payload(&payload) {
		Some(accounts) => handler(accounts),
		None => warn!("Ignoring malformed {} accountChanged payload: {}", kind, payload),
	})
}

/// Balance of a Solana account, formatted in SOL.
pub(crate) async fn solana_balance(rpc: &dyn SolanaRpc, address: &str) -> Result<String, WalletError> {
	let lamports = rpc.get_balance(address).await?;
	Ok(format_token_amount(u128::from(lamports), SOL_DECIMALS))
}

/// Cluster behind the Solana RPC endpoint.
pub(crate) async fn solana_network(rpc: &dyn SolanaRpc) -> Result<NetworkInfo, WalletError> {
	let genesis_hash = rpc.get_genesis_hash().await?;
	Ok(networks::solana_network(&genesis_hash))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn unsubscribe_runs_once() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let subscription = Subscription::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		assert!(subscription.is_active());
		assert!(subscription.unsubscribe());
		assert!(!subscription.unsubscribe());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn noop_subscription_is_inactive() {
		let subscription = Subscription::noop();
		assert!(!subscription.is_active());
		assert!(!subscription.unsubscribe());
	}

	#[test]
	fn validates_addresses() {
		assert!(is_evm_address("0x52908400098527886E0F7030069857D2E4169EE7"));
		assert!(!is_evm_address("52908400098527886E0F7030069857D2E4169EE7"));
		assert!(!is_evm_address("0x1234"));
		assert!(is_solana_address("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
		assert!(!is_solana_address("0OIl"));
		assert!(!is_solana_address("abc"));
	}

	#[test]
	fn normalizes_solana_account_payloads() {
		const KEY: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
		assert_eq!(solana_accounts_from_payload(&json!(KEY)), Some(vec![KEY.to_string()]));
		assert_eq!(
			solana_accounts_from_payload(&json!({ "publicKey": KEY })),
			Some(vec![KEY.to_string()])
		);
		assert_eq!(solana_accounts_from_payload(&Value::Null), Some(Vec::new()));
	}

	#[test]
	fn rejects_malformed_solana_account_payloads() {
		assert_eq!(solana_accounts_from_payload(&json!("not-a-key")), None);
		assert_eq!(solana_accounts_from_payload(&json!("")), None);
		assert_eq!(solana_accounts_from_payload(&json!({ "unexpected": "shape" })), None);
		assert_eq!(solana_accounts_from_payload(&json!(["Key"])), None);
		assert_eq!(solana_accounts_from_payload(&json!(42)), None);
	}
}
