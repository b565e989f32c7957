use super::{
	AccountsHandler, ChainHandler, DisconnectHandler, Subscription, WalletAdapter,
	is_solana_address, solana_accounts_listener, solana_balance, solana_network,
};
use crate::provider::injected::resolve_solana;
use crate::provider::{
	Listener, NetworkInfo, ProviderEnvironment, ProviderError, ProviderKind, SolanaRpc,
	SolanaWalletProvider,
};
use crate::wallet::{ConnectError, ConnectedAccount, WalletError};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Adapter for Solflare, injected at `window.solflare` with `isSolflare`.
///
/// Solflare resolves `connect()` with a boolean and exposes the key only on
/// the injected object. Its errors usually carry no code, so classification
/// goes by message.
pub struct SolflareAdapter {
	environment: Arc<dyn ProviderEnvironment>,
	rpc: Arc<dyn SolanaRpc>,
}

impl SolflareAdapter {
	pub fn new(environment: Arc<dyn ProviderEnvironment>, rpc: Arc<dyn SolanaRpc>) -> Self {
		Self { environment, rpc }
	}

	fn provider(&self) -> Option<Arc<dyn SolanaWalletProvider>> {
		resolve_solana(self.environment.as_ref(), ProviderKind::SolanaB)
	}

	fn subscribe(&self, event: &'static str, listener: Listener) -> Subscription {
		let Some(provider) = self.provider() else {
			return Subscription::noop();
		};
		let id = provider.on(event, listener);
		Subscription::new(move || provider.off(event, id))
	}
}

/// Map a Solflare error to the connect taxonomy.
pub fn classify_error(error: &ProviderError) -> ConnectError {
	if error.code == Some(4001) || error.message_contains(&["reject", "denied", "cancel", "closed"]) {
		ConnectError::UserRejected
	} else if error.message_contains(&["pending", "already connecting", "in progress"]) {
		ConnectError::RequestPending
	} else if error.message_contains(&["locked", "unlock"]) {
		ConnectError::WalletLocked
	} else {
		ConnectError::unknown(error.to_string())
	}
}

#[async_trait::async_trait]
impl WalletAdapter for SolflareAdapter {
	fn kind(&self) -> ProviderKind {
		ProviderKind::SolanaB
	}

	async fn connect(&self) -> Result<ConnectedAccount, ConnectError> {
		let provider = self
			.provider()
			.ok_or(ConnectError::NotInstalled(ProviderKind::SolanaB))?;

		let address = match provider.public_key().filter(|_| provider.is_connected()) {
			Some(key) => {
				info!("Solflare already authorized, skipping prompt");
				key
			}
			None => {
				provider.connect().await.map_err(|e| classify_error(&e))?;
				provider
					.public_key()
					.ok_or_else(|| ConnectError::unknown("Solflare connected without a public key"))?
			}
		};

		if !is_solana_address(&address) {
			return Err(ConnectError::unknown(format!(
				"Solflare returned a malformed public key: {}",
				address
			)));
		}

		Ok(ConnectedAccount {
			address,
			network: None,
		})
	}

	async fn get_balance(&self, address: &str) -> Result<String, WalletError> {
		solana_balance(self.rpc.as_ref(), address).await
	}

	async fn get_network(&self) -> Result<NetworkInfo, WalletError> {
		solana_network(self.rpc.as_ref()).await
	}

	async fn disconnect(&self) {
		let Some(provider) = self.provider() else {
			return;
		};
		if let Err(e) = provider.disconnect().await {
			debug!("Solflare disconnect failed, ignoring: {}", e);
		}
	}

	fn on_accounts_changed(&self, handler: AccountsHandler) -> Subscription {
		self.subscribe(
			"accountChanged",
			solana_accounts_listener(ProviderKind::SolanaB, handler),
		)
	}

	fn on_chain_changed(&self, _handler: ChainHandler) -> Subscription {
		Subscription::noop()
	}

	fn on_disconnect(&self, handler: DisconnectHandler) -> Subscription {
		self.subscribe("disconnect", Arc::new(move |_payload: Value| handler()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::memory::{
		ConnectScript, MemoryEnvironment, MemorySolanaProvider, MemorySolanaRpc,
	};
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};

	const KEY: &str = "So11111111111111111111111111111111111111112";

	fn setup() -> (Arc<MemorySolanaProvider>, SolflareAdapter) {
		let environment = Arc::new(MemoryEnvironment::new());
		let provider = Arc::new(MemorySolanaProvider::solflare());
		provider.set_authorized_key(KEY);
		environment.install_solana("solflare", provider.clone());
		let adapter = SolflareAdapter::new(environment, Arc::new(MemorySolanaRpc::new()));
		(provider, adapter)
	}

	#[test]
	fn classifies_by_message() {
		assert_eq!(
			classify_error(&ProviderError::message("User rejected the request.")),
			ConnectError::UserRejected
		);
		assert_eq!(
			classify_error(&ProviderError::message("Popup closed")),
			ConnectError::UserRejected
		);
		assert_eq!(
			classify_error(&ProviderError::message("A connection request is already pending")),
			ConnectError::RequestPending
		);
		assert_eq!(
			classify_error(&ProviderError::message("Wallet is locked")),
			ConnectError::WalletLocked
		);
		assert!(matches!(
			classify_error(&ProviderError::message("Unexpected error")),
			ConnectError::Unknown { .. }
		));
	}

	#[tokio::test]
	async fn connect_reads_key_from_object() {
		let (provider, adapter) = setup();

		let account = adapter.connect().await.unwrap();
		assert_eq!(account.address, KEY);
		assert_eq!(provider.connect_calls(), 1);
	}

	#[tokio::test]
	async fn already_authorized_wallet_skips_prompt() {
		let (provider, adapter) = setup();
		provider.set_connected(KEY);

		let account = adapter.connect().await.unwrap();
		assert_eq!(account.address, KEY);
		assert_eq!(provider.connect_calls(), 0);
	}

	#[tokio::test]
	async fn locked_wallet_is_classified() {
		let (provider, adapter) = setup();
		provider.script_connect(ConnectScript::Fail(ProviderError::message(
			"Wallet is locked",
		)));

		assert_eq!(adapter.connect().await, Err(ConnectError::WalletLocked));
	}

	#[test]
	fn null_account_change_reports_no_accounts() {
		let (provider, adapter) = setup();
		let empty = Arc::new(AtomicUsize::new(0));
		let counter = empty.clone();
		let _subscription = adapter.on_accounts_changed(Arc::new(move |accounts| {
			if accounts.is_empty() {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		}));

		provider.emit("accountChanged", Value::Null);
		provider.emit("accountChanged", json!(KEY));
		assert_eq!(empty.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn malformed_account_changes_are_dropped() {
		let (provider, adapter) = setup();
		let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
		let sink = seen.clone();
		let _subscription = adapter.on_accounts_changed(Arc::new(move |accounts| {
			sink.lock().push(accounts);
		}));

		provider.emit("accountChanged", serde_json::json!("not-a-key"));
		provider.emit("accountChanged", serde_json::json!({ "unexpected": "shape" }));
		provider.emit("accountChanged", serde_json::json!({ "publicKey": KEY }));
		provider.emit("accountChanged", Value::Null);

		assert_eq!(*seen.lock(), vec![vec![KEY.to_string()], Vec::<String>::new()]);
	}
}
