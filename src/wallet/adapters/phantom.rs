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
use tracing::debug;

/// Phantom error codes.
const USER_REJECTED: i64 = 4001;
const UNAUTHORIZED: i64 = 4100;
const RESOURCE_UNAVAILABLE: i64 = -32002;

/// Adapter for Phantom, injected at `window.solana` with `isPhantom`.
pub struct PhantomAdapter {
	environment: Arc<dyn ProviderEnvironment>,
	rpc: Arc<dyn SolanaRpc>,
}

impl PhantomAdapter {
	pub fn new(environment: Arc<dyn ProviderEnvironment>, rpc: Arc<dyn SolanaRpc>) -> Self {
		Self { environment, rpc }
	}

	fn provider(&self) -> Option<Arc<dyn SolanaWalletProvider>> {
		resolve_solana(self.environment.as_ref(), ProviderKind::SolanaA)
	}

	fn subscribe(&self, event: &'static str, listener: Listener) -> Subscription {
		let Some(provider) = self.provider() else {
			return Subscription::noop();
		};
		let id = provider.on(event, listener);
		Subscription::new(move || provider.off(event, id))
	}
}

/// Map a Phantom error to the connect taxonomy.
pub fn classify_error(error: &ProviderError) -> ConnectError {
	match error.code {
		Some(USER_REJECTED) => ConnectError::UserRejected,
		Some(RESOURCE_UNAVAILABLE) => ConnectError::RequestPending,
		Some(UNAUTHORIZED) if error.message_contains(&["lock"]) => ConnectError::WalletLocked,
		_ if error.message_contains(&["user rejected"]) => ConnectError::UserRejected,
		_ if error.message_contains(&["locked"]) => ConnectError::WalletLocked,
		_ => ConnectError::unknown(error.to_string()),
	}
}

#[async_trait::async_trait]
impl WalletAdapter for PhantomAdapter {
	fn kind(&self) -> ProviderKind {
		ProviderKind::SolanaA
	}

	async fn connect(&self) -> Result<ConnectedAccount, ConnectError> {
		let provider = self
			.provider()
			.ok_or(ConnectError::NotInstalled(ProviderKind::SolanaA))?;

		let response = provider.connect().await.map_err(|e| classify_error(&e))?;

		// Phantom resolves with { publicKey }; the object carries it as well.
		let address = response
			.get("publicKey")
			.and_then(Value::as_str)
			.map(str::to_string)
			.or_else(|| provider.public_key())
			.ok_or_else(|| ConnectError::unknown("Phantom connected without a public key"))?;
		if !is_solana_address(&address) {
			return Err(ConnectError::unknown(format!(
				"Phantom returned a malformed public key: {}",
				address
			)));
		}

		// Cluster is resolved over RPC by the first refresh.
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
			debug!("Phantom disconnect failed, ignoring: {}", e);
		}
	}

	fn on_accounts_changed(&self, handler: AccountsHandler) -> Subscription {
		self.subscribe(
			"accountChanged",
			solana_accounts_listener(ProviderKind::SolanaA, handler),
		)
	}

	fn on_chain_changed(&self, _handler: ChainHandler) -> Subscription {
		// Phantom stays on one cluster per session and emits no chain event.
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

	const KEY: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

	fn setup() -> (Arc<MemorySolanaProvider>, Arc<MemorySolanaRpc>, PhantomAdapter) {
		let environment = Arc::new(MemoryEnvironment::new());
		let provider = Arc::new(MemorySolanaProvider::phantom());
		provider.set_authorized_key(KEY);
		environment.install_solana("solana", provider.clone());
		let rpc = Arc::new(MemorySolanaRpc::new());
		let adapter = PhantomAdapter::new(environment, rpc.clone());
		(provider, rpc, adapter)
	}

	#[test]
	fn classifies_phantom_errors() {
		assert_eq!(
			classify_error(&ProviderError::new(4001, "User rejected the request.")),
			ConnectError::UserRejected
		);
		assert_eq!(
			classify_error(&ProviderError::new(-32002, "Requested resource not available")),
			ConnectError::RequestPending
		);
		assert_eq!(
			classify_error(&ProviderError::new(4100, "Wallet is locked")),
			ConnectError::WalletLocked
		);
		assert!(matches!(
			classify_error(&ProviderError::new(4100, "The requested method has not been authorized")),
			ConnectError::Unknown { .. }
		));
	}

	#[tokio::test]
	async fn connect_reads_public_key_from_response() {
		let (provider, _rpc, adapter) = setup();

		let account = adapter.connect().await.unwrap();
		assert_eq!(account.address, KEY);
		assert!(account.network.is_none());
		assert_eq!(provider.connect_calls(), 1);
	}

	#[tokio::test]
	async fn closed_prompt_is_user_rejection() {
		let (provider, _rpc, adapter) = setup();
		provider.script_connect(ConnectScript::Fail(ProviderError::new(
			4001,
			"User rejected the request.",
		)));

		assert_eq!(adapter.connect().await, Err(ConnectError::UserRejected));
	}

	#[tokio::test]
	async fn balance_and_network_come_from_rpc() {
		let (_provider, rpc, adapter) = setup();
		rpc.set_balance(KEY, 2_500_000_000);

		assert_eq!(adapter.get_balance(KEY).await.unwrap(), "2.5");
		assert_eq!(adapter.get_network().await.unwrap().name, "devnet");
	}

	#[tokio::test]
	async fn rpc_failure_surfaces_as_error() {
		let (_provider, rpc, adapter) = setup();
		rpc.set_failing(true);

		assert!(matches!(
			adapter.get_balance(KEY).await,
			Err(WalletError::RpcError(_))
		));
	}

	#[test]
	fn chain_subscription_is_noop() {
		let (provider, _rpc, adapter) = setup();
		let subscription = adapter.on_chain_changed(Arc::new(|_| {}));
		assert!(!subscription.is_active());
		assert_eq!(provider.total_listeners(), 0);
	}

	#[test]
	fn malformed_account_changes_are_dropped() {
		let (provider, _rpc, adapter) = setup();
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
