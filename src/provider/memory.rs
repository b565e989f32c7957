//! In-memory page environment and wallet objects.
//!
//! These stand in for browser-injected extensions outside a browser: the
//! connect prompt is scripted, events are emitted on demand and listener
//! registrations can be counted. Used by the test suites and by the
//! `simulate` command of the binary.

use super::injected::{Eip1193Provider, InjectedProvider, ProviderEnvironment, SolanaWalletProvider};
use super::rpc::{RpcError, SolanaRpc};
use super::types::{Listener, ListenerId, ProviderError};

use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Genesis hash reported by [`MemorySolanaRpc`] (Solana devnet).
pub const DEVNET_GENESIS_HASH: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";

/// How the wallet answers the next connect prompt.
#[derive(Clone)]
pub enum ConnectScript {
	/// The user approves immediately.
	Approve,
	/// The wallet rejects with the given error.
	Fail(ProviderError),
	/// The prompt stays open until the notify is triggered, then approves.
	Hold(Arc<Notify>),
	/// The prompt never answers.
	Pending,
}

#[derive(Default)]
struct ListenerRegistry {
	next_id: u64,
	listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
	fn add(&mut self, event: &str, listener: Listener) -> ListenerId {
		self.next_id += 1;
		let id = ListenerId(self.next_id);
		self.listeners
			.entry(event.to_string())
			.or_default()
			.push((id, listener));
		id
	}

	fn remove(&mut self, event: &str, id: ListenerId) {
		if let Some(listeners) = self.listeners.get_mut(event) {
			listeners.retain(|(existing, _)| *existing != id);
		}
	}

	fn snapshot(&self, event: &str) -> Vec<Listener> {
		self.listeners
			.get(event)
			.map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
			.unwrap_or_default()
	}

	fn count(&self, event: &str) -> usize {
		self.listeners.get(event).map(Vec::len).unwrap_or(0)
	}

	fn total(&self) -> usize {
		self.listeners.values().map(Vec::len).sum()
	}
}

/// Wait out a scripted prompt. Returns the error for a scripted failure.
async fn run_script(script: ConnectScript) -> Result<(), ProviderError> {
	match script {
		ConnectScript::Approve => Ok(()),
		ConnectScript::Fail(error) => Err(error),
		ConnectScript::Hold(release) => {
			release.notified().await;
			Ok(())
		}
		ConnectScript::Pending => std::future::pending().await,
	}
}

struct EvmState {
	accounts: Vec<String>,
	authorized: bool,
	chain_id: String,
	balances: HashMap<String, u128>,
	scripts: VecDeque<ConnectScript>,
	failing_methods: HashSet<String>,
	requests: Vec<String>,
}

/// EIP-1193 wallet held in memory.
pub struct MemoryEip1193Provider {
	flags: HashMap<String, bool>,
	state: Mutex<EvmState>,
	listeners: Mutex<ListenerRegistry>,
}

impl MemoryEip1193Provider {
	/// Provider with the given boolean properties and one default account on mainnet.
	pub fn new(flags: &[(&str, bool)]) -> Self {
		Self {
			flags: flags.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
			state: Mutex::new(EvmState {
				accounts: vec![format!("0x{}", "a".repeat(40))],
				authorized: false,
				chain_id: "0x1".to_string(),
				balances: HashMap::new(),
				scripts: VecDeque::new(),
				failing_methods: HashSet::new(),
				requests: Vec::new(),
			}),
			listeners: Mutex::new(ListenerRegistry::default()),
		}
	}

	pub fn metamask() -> Self {
		Self::new(&[("isMetaMask", true)])
	}

	/// Accounts handed out by `eth_requestAccounts`, first one selected.
	pub fn set_accounts(&self, accounts: Vec<String>) {
		self.state.lock().accounts = accounts;
	}

	pub fn set_chain_id(&self, chain_id: &str) {
		self.state.lock().chain_id = chain_id.to_string();
	}

	pub fn set_balance(&self, address: &str, wei: u128) {
		self.state
			.lock()
			.balances
			.insert(address.to_ascii_lowercase(), wei);
	}

	/// Queue the answer for the next connect prompt. Unscripted prompts approve.
	pub fn script_connect(&self, script: ConnectScript) {
		self.state.lock().scripts.push_back(script);
	}

	/// Make every `method` request fail until cleared.
	pub fn fail_method(&self, method: &str, failing: bool) {
		let mut state = self.state.lock();
		if failing {
			state.failing_methods.insert(method.to_string());
		} else {
			state.failing_methods.remove(method);
		}
	}

	pub fn request_count(&self, method: &str) -> usize {
		self.state
			.lock()
			.requests
			.iter()
			.filter(|m| m.as_str() == method)
			.count()
	}

	pub fn is_authorized(&self) -> bool {
		self.state.lock().authorized
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.listeners.lock().count(event)
	}

	pub fn total_listeners(&self) -> usize {
		self.listeners.lock().total()
	}

	/// Deliver `payload` to every listener registered for `event`.
	pub fn emit(&self, event: &str, payload: Value) {
		let listeners = self.listeners.lock().snapshot(event);
		for listener in listeners {
			listener(payload.clone());
		}
	}
}

#[async_trait::async_trait]
impl Eip1193Provider for MemoryEip1193Provider {
	fn flag(&self, name: &str) -> Option<bool> {
		self.flags.get(name).copied()
	}

	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		let script = {
			let mut state = self.state.lock();
			state.requests.push(method.to_string());
			if state.failing_methods.contains(method) {
				return Err(ProviderError::new(-32603, "Internal JSON-RPC error."));
			}

			match method {
				"eth_requestAccounts" => state.scripts.pop_front().unwrap_or(ConnectScript::Approve),
				"eth_accounts" => {
					return Ok(if state.authorized {
						json!(state.accounts)
					} else {
						json!([])
					});
				}
				"eth_chainId" => return Ok(json!(state.chain_id)),
				"eth_getBalance" => {
					let address = params
						.get(0)
						.and_then(Value::as_str)
						.unwrap_or_default()
						.to_ascii_lowercase();
					let wei = state.balances.get(&address).copied().unwrap_or(0);
					return Ok(json!(format!("{:#x}", wei)));
				}
				"wallet_revokePermissions" => {
					state.authorized = false;
					return Ok(Value::Null);
				}
				_ => {
					return Err(ProviderError::new(
						4200,
						format!("The requested method is not supported: {}", method),
					));
				}
			}
		};

		run_script(script).await?;

		let mut state = self.state.lock();
		state.authorized = true;
		Ok(json!(state.accounts))
	}

	fn on(&self, event: &str, listener: Listener) -> ListenerId {
		self.listeners.lock().add(event, listener)
	}

	fn remove_listener(&self, event: &str, id: ListenerId) {
		self.listeners.lock().remove(event, id);
	}
}

struct SolanaState {
	authorized_key: String,
	public_key: Option<String>,
	scripts: VecDeque<ConnectScript>,
	connect_calls: usize,
	disconnect_calls: usize,
}

/// Solana wallet held in memory.
pub struct MemorySolanaProvider {
	flags: HashMap<String, bool>,
	/// Phantom resolves `connect()` with `{ publicKey }`; Solflare resolves
	/// with a boolean and exposes the key only on the object.
	returns_key_on_connect: bool,
	state: Mutex<SolanaState>,
	listeners: Mutex<ListenerRegistry>,
}

impl MemorySolanaProvider {
	pub fn new(flags: &[(&str, bool)], returns_key_on_connect: bool) -> Self {
		Self {
			flags: flags.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
			returns_key_on_connect,
			state: Mutex::new(SolanaState {
				authorized_key: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
				public_key: None,
				scripts: VecDeque::new(),
				connect_calls: 0,
				disconnect_calls: 0,
			}),
			listeners: Mutex::new(ListenerRegistry::default()),
		}
	}

	pub fn phantom() -> Self {
		Self::new(&[("isPhantom", true)], true)
	}

	pub fn solflare() -> Self {
		Self::new(&[("isSolflare", true)], false)
	}

	/// Key the wallet authorizes on the next approved connect.
	pub fn set_authorized_key(&self, key: &str) {
		self.state.lock().authorized_key = key.to_string();
	}

	/// Put the wallet in an already-connected state, as after a previous visit.
	pub fn set_connected(&self, key: &str) {
		let mut state = self.state.lock();
		state.authorized_key = key.to_string();
		state.public_key = Some(key.to_string());
	}

	pub fn script_connect(&self, script: ConnectScript) {
		self.state.lock().scripts.push_back(script);
	}

	pub fn connect_calls(&self) -> usize {
		self.state.lock().connect_calls
	}

	pub fn disconnect_calls(&self) -> usize {
		self.state.lock().disconnect_calls
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.listeners.lock().count(event)
	}

	pub fn total_listeners(&self) -> usize {
		self.listeners.lock().total()
	}

	pub fn emit(&self, event: &str, payload: Value) {
		let listeners = self.listeners.lock().snapshot(event);
		for listener in listeners {
			listener(payload.clone());
		}
	}
}

#[async_trait::async_trait]
impl SolanaWalletProvider for MemorySolanaProvider {
	fn flag(&self, name: &str) -> Option<bool> {
		self.flags.get(name).copied()
	}

	fn is_connected(&self) -> bool {
		self.state.lock().public_key.is_some()
	}

	fn public_key(&self) -> Option<String> {
		self.state.lock().public_key.clone()
	}

	async fn connect(&self) -> Result<Value, ProviderError> {
		let script = {
			let mut state = self.state.lock();
			state.connect_calls += 1;
			state.scripts.pop_front().unwrap_or(ConnectScript::Approve)
		};

		run_script(script).await?;

		let key = {
			let mut state = self.state.lock();
			state.public_key = Some(state.authorized_key.clone());
			state.authorized_key.clone()
		};
		self.emit("connect", json!(key));

		if self.returns_key_on_connect {
			Ok(json!({ "publicKey": key }))
		} else {
			Ok(json!(true))
		}
	}

	async fn disconnect(&self) -> Result<(), ProviderError> {
		{
			let mut state = self.state.lock();
			state.disconnect_calls += 1;
			state.public_key = None;
		}
		Ok(())
	}

	fn on(&self, event: &str, listener: Listener) -> ListenerId {
		self.listeners.lock().add(event, listener)
	}

	fn off(&self, event: &str, id: ListenerId) {
		self.listeners.lock().remove(event, id);
	}
}

/// Page environment with a settable set of injected globals.
#[derive(Default)]
pub struct MemoryEnvironment {
	globals: RwLock<HashMap<String, InjectedProvider>>,
	reloads: AtomicUsize,
}

impl MemoryEnvironment {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn install_eip1193(&self, namespace: &str, provider: Arc<dyn Eip1193Provider>) {
		self.globals
			.write()
			.insert(namespace.to_string(), InjectedProvider::Eip1193(provider));
	}

	pub fn install_solana(&self, namespace: &str, provider: Arc<dyn SolanaWalletProvider>) {
		self.globals
			.write()
			.insert(namespace.to_string(), InjectedProvider::Solana(provider));
	}

	pub fn uninstall(&self, namespace: &str) {
		self.globals.write().remove(namespace);
	}

	/// Number of page reloads requested so far.
	pub fn reload_count(&self) -> usize {
		self.reloads.load(Ordering::SeqCst)
	}
}

impl ProviderEnvironment for MemoryEnvironment {
	fn injected(&self, namespace: &str) -> Option<InjectedProvider> {
		self.globals.read().get(namespace).cloned()
	}

	fn reload_page(&self) {
		self.reloads.fetch_add(1, Ordering::SeqCst);
	}
}

/// Solana RPC answering from memory.
pub struct MemorySolanaRpc {
	balances: Mutex<HashMap<String, u64>>,
	genesis_hash: String,
	failing: AtomicBool,
	balance_requests: AtomicUsize,
}

impl Default for MemorySolanaRpc {
	fn default() -> Self {
		Self {
			balances: Mutex::new(HashMap::new()),
			genesis_hash: DEVNET_GENESIS_HASH.to_string(),
			failing: AtomicBool::new(false),
			balance_requests: AtomicUsize::new(0),
		}
	}
}

impl MemorySolanaRpc {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_balance(&self, address: &str, lamports: u64) {
		self.balances.lock().insert(address.to_string(), lamports);
	}

	/// Make every request fail until cleared.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn balance_requests(&self) -> usize {
		self.balance_requests.load(Ordering::SeqCst)
	}
}

#[async_trait::async_trait]
impl SolanaRpc for MemorySolanaRpc {
	async fn get_balance(&self, address: &str) -> Result<u64, RpcError> {
		self.balance_requests.fetch_add(1, Ordering::SeqCst);
		if self.failing.load(Ordering::SeqCst) {
			return Err(RpcError::StatusError(503));
		}
		Ok(self.balances.lock().get(address).copied().unwrap_or(0))
	}

	async fn get_genesis_hash(&self) -> Result<String, RpcError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(RpcError::StatusError(503));
		}
		Ok(self.genesis_hash.clone())
	}
}
