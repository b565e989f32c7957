//! Boundary with the wallet objects browser extensions inject into the page.
//!
//! The application does not own these objects. They are looked up by global
//! namespace on every use, may be replaced or removed by the extension at any
//! time, and may be driven concurrently by other scripts on the page. Nothing
//! here locks across that boundary.

use super::types::{Listener, ListenerId, ProviderApi, ProviderError, ProviderKind};

use serde_json::Value;
use std::sync::Arc;

/// EIP-1193 style provider (`window.ethereum`).
#[async_trait::async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Read a boolean property such as `isMetaMask`. `None` when absent or not a boolean.
    fn flag(&self, name: &str) -> Option<bool>;

    /// `provider.request({ method, params })`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// `provider.on(event, listener)`.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// `provider.removeListener(event, listener)`. Unknown ids are ignored.
    fn remove_listener(&self, event: &str, id: ListenerId);
}

/// Solana wallet-adapter style provider (`window.solana`, `window.solflare`).
#[async_trait::async_trait]
pub trait SolanaWalletProvider: Send + Sync {
    /// Read a boolean property such as `isPhantom`.
    fn flag(&self, name: &str) -> Option<bool>;

    /// `provider.isConnected`.
    fn is_connected(&self) -> bool;

    /// `provider.publicKey.toString()`, if the wallet has authorized an account.
    fn public_key(&self) -> Option<String>;

    /// `provider.connect()`. The resolved value differs between wallets.
    async fn connect(&self) -> Result<Value, ProviderError>;

    /// `provider.disconnect()`.
    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// `provider.on(event, listener)`.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// `provider.off(event, listener)`. Unknown ids are ignored.
    fn off(&self, event: &str, id: ListenerId);
}

/// Object found under a global namespace.
#[derive(Clone)]
pub enum InjectedProvider {
    Eip1193(Arc<dyn Eip1193Provider>),
    Solana(Arc<dyn SolanaWalletProvider>),
}

impl InjectedProvider {
    pub fn api(&self) -> ProviderApi {
        match self {
            InjectedProvider::Eip1193(_) => ProviderApi::Eip1193,
            InjectedProvider::Solana(_) => ProviderApi::Solana,
        }
    }

    fn flag(&self, name: &str) -> Option<bool> {
        match self {
            InjectedProvider::Eip1193(provider) => provider.flag(name),
            InjectedProvider::Solana(provider) => provider.flag(name),
        }
    }
}

/// The page environment: global lookups plus the page controls the
/// synchronizer needs.
pub trait ProviderEnvironment: Send + Sync {
    /// Look up `window[namespace]`.
    fn injected(&self, namespace: &str) -> Option<InjectedProvider>;

    /// Reload the page, discarding all in-memory application state.
    fn reload_page(&self);
}

/// Resolve the injected object for `kind`, checking both the API family and
/// the provider's marker flag.
pub fn resolve(environment: &dyn ProviderEnvironment, kind: ProviderKind) -> Option<InjectedProvider> {
    let injected = environment.injected(kind.namespace())?;
    if injected.api() != kind.api() {
        return None;
    }
    (injected.flag(kind.marker()) == Some(true)).then_some(injected)
}

/// Resolve an EIP-1193 provider for `kind`.
pub fn resolve_eip1193(
    environment: &dyn ProviderEnvironment,
    kind: ProviderKind,
) -> Option<Arc<dyn Eip1193Provider>> {
    match resolve(environment, kind)? {
        InjectedProvider::Eip1193(provider) => Some(provider),
        InjectedProvider::Solana(_) => None,
    }
}

/// Resolve a Solana provider for `kind`.
pub fn resolve_solana(
    environment: &dyn ProviderEnvironment,
    kind: ProviderKind,
) -> Option<Arc<dyn SolanaWalletProvider>> {
    match resolve(environment, kind)? {
        InjectedProvider::Solana(provider) => Some(provider),
        InjectedProvider::Eip1193(_) => None,
    }
}
