//! Types shared by the injected-provider boundary and the wallet adapters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The closed set of wallet providers the application can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// EIP-1193 wallet injected at `window.ethereum` (MetaMask).
    EvmA,
    /// Solana wallet injected at `window.solana` (Phantom).
    SolanaA,
    /// Solana wallet injected at `window.solflare` (Solflare).
    SolanaB,
}

impl ProviderKind {
    /// Every provider, in display order.
    pub const ALL: [ProviderKind; 3] = [ProviderKind::EvmA, ProviderKind::SolanaA, ProviderKind::SolanaB];

    /// Human-readable wallet name.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::EvmA => "MetaMask",
            ProviderKind::SolanaA => "Phantom",
            ProviderKind::SolanaB => "Solflare",
        }
    }

    /// Global namespace the extension injects its object under.
    pub fn namespace(&self) -> &'static str {
        match self {
            ProviderKind::EvmA => "ethereum",
            ProviderKind::SolanaA => "solana",
            ProviderKind::SolanaB => "solflare",
        }
    }

    /// Marker flag the genuine extension sets on its injected object.
    ///
    /// Other extensions inject objects under the same namespaces, so presence
    /// alone does not identify the wallet.
    pub fn marker(&self) -> &'static str {
        match self {
            ProviderKind::EvmA => "isMetaMask",
            ProviderKind::SolanaA => "isPhantom",
            ProviderKind::SolanaB => "isSolflare",
        }
    }

    /// Which native API family the injected object follows.
    pub fn api(&self) -> ProviderApi {
        match self {
            ProviderKind::EvmA => ProviderApi::Eip1193,
            ProviderKind::SolanaA | ProviderKind::SolanaB => ProviderApi::Solana,
        }
    }

    /// Download page offered to the user when the wallet is not installed.
    pub fn install_url(&self) -> &'static str {
        match self {
            ProviderKind::EvmA => "https://metamask.io/download/",
            ProviderKind::SolanaA => "https://phantom.app/download",
            ProviderKind::SolanaB => "https://solflare.com/download",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native API family of an injected wallet object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderApi {
    /// `request` / `on` / `removeListener`.
    Eip1193,
    /// `connect` / `disconnect` / `publicKey` / `on`.
    Solana,
}

/// Install status of one provider, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderAvailability {
    pub kind: ProviderKind,
    pub installed: bool,
}

/// Network the connected wallet is operating on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Display name ("Ethereum Mainnet", "devnet").
    pub name: String,
    /// EVM chain id as a `0x` hex quantity, or the Solana genesis hash.
    pub chain_id: String,
    pub is_testnet: bool,
}

/// Raw error surfaced by an injected provider object.
///
/// This is the provider's own shape (an optional numeric code plus a
/// message); adapters classify it before it leaves the adapter layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provider error (code {code:?}): {message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error carrying only a message, as some extensions throw.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub(crate) fn message_contains(&self, needles: &[&str]) -> bool {
        let message = self.message.to_ascii_lowercase();
        needles.iter().any(|needle| message.contains(needle))
    }
}

/// Handle returned by an injected object's `on`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback registered with an injected object; receives the raw event payload.
pub type Listener = Arc<dyn Fn(serde_json::Value) + Send + Sync>;
