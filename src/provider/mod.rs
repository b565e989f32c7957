//! Provider integration module
//!
//! This module covers everything on the far side of the adapter contract: the
//! wallet objects extensions inject into the page, install detection, the
//! network tables and the read-only chain RPC used for Solana balances.

/// Install detection for wallet extensions
pub mod detector;
/// Traits describing injected wallet objects and the page environment
pub mod injected;
/// In-memory environment and wallet objects
pub mod memory;
/// Chain id and genesis hash tables
pub mod networks;
/// JSON-RPC client for Solana chain queries
pub mod rpc;
/// Shared provider types
mod types;

pub use detector::ProviderDetector;
pub use injected::{Eip1193Provider, InjectedProvider, ProviderEnvironment, SolanaWalletProvider};
pub use rpc::{RpcError, SolanaRpc, SolanaRpcClient};
pub use types::*;
