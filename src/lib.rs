//! Multi-provider wallet session management.
//!
//! Detects injected wallet extensions (MetaMask, Phantom, Solflare), connects
//! to one of them at a time and keeps the resulting [`WalletSession`] in step
//! with the wallet's own events. See [`ConnectionOrchestrator`] for the entry
//! point.

pub mod config;
pub mod provider;
pub mod utils;
pub mod wallet;

pub use config::{ConfigArgs, WalletConfig};
pub use provider::{ProviderDetector, ProviderKind};
pub use wallet::{
	ConnectError, ConnectOutcome, ConnectionOrchestrator, IdentityLinker, WalletError,
	WalletEvent, WalletSession,
};
