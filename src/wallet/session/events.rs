//! Events observed from the active wallet.
//!
//! Adapter callbacks are translated into [`SessionEvent`]s tagged with the
//! epoch of the session that registered them. The synchronizer applies an
//! event only while that session is still the active one.

use std::fmt;

/// A change reported by the wallet behind the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// The wallet's authorized accounts, first one selected. Empty means the
	/// user revoked access or locked the wallet.
	AccountsChanged(Vec<String>),
	/// The wallet switched chains.
	ChainChanged(String),
	/// The extension ended the connection itself.
	Disconnected,
}

impl fmt::Display for SessionEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionEvent::AccountsChanged(accounts) => {
				write!(f, "accountsChanged({} accounts)", accounts.len())
			}
			SessionEvent::ChainChanged(chain_id) => write!(f, "chainChanged({})", chain_id),
			SessionEvent::Disconnected => write!(f, "disconnect"),
		}
	}
}
