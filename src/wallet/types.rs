use crate::provider::{NetworkInfo, ProviderError, ProviderKind, RpcError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The live connection record rendered by the UI.
///
/// Fields are only reachable through accessors so that the connected and
/// disconnected shapes stay consistent: a disconnected session has no
/// provider, an empty address and no network; a connected one always has a
/// provider and a non-empty address. Deserialization goes through the same
/// check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SessionFields")]
pub struct WalletSession {
	is_connected: bool,
	provider: Option<ProviderKind>,
	address: String,
	balance: String,
	network: Option<NetworkInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFields {
	is_connected: bool,
	provider: Option<ProviderKind>,
	address: String,
	balance: String,
	network: Option<NetworkInfo>,
}

impl TryFrom<SessionFields> for WalletSession {
	type Error = String;

	fn try_from(fields: SessionFields) -> Result<Self, Self::Error> {
		let session = Self {
			is_connected: fields.is_connected,
			provider: fields.provider,
			address: fields.address,
			balance: fields.balance,
			network: fields.network,
		};
		if !session.is_consistent() {
			return Err(format!(
				"inconsistent wallet session: connected={} provider={:?} address={:?}",
				session.is_connected, session.provider, session.address
			));
		}
		Ok(session)
	}
}

impl Default for WalletSession {
	fn default() -> Self {
		Self::disconnected()
	}
}

impl WalletSession {
	/// The empty session present at start-up and after any disconnect.
	pub fn disconnected() -> Self {
		Self {
			is_connected: false,
			provider: None,
			address: String::new(),
			balance: "0".to_string(),
			network: None,
		}
	}

	/// A freshly connected session. Returns `None` for an empty address.
	pub(crate) fn connected(
		provider: ProviderKind,
		address: String,
		network: Option<NetworkInfo>,
	) -> Option<Self> {
		if address.is_empty() {
			return None;
		}
		Some(Self {
			is_connected: true,
			provider: Some(provider),
			address,
			balance: "0".to_string(),
			network,
		})
	}

	pub fn is_connected(&self) -> bool {
		self.is_connected
	}

	pub fn provider(&self) -> Option<ProviderKind> {
		self.provider
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	/// Balance as a decimal string in the provider's native unit.
	pub fn balance(&self) -> &str {
		&self.balance
	}

	pub fn network(&self) -> Option<&NetworkInfo> {
		self.network.as_ref()
	}

	/// Replace the account. Empty addresses are ignored; clearing the account
	/// is a disconnect, not an update.
	pub(crate) fn set_address(&mut self, address: String) -> bool {
		if !self.is_connected || address.is_empty() || address == self.address {
			return false;
		}
		self.address = address;
		true
	}

	pub(crate) fn set_balance(&mut self, balance: String) -> bool {
		if !self.is_connected || balance == self.balance {
			return false;
		}
		self.balance = balance;
		true
	}

	pub(crate) fn set_network(&mut self, network: NetworkInfo) -> bool {
		if !self.is_connected || self.network.as_ref() == Some(&network) {
			return false;
		}
		self.network = Some(network);
		true
	}

	/// `is_connected`, provider presence and address presence agree.
	pub fn is_consistent(&self) -> bool {
		let has_provider = self.provider.is_some();
		let has_address = !self.address.is_empty();
		if self.is_connected {
			has_provider && has_address
		} else {
			!has_provider && !has_address && self.network.is_none()
		}
	}
}

/// Status of the most recent connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
	Idle,
	Connecting,
	Succeeded,
	Failed,
}

/// Transient record of the most recent connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAttempt {
	pub status: AttemptStatus,
	/// `None` until the first attempt is made.
	pub target_provider: Option<ProviderKind>,
}

impl Default for ConnectionAttempt {
	fn default() -> Self {
		Self {
			status: AttemptStatus::Idle,
			target_provider: None,
		}
	}
}

impl ConnectionAttempt {
	pub(crate) fn connecting(kind: ProviderKind) -> Self {
		Self {
			status: AttemptStatus::Connecting,
			target_provider: Some(kind),
		}
	}

	pub(crate) fn finished(kind: ProviderKind, succeeded: bool) -> Self {
		Self {
			status: if succeeded {
				AttemptStatus::Succeeded
			} else {
				AttemptStatus::Failed
			},
			target_provider: Some(kind),
		}
	}
}

/// Account data returned by an adapter's connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccount {
	pub address: String,
	pub network: Option<NetworkInfo>,
}

/// Result of a connect call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
	/// The wallet authorized an account.
	Connected(WalletSession),
	/// The user declined the prompt. The session stays disconnected and
	/// nothing is shown to the user.
	Cancelled,
}

/// Classified connect failures.
///
/// The `Display` text is the message shown to the user. Provider details are
/// kept in fields for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
	#[error("{0} is not installed")]
	NotInstalled(ProviderKind),

	#[error("A wallet connection is already in progress")]
	AlreadyConnecting,

	#[error("{active} is already connected; disconnect it first")]
	AlreadyConnected { active: ProviderKind },

	#[error("Connection request was rejected")]
	UserRejected,

	#[error("A connection request is already pending. Please check your wallet")]
	RequestPending,

	#[error("Your wallet is locked. Please unlock your wallet and try again")]
	WalletLocked,

	#[error("The wallet did not respond within {}s. Please try again", .0.as_secs())]
	Timeout(Duration),

	#[error("Could not connect to your wallet. Please try again")]
	Unknown { detail: String },
}

impl ConnectError {
	pub(crate) fn unknown(detail: impl Into<String>) -> Self {
		ConnectError::Unknown {
			detail: detail.into(),
		}
	}

	/// Whether the failure ends the attempt silently instead of being shown.
	pub fn is_silent(&self) -> bool {
		matches!(self, ConnectError::UserRejected)
	}
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
	/// The application called `disconnect()`.
	Requested,
	/// The wallet reported zero authorized accounts.
	AccountsCleared,
	/// The extension itself disconnected.
	ProviderDisconnected,
	/// The chain changed and the page is being reloaded.
	ChainChanged,
}

/// Discrete notifications published alongside the session snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
	Connected(WalletSession),
	AccountChanged { provider: ProviderKind, address: String },
	NetworkChanged { provider: ProviderKind, network: NetworkInfo },
	BalanceUpdated { provider: ProviderKind, balance: String },
	Disconnected { provider: ProviderKind, reason: DisconnectReason },
	ConnectCancelled(ProviderKind),
	ConnectFailed { provider: ProviderKind, error: ConnectError },
}

/// General errors for balance, network and repository operations
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
	#[error("RPC error: {0}")]
	RpcError(#[from] RpcError),

	#[error("Provider error: {0}")]
	ProviderError(#[from] ProviderError),

	#[error("{0} is not installed")]
	NotInstalled(ProviderKind),

	#[error("Invalid provider response: {0}")]
	InvalidResponse(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Repository error: {0}")]
	RepositoryError(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn disconnected_session_is_consistent() {
		let session = WalletSession::disconnected();
		assert!(!session.is_connected());
		assert!(session.is_consistent());
	}

	#[test]
	fn connected_session_requires_address() {
		assert!(WalletSession::connected(ProviderKind::EvmA, String::new(), None).is_none());

		let session =
			WalletSession::connected(ProviderKind::EvmA, "0xabc".to_string(), None).unwrap();
		assert!(session.is_connected());
		assert_eq!(session.provider(), Some(ProviderKind::EvmA));
		assert!(session.is_consistent());
	}

	#[test]
	fn address_updates_ignore_empty_values() {
		let mut session =
			WalletSession::connected(ProviderKind::SolanaA, "A".to_string(), None).unwrap();
		assert!(!session.set_address(String::new()));
		assert!(session.set_address("B".to_string()));
		assert_eq!(session.address(), "B");
	}

	#[test]
	fn disconnected_session_ignores_updates() {
		let mut session = WalletSession::disconnected();
		assert!(!session.set_address("0xabc".to_string()));
		assert!(!session.set_balance("1".to_string()));
		assert!(session.is_consistent());
	}

	#[test]
	fn unknown_error_hides_detail_from_display() {
		let err = ConnectError::unknown("RPC node returned 502 for eth_requestAccounts");
		assert!(!err.to_string().contains("502"));
		assert!(!err.is_silent());
		assert!(ConnectError::UserRejected.is_silent());
	}

	#[test]
	fn session_serializes_for_the_ui() {
		let session =
			WalletSession::connected(ProviderKind::SolanaB, "Key".to_string(), None).unwrap();
		let json = serde_json::to_value(&session).unwrap();
		assert_eq!(json["isConnected"], true);
		assert_eq!(json["provider"], "solana_b");
		assert_eq!(json["address"], "Key");
	}

	#[test]
	fn stored_session_is_checked_when_read_back() {
		let session =
			WalletSession::connected(ProviderKind::EvmA, "0xabc".to_string(), None).unwrap();
		let json = serde_json::to_string(&session).unwrap();
		assert_eq!(serde_json::from_str::<WalletSession>(&json).unwrap(), session);

		let no_provider = r#"{"isConnected":true,"provider":null,"address":"","balance":"0","network":null}"#;
		assert!(serde_json::from_str::<WalletSession>(no_provider).is_err());

		let stray_address = r#"{"isConnected":false,"provider":null,"address":"0xabc","balance":"0","network":null}"#;
		assert!(serde_json::from_str::<WalletSession>(stray_address).is_err());
	}
}
