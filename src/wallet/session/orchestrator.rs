//! Connection orchestrator.
//!
//! The `ConnectionOrchestrator` owns the wallet connection state machine:
//!
//! ```text
//! Disconnected --connect(kind)--> Connecting(kind) --ok--> Connected(session)
//!       ^                               |                         |
//!       +-------------failure-----------+                         |
//!       +------disconnect / accounts cleared / provider event-----+
//! ```
//!
//! Only one attempt may be in flight across all providers. The slot is claimed
//! synchronously, before the first `.await`, so two concurrent `connect` calls
//! can never both reach an adapter. Switching providers is explicit: the caller
//! disconnects first.

use super::state::{ActiveSession, SessionPhase, SessionShared};
use super::synchronizer::SessionSynchronizer;
use crate::config::WalletConfig;
use crate::provider::{
	ProviderAvailability, ProviderDetector, ProviderEnvironment, ProviderKind, SolanaRpc,
};
use crate::wallet::adapters::{AdapterRegistry, WalletAdapter};
use crate::wallet::{
	ConnectError, ConnectOutcome, ConnectedAccount, ConnectionAttempt, DisconnectReason,
	WalletEvent, WalletSession,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

/// Entry point for connecting, disconnecting and observing the wallet session.
#[derive(Clone)]
pub struct ConnectionOrchestrator {
	shared: Arc<SessionShared>,
	detector: ProviderDetector,
	adapters: AdapterRegistry,
	synchronizer: SessionSynchronizer,
	connect_timeout: Option<Duration>,
}

impl ConnectionOrchestrator {
	/// Orchestrator with the standard adapter for every supported provider.
	pub fn new(
		environment: Arc<dyn ProviderEnvironment>,
		solana_rpc: Arc<dyn SolanaRpc>,
		config: &WalletConfig,
	) -> Self {
		let adapters = AdapterRegistry::standard(environment.clone(), solana_rpc);
		Self::with_adapters(environment, adapters, config)
	}

	/// Orchestrator over a custom adapter set.
	pub fn with_adapters(
		environment: Arc<dyn ProviderEnvironment>,
		adapters: AdapterRegistry,
		config: &WalletConfig,
	) -> Self {
		let shared = Arc::new(SessionShared::new(environment.clone()));
		Self {
			synchronizer: SessionSynchronizer::new(shared.clone()),
			detector: ProviderDetector::new(environment),
			shared,
			adapters,
			connect_timeout: config.connect_timeout,
		}
	}

	/// Connect to `kind`, prompting the user if the wallet requires it.
	///
	/// A declined prompt resolves to [`ConnectOutcome::Cancelled`], not an
	/// error. Connecting to the provider that is already connected returns
	/// the existing session.
	pub async fn connect(&self, kind: ProviderKind) -> Result<ConnectOutcome, ConnectError> {
		let (epoch, adapter) = match self.claim_attempt(kind)? {
			Claim::Existing(session) => return Ok(ConnectOutcome::Connected(session)),
			Claim::Attempt { epoch, adapter } => (epoch, adapter),
		};
		info!("Connecting to {}", kind);

		// Resets the phase if this future is dropped mid-prompt.
		let guard = AttemptGuard {
			shared: &self.shared,
			epoch,
			armed: true,
		};

		let result = match self.connect_timeout {
			Some(limit) => tokio::time::timeout(limit, adapter.connect())
				.await
				.unwrap_or(Err(ConnectError::Timeout(limit))),
			None => adapter.connect().await,
		};
		guard.disarm();

		match result {
			Ok(account) => self.establish(epoch, adapter, account).await,
			Err(e) => self.fail_attempt(epoch, kind, e),
		}
	}

	/// Check the in-flight slot and installation, then claim the slot.
	fn claim_attempt(&self, kind: ProviderKind) -> Result<Claim, ConnectError> {
		let mut state = self.shared.state.lock();
		match &state.phase {
			SessionPhase::Connecting { provider, .. } => {
				warn!(
					"Rejecting connect to {}: {} connection in progress",
					kind, provider
				);
				return Err(ConnectError::AlreadyConnecting);
			}
			SessionPhase::Connected(active) if active.provider() == kind => {
				debug!("{} already connected", kind);
				return Ok(Claim::Existing(active.session.clone()));
			}
			SessionPhase::Connected(active) => {
				warn!(
					"Rejecting connect to {}: {} is connected",
					kind,
					active.provider()
				);
				return Err(ConnectError::AlreadyConnected {
					active: active.provider(),
				});
			}
			SessionPhase::Disconnected => {}
		}

		let adapter = match self.adapters.get(kind) {
			Some(adapter) if self.detector.is_installed(kind) => adapter,
			_ => {
				warn!("{} is not installed", kind);
				state.attempt = ConnectionAttempt::finished(kind, false);
				self.shared.emit(WalletEvent::ConnectFailed {
					provider: kind,
					error: ConnectError::NotInstalled(kind),
				});
				return Err(ConnectError::NotInstalled(kind));
			}
		};

		Ok(Claim::Attempt {
			epoch: state.begin_attempt(kind),
			adapter,
		})
	}

	/// Move a resolved attempt to `Connected` and run the first refresh.
	async fn establish(
		&self,
		epoch: u64,
		adapter: Arc<dyn WalletAdapter>,
		account: ConnectedAccount,
	) -> Result<ConnectOutcome, ConnectError> {
		let kind = adapter.kind();
		let Some(session) = WalletSession::connected(kind, account.address, account.network) else {
			return self.fail_attempt(epoch, kind, ConnectError::unknown("wallet returned an empty address"));
		};

		{
			let mut state = self.shared.state.lock();
			if !state.is_connecting(epoch) {
				// Only reachable if the attempt was abandoned concurrently.
				return Err(ConnectError::unknown("connect attempt was superseded"));
			}
			// Listeners go in before the session is visible so no event is missed.
			let subscriptions = self.synchronizer.attach(adapter.as_ref(), epoch);
			state.phase = SessionPhase::Connected(ActiveSession {
				epoch,
				adapter,
				session: session.clone(),
				subscriptions,
			});
			state.attempt = ConnectionAttempt::finished(kind, true);
			info!("Connected to {} as {}", kind, session.address());
			self.shared.publish(&state);
			self.shared.emit(WalletEvent::Connected(session.clone()));
		}

		let refreshed = self.synchronizer.refresh().await;
		if refreshed.is_connected() {
			Ok(ConnectOutcome::Connected(refreshed))
		} else {
			// The wallet ended the session during the first refresh.
			Ok(ConnectOutcome::Connected(session))
		}
	}

	fn fail_attempt(
		&self,
		epoch: u64,
		kind: ProviderKind,
		error: ConnectError,
	) -> Result<ConnectOutcome, ConnectError> {
		let mut state = self.shared.state.lock();
		if state.is_connecting(epoch) {
			state.phase = SessionPhase::Disconnected;
			state.attempt = ConnectionAttempt::finished(kind, false);
			self.shared.publish(&state);
		}

		if error.is_silent() {
			info!("User declined the {} connection request", kind);
			self.shared.emit(WalletEvent::ConnectCancelled(kind));
			return Ok(ConnectOutcome::Cancelled);
		}

		match &error {
			ConnectError::Unknown { detail } => {
				error!("Failed to connect to {}: {}", kind, detail)
			}
			other => warn!("Failed to connect to {}: {}", kind, other),
		}
		self.shared.emit(WalletEvent::ConnectFailed {
			provider: kind,
			error: error.clone(),
		});
		Err(error)
	}

	/// End the active session. A no-op when nothing is connected, and while an
	/// attempt is still in flight.
	pub async fn disconnect(&self) {
		let epoch = {
			let state = self.shared.state.lock();
			match &state.phase {
				SessionPhase::Connected(active) => active.epoch,
				SessionPhase::Connecting { provider, .. } => {
					debug!("Ignoring disconnect while {} connection is in progress", provider);
					return;
				}
				SessionPhase::Disconnected => {
					debug!("Disconnect requested with no active session");
					return;
				}
			}
		};
		if let Some(active) = self.shared.collapse(epoch, DisconnectReason::Requested) {
			active.close().await;
		}
	}

	/// Re-read balance and network. Never fails; see [`SessionSynchronizer::refresh`].
	pub async fn refresh(&self) -> WalletSession {
		self.synchronizer.refresh().await
	}

	/// Current session snapshot.
	pub fn session(&self) -> WalletSession {
		self.shared.state.lock().snapshot()
	}

	/// The most recent connect attempt.
	pub fn attempt(&self) -> ConnectionAttempt {
		self.shared.state.lock().attempt
	}

	/// Provider currently being connected, if any.
	pub fn connecting(&self) -> Option<ProviderKind> {
		match &self.shared.state.lock().phase {
			SessionPhase::Connecting { provider, .. } => Some(*provider),
			_ => None,
		}
	}

	/// Receives every session change, starting with the current snapshot.
	pub fn subscribe_session(&self) -> watch::Receiver<WalletSession> {
		self.shared.subscribe_session()
	}

	pub fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
		self.shared.subscribe_events()
	}

	pub fn availability(&self) -> Vec<ProviderAvailability> {
		self.detector.availability()
	}

	pub fn is_installed(&self, kind: ProviderKind) -> bool {
		self.detector.is_installed(kind)
	}

	pub fn synchronizer(&self) -> &SessionSynchronizer {
		&self.synchronizer
	}
}

enum Claim {
	Existing(WalletSession),
	Attempt {
		epoch: u64,
		adapter: Arc<dyn WalletAdapter>,
	},
}

/// Returns an in-flight attempt to `Disconnected` unless disarmed.
struct AttemptGuard<'a> {
	shared: &'a SessionShared,
	epoch: u64,
	armed: bool,
}

impl AttemptGuard<'_> {
	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for AttemptGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let mut state = self.shared.state.lock();
		if state.is_connecting(self.epoch) {
			warn!("Connect attempt abandoned, releasing in-flight slot");
			state.phase = SessionPhase::Disconnected;
			if let Some(kind) = state.attempt.target_provider {
				state.attempt = ConnectionAttempt::finished(kind, false);
			}
			self.shared.publish(&state);
		}
	}
}
