//! Shared session state.
//!
//! One mutex guards the phase, the attempt record and the epoch counter. It is
//! never held across an `.await`, and provider teardown or disconnect calls are
//! made only after the active session has been taken out of it.

use super::subscriptions::SubscriptionSet;
use crate::provider::{ProviderEnvironment, ProviderKind};
use crate::wallet::adapters::WalletAdapter;
use crate::wallet::{ConnectionAttempt, DisconnectReason, WalletEvent, WalletSession};

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// A connected session and everything that lives exactly as long as it.
pub(crate) struct ActiveSession {
	pub(crate) epoch: u64,
	pub(crate) adapter: Arc<dyn WalletAdapter>,
	pub(crate) session: WalletSession,
	pub(crate) subscriptions: SubscriptionSet,
}

impl ActiveSession {
	pub(crate) fn provider(&self) -> ProviderKind {
		self.adapter.kind()
	}

	/// Remove all listeners, then ask the wallet to disconnect.
	pub(crate) async fn close(mut self) {
		let removed = self.subscriptions.teardown();
		debug!("Removed {} listeners from {}", removed, self.provider());
		self.adapter.disconnect().await;
	}
}

/// Connection state machine. `Connecting` is the in-flight flag.
pub(crate) enum SessionPhase {
	Disconnected,
	Connecting { provider: ProviderKind, epoch: u64 },
	Connected(ActiveSession),
}

pub(crate) struct SessionState {
	pub(crate) phase: SessionPhase,
	pub(crate) attempt: ConnectionAttempt,
	next_epoch: u64,
}

impl SessionState {
	/// Claim the in-flight slot for `provider`. Returns the attempt's epoch.
	pub(crate) fn begin_attempt(&mut self, provider: ProviderKind) -> u64 {
		self.next_epoch += 1;
		let epoch = self.next_epoch;
		self.phase = SessionPhase::Connecting { provider, epoch };
		self.attempt = ConnectionAttempt::connecting(provider);
		epoch
	}

	pub(crate) fn is_connecting(&self, epoch: u64) -> bool {
		matches!(self.phase, SessionPhase::Connecting { epoch: current, .. } if current == epoch)
	}

	/// The active session, if it was created by the attempt with `epoch`.
	pub(crate) fn active_mut(&mut self, epoch: u64) -> Option<&mut ActiveSession> {
		match &mut self.phase {
			SessionPhase::Connected(active) if active.epoch == epoch => Some(active),
			_ => None,
		}
	}

	pub(crate) fn snapshot(&self) -> WalletSession {
		match &self.phase {
			SessionPhase::Connected(active) => active.session.clone(),
			_ => WalletSession::disconnected(),
		}
	}
}

/// State shared between the orchestrator, the synchronizer and the adapter
/// callbacks of the active session.
pub(crate) struct SessionShared {
	pub(crate) state: Mutex<SessionState>,
	pub(crate) environment: Arc<dyn ProviderEnvironment>,
	session_tx: watch::Sender<WalletSession>,
	events_tx: broadcast::Sender<WalletEvent>,
}

impl SessionShared {
	pub(crate) fn new(environment: Arc<dyn ProviderEnvironment>) -> Self {
		let (session_tx, _) = watch::channel(WalletSession::disconnected());
		let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			state: Mutex::new(SessionState {
				phase: SessionPhase::Disconnected,
				attempt: ConnectionAttempt::default(),
				next_epoch: 0,
			}),
			environment,
			session_tx,
			events_tx,
		}
	}

	/// Push the current snapshot to watchers. Called with the state lock held
	/// so snapshots are published in transition order.
	pub(crate) fn publish(&self, state: &SessionState) {
		self.session_tx.send_replace(state.snapshot());
	}

	pub(crate) fn emit(&self, event: WalletEvent) {
		// No receivers is not an error.
		let _ = self.events_tx.send(event);
	}

	pub(crate) fn subscribe_session(&self) -> watch::Receiver<WalletSession> {
		self.session_tx.subscribe()
	}

	pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
		self.events_tx.subscribe()
	}

	/// Move the session created by `epoch` to `Disconnected`.
	///
	/// Returns the taken session so the caller can tear it down outside the
	/// lock, or `None` when `epoch` is no longer the active session.
	pub(crate) fn collapse(&self, epoch: u64, reason: DisconnectReason) -> Option<ActiveSession> {
		let mut state = self.state.lock();
		state.active_mut(epoch)?;
		let SessionPhase::Connected(active) =
			std::mem::replace(&mut state.phase, SessionPhase::Disconnected)
		else {
			return None;
		};
		info!("{} session ended: {:?}", active.provider(), reason);
		self.publish(&state);
		self.emit(WalletEvent::Disconnected {
			provider: active.provider(),
			reason,
		});
		Some(active)
	}
}
