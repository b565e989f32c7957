//! Keeps the connected session in step with the wallet.
//!
//! The synchronizer installs the active session's listeners, applies the
//! events they deliver and re-reads derived data (balance, network) on
//! request. Every event carries the epoch of the session that registered the
//! listener; events from any other epoch are dropped.

use super::events::SessionEvent;
use super::state::{SessionPhase, SessionShared};
use super::subscriptions::SubscriptionSet;
use crate::wallet::adapters::WalletAdapter;
use crate::wallet::{DisconnectReason, WalletEvent, WalletSession};

use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SessionSynchronizer {
	shared: Arc<SessionShared>,
}

impl SessionSynchronizer {
	pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
		Self { shared }
	}

	/// Register the session's three listeners on `adapter`.
	///
	/// Callbacks hold only a weak reference to the session state, so a
	/// listener the wallet fails to remove cannot keep it alive.
	pub(crate) fn attach(&self, adapter: &dyn WalletAdapter, epoch: u64) -> SubscriptionSet {
		let mut subscriptions = SubscriptionSet::new();

		let weak = Arc::downgrade(&self.shared);
		subscriptions.push(adapter.on_accounts_changed(Arc::new(move |accounts| {
			deliver(&weak, epoch, SessionEvent::AccountsChanged(accounts));
		})));

		let weak = Arc::downgrade(&self.shared);
		subscriptions.push(adapter.on_chain_changed(Arc::new(move |chain_id| {
			deliver(&weak, epoch, SessionEvent::ChainChanged(chain_id));
		})));

		let weak = Arc::downgrade(&self.shared);
		subscriptions.push(adapter.on_disconnect(Arc::new(move || {
			deliver(&weak, epoch, SessionEvent::Disconnected);
		})));

		debug!(
			"Attached {} listeners to {} (epoch {})",
			subscriptions.active(),
			adapter.kind(),
			epoch
		);
		subscriptions
	}

	/// Apply an event delivered for the session created at `epoch`.
	pub(crate) fn apply_event(&self, epoch: u64, event: SessionEvent) {
		debug!("Wallet event {} (epoch {})", event, epoch);
		match event {
			SessionEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
				Some(address) => self.switch_account(epoch, address),
				None => {
					self.end_session(epoch, DisconnectReason::AccountsCleared);
				}
			},
			SessionEvent::ChainChanged(chain_id) => {
				// Chain-specific state cannot be trusted after a switch; start over.
				if self.end_session(epoch, DisconnectReason::ChainChanged) {
					info!("Chain changed to {}, reloading page", chain_id);
					self.shared.environment.reload_page();
				}
			}
			SessionEvent::Disconnected => {
				self.end_session(epoch, DisconnectReason::ProviderDisconnected);
			}
		}
	}

	fn switch_account(&self, epoch: u64, address: String) {
		let mut state = self.shared.state.lock();
		let Some(active) = state.active_mut(epoch) else {
			debug!("Ignoring account change from an inactive session");
			return;
		};
		let provider = active.provider();
		if !active.session.set_address(address.clone()) {
			return;
		}
		info!("{} switched account to {}", provider, address);
		self.shared.publish(&state);
		self.shared
			.emit(WalletEvent::AccountChanged { provider, address });
	}

	/// Collapse the session without prompting the wallet. Returns whether
	/// `epoch` was still active.
	fn end_session(&self, epoch: u64, reason: DisconnectReason) -> bool {
		match self.shared.collapse(epoch, reason) {
			Some(mut active) => {
				active.subscriptions.teardown();
				true
			}
			None => {
				debug!("Ignoring {:?} from an inactive session", reason);
				false
			}
		}
	}

	/// Re-read balance and network for the connected session.
	///
	/// Failures are logged and the previous values kept. Results are applied
	/// only if the same session is still active, and a balance only if the
	/// account has not changed while it was being read.
	pub async fn refresh(&self) -> WalletSession {
		let target = {
			let state = self.shared.state.lock();
			match &state.phase {
				SessionPhase::Connected(active) => Some((
					active.epoch,
					active.adapter.clone(),
					active.session.address().to_string(),
				)),
				_ => None,
			}
		};
		let Some((epoch, adapter, address)) = target else {
			debug!("Refresh skipped, no wallet connected");
			return WalletSession::disconnected();
		};

		let (balance, network) =
			futures::future::join(adapter.get_balance(&address), adapter.get_network()).await;

		let mut state = self.shared.state.lock();
		let Some(active) = state.active_mut(epoch) else {
			debug!("Session ended during refresh, discarding results");
			return state.snapshot();
		};
		let provider = active.provider();
		let mut changed = false;

		match balance {
			Ok(balance) if active.session.address() == address => {
				if active.session.set_balance(balance.clone()) {
					changed = true;
					self.shared
						.emit(WalletEvent::BalanceUpdated { provider, balance });
				}
			}
			Ok(_) => debug!("Account changed during refresh, discarding balance"),
			Err(e) => warn!("Failed to refresh {} balance: {}", provider, e),
		}

		match network {
			Ok(network) => {
				if active.session.set_network(network.clone()) {
					changed = true;
					self.shared
						.emit(WalletEvent::NetworkChanged { provider, network });
				}
			}
			Err(e) => warn!("Failed to refresh {} network: {}", provider, e),
		}

		if changed {
			self.shared.publish(&state);
		}
		state.snapshot()
	}
}

fn deliver(shared: &Weak<SessionShared>, epoch: u64, event: SessionEvent) {
	if let Some(shared) = shared.upgrade() {
		SessionSynchronizer::new(shared).apply_event(epoch, event);
	}
}
