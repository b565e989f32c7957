//! Wallet session lifecycle.
//!
//! This module ties the adapters to application state:
//!
//! - `orchestrator`: the connect/disconnect state machine and the public API
//! - `synchronizer`: mirrors wallet events into the session and refreshes
//!   balance and network
//! - `subscriptions`: the listener set owned by one connected session
//! - `events`: wallet events as seen by the synchronizer
//!
//! Session snapshots are published on a `watch` channel and discrete changes
//! on a `broadcast` channel, so any number of views can follow the session
//! without polling.

pub mod events;
pub mod orchestrator;
mod state;
pub mod subscriptions;
pub mod synchronizer;

pub use events::SessionEvent;
pub use orchestrator::ConnectionOrchestrator;
pub use subscriptions::SubscriptionSet;
pub use synchronizer::SessionSynchronizer;
