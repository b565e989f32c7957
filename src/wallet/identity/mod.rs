//! Wallets an application user has vouched for.
//!
//! The session layer never writes here. Outer code links or unlinks wallets
//! explicitly and asks whether the live session matches a stored link, for
//! example before showing holdings tied to the user's identity.

pub mod linker;
pub mod repositories;

pub use linker::IdentityLinker;
pub use repositories::{
	FileLinkedWalletRepository, InMemoryLinkedWalletRepository, LinkedWalletRepository,
};

use crate::provider::ProviderKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An address linked to a user for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAddress {
	pub address: String,
	pub linked_at: DateTime<Utc>,
}

/// All wallets linked to one application user, at most one per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedWalletRecord {
	pub user_id: String,
	#[serde(default)]
	pub wallets: BTreeMap<ProviderKind, LinkedAddress>,
}

impl LinkedWalletRecord {
	pub fn new(user_id: impl Into<String>) -> Self {
		Self {
			user_id: user_id.into(),
			wallets: BTreeMap::new(),
		}
	}

	pub fn address(&self, kind: ProviderKind) -> Option<&str> {
		self.wallets.get(&kind).map(|link| link.address.as_str())
	}

	/// Link `address` for `kind`, replacing any previous link.
	pub fn insert(&mut self, kind: ProviderKind, address: String, linked_at: DateTime<Utc>) {
		self.wallets
			.insert(kind, LinkedAddress { address, linked_at });
	}

	pub fn remove(&mut self, kind: ProviderKind) -> Option<LinkedAddress> {
		self.wallets.remove(&kind)
	}
}
