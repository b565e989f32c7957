use super::{LinkedWalletRecord, LinkedWalletRepository};
use crate::provider::{ProviderApi, ProviderKind};
use crate::wallet::adapters::{is_evm_address, is_solana_address};
use crate::wallet::{WalletError, WalletSession};

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

type UserLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Reconciles wallet sessions with the wallets users have linked.
#[derive(Clone)]
pub struct IdentityLinker {
	repository: Arc<dyn LinkedWalletRepository>,
	/// Held across a record's load and save so concurrent changes for the
	/// same user are applied one after the other.
	user_locks: Arc<UserLocks>,
}

impl IdentityLinker {
	pub fn new(repository: Arc<dyn LinkedWalletRepository>) -> Self {
		Self {
			repository,
			user_locks: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.user_locks.lock();
			// Drop locks nobody is holding or waiting on.
			locks.retain(|_, lock| Arc::strong_count(lock) > 1);
			locks.entry(user_id.to_string()).or_default().clone()
		};
		if lock.try_lock().is_err() {
			debug!("Waiting for pending link change of user {}", user_id);
		}
		lock.lock_owned().await
	}

	/// Link `address` to `user_id` for `kind`, replacing any earlier link.
	pub async fn link(
		&self,
		user_id: &str,
		kind: ProviderKind,
		address: &str,
	) -> Result<LinkedWalletRecord, WalletError> {
		let valid = match kind.api() {
			ProviderApi::Eip1193 => is_evm_address(address),
			ProviderApi::Solana => is_solana_address(address),
		};
		if !valid {
			return Err(WalletError::InvalidAddress(format!(
				"{} is not a valid {} address",
				address, kind
			)));
		}

		let _guard = self.lock_user(user_id).await;
		let mut record = self.linked_wallets(user_id).await?;
		record.insert(kind, address.to_string(), Utc::now());
		self.repository.save(&record).await?;

		info!("Linked {} wallet {} to user {}", kind, address, user_id);
		Ok(record)
	}

	/// Remove the link for `kind`. Returns whether one existed.
	pub async fn unlink(&self, user_id: &str, kind: ProviderKind) -> Result<bool, WalletError> {
		let _guard = self.lock_user(user_id).await;
		let Some(mut record) = self.repository.load(user_id).await? else {
			return Ok(false);
		};
		if record.remove(kind).is_none() {
			return Ok(false);
		}
		self.repository.save(&record).await?;

		info!("Unlinked {} wallet from user {}", kind, user_id);
		Ok(true)
	}

	/// The user's record, empty when nothing has been linked.
	pub async fn linked_wallets(&self, user_id: &str) -> Result<LinkedWalletRecord, WalletError> {
		Ok(self
			.repository
			.load(user_id)
			.await?
			.unwrap_or_else(|| LinkedWalletRecord::new(user_id)))
	}

	/// Whether `address` is the wallet `user_id` linked for `kind`.
	///
	/// Fails closed: a repository error is logged and reported as not linked.
	pub async fn is_wallet_linked(&self, user_id: &str, kind: ProviderKind, address: &str) -> bool {
		if address.is_empty() {
			return false;
		}
		match self.repository.load(user_id).await {
			Ok(record) => record
				.as_ref()
				.and_then(|r| r.address(kind))
				.is_some_and(|linked| addresses_match(kind, linked, address)),
			Err(e) => {
				warn!("Failed to load linked wallets for user {}: {}", user_id, e);
				false
			}
		}
	}

	/// Whether the live session is a wallet `user_id` has linked.
	pub async fn is_session_linked(&self, user_id: &str, session: &WalletSession) -> bool {
		match session.provider() {
			Some(kind) if session.is_connected() => {
				self.is_wallet_linked(user_id, kind, session.address()).await
			}
			_ => false,
		}
	}
}

/// EVM addresses are compared without checksum casing; Solana keys are
/// case-sensitive base58.
fn addresses_match(kind: ProviderKind, linked: &str, address: &str) -> bool {
	match kind.api() {
		ProviderApi::Eip1193 => linked.eq_ignore_ascii_case(address),
		ProviderApi::Solana => linked == address,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::wallet::identity::{FileLinkedWalletRepository, InMemoryLinkedWalletRepository};

	const EVM: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
	const SOL: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

	fn linker() -> IdentityLinker {
		IdentityLinker::new(Arc::new(InMemoryLinkedWalletRepository::new()))
	}

	#[tokio::test]
	async fn evm_links_ignore_checksum_casing() {
		let linker = linker();
		linker.link("alice", ProviderKind::EvmA, EVM).await.unwrap();

		assert!(
			linker
				.is_wallet_linked("alice", ProviderKind::EvmA, &EVM.to_ascii_lowercase())
				.await
		);
		assert!(!linker.is_wallet_linked("bob", ProviderKind::EvmA, EVM).await);
	}

	#[tokio::test]
	async fn solana_links_compare_exactly() {
		let linker = linker();
		linker.link("alice", ProviderKind::SolanaA, SOL).await.unwrap();

		assert!(linker.is_wallet_linked("alice", ProviderKind::SolanaA, SOL).await);
		assert!(
			!linker
				.is_wallet_linked("alice", ProviderKind::SolanaA, &SOL.to_ascii_lowercase())
				.await
		);
		// Links are per provider.
		assert!(!linker.is_wallet_linked("alice", ProviderKind::SolanaB, SOL).await);
	}

	#[tokio::test]
	async fn link_rejects_malformed_addresses() {
		let linker = linker();
		assert!(matches!(
			linker.link("alice", ProviderKind::EvmA, SOL).await,
			Err(WalletError::InvalidAddress(_))
		));
		assert!(matches!(
			linker.link("alice", ProviderKind::SolanaB, EVM).await,
			Err(WalletError::InvalidAddress(_))
		));
	}

	#[tokio::test]
	async fn unlink_removes_only_that_provider() {
		let linker = linker();
		linker.link("alice", ProviderKind::EvmA, EVM).await.unwrap();
		linker.link("alice", ProviderKind::SolanaA, SOL).await.unwrap();

		assert!(linker.unlink("alice", ProviderKind::EvmA).await.unwrap());
		assert!(!linker.unlink("alice", ProviderKind::EvmA).await.unwrap());

		let record = linker.linked_wallets("alice").await.unwrap();
		assert_eq!(record.address(ProviderKind::SolanaA), Some(SOL));
		assert_eq!(record.address(ProviderKind::EvmA), None);
	}

	#[tokio::test]
	async fn session_link_requires_connected_session() {
		let linker = linker();
		linker.link("alice", ProviderKind::SolanaA, SOL).await.unwrap();

		assert!(
			!linker
				.is_session_linked("alice", &WalletSession::disconnected())
				.await
		);
		let session =
			WalletSession::connected(ProviderKind::SolanaA, SOL.to_string(), None).unwrap();
		assert!(linker.is_session_linked("alice", &session).await);
	}

	#[tokio::test]
	async fn concurrent_changes_for_one_user_are_all_kept() {
		let dir = tempfile::tempdir().unwrap();
		let linker = IdentityLinker::new(Arc::new(FileLinkedWalletRepository::new(
			dir.path().to_path_buf(),
		)));

		let (evm, sol) = tokio::join!(
			linker.link("alice", ProviderKind::EvmA, EVM),
			linker.link("alice", ProviderKind::SolanaA, SOL),
		);
		evm.unwrap();
		sol.unwrap();

		let record = linker.linked_wallets("alice").await.unwrap();
		assert_eq!(record.address(ProviderKind::EvmA), Some(EVM));
		assert_eq!(record.address(ProviderKind::SolanaA), Some(SOL));

		let (linked, removed) = tokio::join!(
			linker.link("alice", ProviderKind::SolanaB, SOL),
			linker.unlink("alice", ProviderKind::EvmA),
		);
		linked.unwrap();
		assert!(removed.unwrap());

		let record = linker.linked_wallets("alice").await.unwrap();
		assert_eq!(record.address(ProviderKind::EvmA), None);
		assert_eq!(record.address(ProviderKind::SolanaA), Some(SOL));
		assert_eq!(record.address(ProviderKind::SolanaB), Some(SOL));
	}
}
