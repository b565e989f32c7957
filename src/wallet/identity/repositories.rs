use super::LinkedWalletRecord;
use crate::wallet::WalletError;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Storage for linked-wallet records, keyed by application user id.
#[async_trait::async_trait]
pub trait LinkedWalletRepository: Send + Sync {
	async fn load(&self, user_id: &str) -> Result<Option<LinkedWalletRecord>, WalletError>;
	async fn save(&self, record: &LinkedWalletRecord) -> Result<(), WalletError>;
}

/// Records held in memory for the life of the process.
#[derive(Default)]
pub struct InMemoryLinkedWalletRepository {
	records: RwLock<HashMap<String, LinkedWalletRecord>>,
}

impl InMemoryLinkedWalletRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl LinkedWalletRepository for InMemoryLinkedWalletRepository {
	async fn load(&self, user_id: &str) -> Result<Option<LinkedWalletRecord>, WalletError> {
		Ok(self.records.read().get(user_id).cloned())
	}

	async fn save(&self, record: &LinkedWalletRecord) -> Result<(), WalletError> {
		self.records
			.write()
			.insert(record.user_id.clone(), record.clone());
		Ok(())
	}
}

/// One JSON file per user under `data_dir`.
pub struct FileLinkedWalletRepository {
	data_dir: PathBuf,
}

impl FileLinkedWalletRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn record_filename(&self, user_id: &str) -> PathBuf {
		// Hex keeps arbitrary user ids safe as file names.
		self.data_dir
			.join(format!("linked_wallets_{}.json", hex::encode(user_id)))
	}
}

#[async_trait::async_trait]
impl LinkedWalletRepository for FileLinkedWalletRepository {
	async fn load(&self, user_id: &str) -> Result<Option<LinkedWalletRecord>, WalletError> {
		let filename = self.record_filename(user_id);
		let content = match tokio::fs::read_to_string(&filename).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!("No linked wallets stored for user {}", user_id);
				return Ok(None);
			}
			Err(e) => {
				return Err(WalletError::RepositoryError(format!(
					"Failed to read {:?}: {}",
					filename, e
				)));
			}
		};

		let record: LinkedWalletRecord = serde_json::from_str(&content)?;
		if record.user_id != user_id {
			return Err(WalletError::RepositoryError(format!(
				"{:?} belongs to user {}, expected {}",
				filename, record.user_id, user_id
			)));
		}
		Ok(Some(record))
	}

	async fn save(&self, record: &LinkedWalletRecord) -> Result<(), WalletError> {
		tokio::fs::create_dir_all(&self.data_dir).await?;

		let filename = self.record_filename(&record.user_id);
		let content = serde_json::to_string_pretty(record)?;
		tokio::fs::write(&filename, content).await.map_err(|e| {
			WalletError::RepositoryError(format!("Failed to write {:?}: {}", filename, e))
		})?;

		info!(
			"Saved {} linked wallets for user {} to {:?}",
			record.wallets.len(),
			record.user_id,
			filename
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::ProviderKind;
	use chrono::Utc;

	fn record() -> LinkedWalletRecord {
		let mut record = LinkedWalletRecord::new("user-1");
		record.insert(
			ProviderKind::SolanaA,
			"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
			Utc::now(),
		);
		record
	}

	#[tokio::test]
	async fn file_repository_persists_records() {
		let dir = tempfile::tempdir().unwrap();
		let repository = FileLinkedWalletRepository::new(dir.path().join("links"));

		assert!(repository.load("user-1").await.unwrap().is_none());

		let record = record();
		repository.save(&record).await.unwrap();

		let reopened = FileLinkedWalletRepository::new(dir.path().join("links"));
		assert_eq!(reopened.load("user-1").await.unwrap(), Some(record));
		assert!(reopened.load("user-2").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn file_repository_rejects_corrupt_files() {
		let dir = tempfile::tempdir().unwrap();
		let repository = FileLinkedWalletRepository::new(dir.path().to_path_buf());
		tokio::fs::write(repository.record_filename("user-1"), "{ not json")
			.await
			.unwrap();

		assert!(matches!(
			repository.load("user-1").await,
			Err(WalletError::JsonError(_))
		));
	}

	#[tokio::test]
	async fn memory_repository_replaces_records() {
		let repository = InMemoryLinkedWalletRepository::new();
		let mut record = record();
		repository.save(&record).await.unwrap();

		record.remove(ProviderKind::SolanaA);
		repository.save(&record).await.unwrap();

		let loaded = repository.load("user-1").await.unwrap().unwrap();
		assert!(loaded.wallets.is_empty());
	}
}
