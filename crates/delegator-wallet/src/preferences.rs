//! Remembers which wallet the user enabled last.

use crate::WalletError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;

/// Storage for the most recently used wallet name.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
	async fn last_used(&self) -> Result<Option<String>, WalletError>;

	async fn set_last_used(&self, name: &str) -> Result<(), WalletError>;
}

/// Keeps the preference for the lifetime of the process.
#[derive(Default)]
pub struct MemoryPreferences {
	last_used: RwLock<Option<String>>,
}

impl MemoryPreferences {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
	async fn last_used(&self) -> Result<Option<String>, WalletError> {
		Ok(self.last_used.read().await.clone())
	}

	async fn set_last_used(&self, name: &str) -> Result<(), WalletError> {
		*self.last_used.write().await = Some(name.to_string());
		Ok(())
	}
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
	#[serde(default)]
	last_wallet: Option<String>,
}

/// Persists the preference as a small JSON document.
pub struct FilePreferences {
	path: PathBuf,
	/// Serialises writers within this process.
	lock: RwLock<()>,
}

impl FilePreferences {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: RwLock::new(()),
		}
	}

	async fn read(&self) -> Result<PreferenceFile, WalletError> {
		match fs::read(&self.path).await {
			Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
				WalletError::Preferences(format!("{}: {}", self.path.display(), e))
			}),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PreferenceFile::default()),
			Err(e) => Err(WalletError::Preferences(e.to_string())),
		}
	}
}

#[async_trait]
impl PreferenceStore for FilePreferences {
	async fn last_used(&self) -> Result<Option<String>, WalletError> {
		let _guard = self.lock.read().await;
		Ok(self.read().await?.last_wallet)
	}

	async fn set_last_used(&self, name: &str) -> Result<(), WalletError> {
		let _guard = self.lock.write().await;
		let mut file = self.read().await.unwrap_or_default();
		file.last_wallet = Some(name.to_string());
		let bytes = serde_json::to_vec_pretty(&file)
			.map_err(|e| WalletError::Preferences(e.to_string()))?;

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| WalletError::Preferences(e.to_string()))?;
		}
		// Write then rename so a crash never leaves a truncated file.
		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| WalletError::Preferences(e.to_string()))?;
		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| WalletError::Preferences(e.to_string()))?;

		tracing::debug!(component = "wallet", wallet = %name, "Remembered last used wallet");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_memory_preferences() {
		let store = MemoryPreferences::new();
		assert_eq!(store.last_used().await.unwrap(), None);
		store.set_last_used("lace").await.unwrap();
		store.set_last_used("nami").await.unwrap();
		assert_eq!(store.last_used().await.unwrap().as_deref(), Some("nami"));
	}

	#[tokio::test]
	async fn test_file_preferences_persist() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nested").join("wallet.json");

		let store = FilePreferences::new(&path);
		assert_eq!(store.last_used().await.unwrap(), None);
		store.set_last_used("eternl").await.unwrap();

		let reopened = FilePreferences::new(&path);
		assert_eq!(reopened.last_used().await.unwrap().as_deref(), Some("eternl"));
	}

	#[tokio::test]
	async fn test_corrupt_file_is_reported_and_overwritten() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("wallet.json");
		std::fs::write(&path, "not json").unwrap();

		let store = FilePreferences::new(&path);
		assert!(matches!(
			store.last_used().await,
			Err(WalletError::Preferences(_))
		));
		store.set_last_used("yoroi").await.unwrap();
		assert_eq!(store.last_used().await.unwrap().as_deref(), Some("yoroi"));
	}
}
