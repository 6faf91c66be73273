//! Discovery and selection of installed wallet providers.

use crate::{PreferenceStore, WalletError, WalletInterface};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The wallet providers present in this environment plus the rules that
/// pick one of them.
///
/// Selection order:
/// 1. the explicitly preferred key, if installed (case-insensitive)
/// 2. the most recently used provider, if still installed
/// 3. the first installed name of the priority list
/// 4. the first installed provider in key order
///
/// Selection never touches the chain.
pub struct WalletProviderRegistry {
	/// Lowercased key to provider.
	providers: BTreeMap<String, Arc<dyn WalletInterface>>,
	/// Lowercased fallback priority.
	priority: Vec<String>,
	preferences: Arc<dyn PreferenceStore>,
}

impl WalletProviderRegistry {
	pub fn new(
		providers: BTreeMap<String, Arc<dyn WalletInterface>>,
		priority: Vec<String>,
		preferences: Arc<dyn PreferenceStore>,
	) -> Self {
		Self {
			providers: providers
				.into_iter()
				.map(|(key, provider)| (key.to_lowercase(), provider))
				.collect(),
			priority: priority.iter().map(|p| p.to_lowercase()).collect(),
			preferences,
		}
	}

	/// Installed provider keys in key order.
	pub fn list_providers(&self) -> Vec<String> {
		self.providers.keys().cloned().collect()
	}

	pub fn is_installed(&self, key: &str) -> bool {
		self.providers.contains_key(&key.to_lowercase())
	}

	pub fn get(&self, key: &str) -> Option<Arc<dyn WalletInterface>> {
		self.providers.get(&key.to_lowercase()).cloned()
	}

	/// Picker order: installed priority names first, then everything else.
	pub fn ordered_providers(&self) -> Vec<String> {
		let mut ordered: Vec<String> = self
			.priority
			.iter()
			.filter(|name| self.providers.contains_key(*name))
			.cloned()
			.collect();
		for key in self.providers.keys() {
			if !ordered.contains(key) {
				ordered.push(key.clone());
			}
		}
		ordered
	}

	/// Picks the provider to use for an attempt.
	pub async fn select(
		&self,
		preferred: Option<&str>,
	) -> Result<(String, Arc<dyn WalletInterface>), WalletError> {
		if let Some(found) = preferred.and_then(|key| self.lookup(key)) {
			tracing::debug!(component = "wallet", wallet = %found.0, "Selected preferred wallet");
			return Ok(found);
		}

		match self.preferences.last_used().await {
			Ok(Some(last)) => {
				if let Some(found) = self.lookup(&last) {
					tracing::debug!(component = "wallet", wallet = %found.0, "Selected last used wallet");
					return Ok(found);
				}
			},
			Ok(None) => {},
			// An unreadable preference only loses the shortcut.
			Err(e) => tracing::warn!(component = "wallet", error = %e, "Ignoring stored wallet preference"),
		}

		if let Some(found) = self.priority.iter().find_map(|name| self.lookup(name)) {
			return Ok(found);
		}

		self.providers
			.iter()
			.next()
			.map(|(key, provider)| (key.clone(), provider.clone()))
			.ok_or(WalletError::NoWalletFound)
	}

	/// Records `key` as the most recently used provider.
	pub async fn remember(&self, key: &str) -> Result<(), WalletError> {
		self.preferences.set_last_used(&key.to_lowercase()).await
	}

	fn lookup(&self, key: &str) -> Option<(String, Arc<dyn WalletInterface>)> {
		let key = key.to_lowercase();
		self.providers
			.get(&key)
			.map(|provider| (key, provider.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::mock::{MockWallet, MockWalletConfig};
	use crate::MemoryPreferences;

	const PRIORITY: [&str; 7] = [
		"eternl",
		"nami",
		"lace",
		"yoroi",
		"gerowallet",
		"nufi",
		"typhoncip30",
	];

	fn registry(keys: &[&str]) -> WalletProviderRegistry {
		let providers = keys
			.iter()
			.map(|key| {
				let wallet: Arc<dyn WalletInterface> =
					Arc::new(MockWallet::new(MockWalletConfig::default()));
				(key.to_string(), wallet)
			})
			.collect();
		WalletProviderRegistry::new(
			providers,
			PRIORITY.iter().map(|s| s.to_string()).collect(),
			Arc::new(MemoryPreferences::new()),
		)
	}

	#[tokio::test]
	async fn test_preferred_key_wins_case_insensitively() {
		let registry = registry(&["eternl", "lace"]);
		let (key, _) = registry.select(Some("LACE")).await.unwrap();
		assert_eq!(key, "lace");
	}

	#[tokio::test]
	async fn test_missing_preferred_key_falls_through() {
		let registry = registry(&["nami", "lace"]);
		let (key, _) = registry.select(Some("eternl")).await.unwrap();
		assert_eq!(key, "nami");
	}

	#[tokio::test]
	async fn test_last_used_beats_priority() {
		let registry = registry(&["eternl", "yoroi"]);
		registry.remember("Yoroi").await.unwrap();
		let (key, _) = registry.select(None).await.unwrap();
		assert_eq!(key, "yoroi");
	}

	#[tokio::test]
	async fn test_uninstalled_last_used_is_skipped() {
		let registry = registry(&["lace", "nufi"]);
		registry.remember("eternl").await.unwrap();
		let (key, _) = registry.select(None).await.unwrap();
		assert_eq!(key, "lace");
	}

	#[tokio::test]
	async fn test_unknown_providers_fall_back_to_key_order() {
		let registry = registry(&["vespr", "begin"]);
		let (key, _) = registry.select(None).await.unwrap();
		assert_eq!(key, "begin");
	}

	#[tokio::test]
	async fn test_no_wallet_found() {
		let registry = registry(&[]);
		assert!(matches!(
			registry.select(Some("eternl")).await,
			Err(WalletError::NoWalletFound)
		));
	}

	#[test]
	fn test_ordered_providers() {
		let registry = registry(&["vespr", "lace", "Eternl", "begin"]);
		assert_eq!(
			registry.ordered_providers(),
			vec!["eternl", "lace", "begin", "vespr"]
		);
		assert!(registry.is_installed("ETERNL"));
		assert!(!registry.is_installed("nami"));
		assert_eq!(registry.list_providers(), vec!["begin", "eternl", "lace", "vespr"]);
	}
}
