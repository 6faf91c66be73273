//! Builder pattern for constructing delegation orchestrators.
//!
//! Composes a [`DelegationOrchestrator`] from the configured gateway and
//! wallet providers using factory functions, so binaries and tests can plug
//! in their own implementations.

use crate::event_bus::EventBus;
use crate::orchestrator::{DelegationOrchestrator, OrchestratorSettings};
use delegator_config::Config;
use delegator_gateway::{GatewayError, GatewayInterface, GatewayService};
use delegator_wallet::{
	FilePreferences, MemoryPreferences, PreferenceStore, WalletError, WalletInterface,
	WalletProviderRegistry,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building an orchestrator.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions keyed by implementation name.
pub struct DelegatorFactories<GF, WF> {
	pub gateway_factories: HashMap<String, GF>,
	pub wallet_factories: HashMap<String, WF>,
}

/// Capacity of the event channel handed to observers.
const EVENT_CAPACITY: usize = 256;

/// Builder for a [`DelegationOrchestrator`].
pub struct OrchestratorBuilder {
	config: Config,
	preferences: Option<Arc<dyn PreferenceStore>>,
}

impl OrchestratorBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			preferences: None,
		}
	}

	/// Overrides the preference store derived from configuration.
	pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
		self.preferences = Some(preferences);
		self
	}

	pub fn build<GF, WF>(
		self,
		factories: DelegatorFactories<GF, WF>,
	) -> Result<DelegationOrchestrator, BuilderError>
	where
		GF: Fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>,
		WF: Fn(&toml::Value) -> Result<Box<dyn WalletInterface>, WalletError>,
	{
		// Create gateway implementations
		let mut gateway_impls = HashMap::new();
		for (name, config) in &self.config.gateway.implementations {
			if let Some(factory) = factories.gateway_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						gateway_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.gateway.primary == name;
						tracing::info!(component = "gateway", implementation = %name, enabled = %is_primary, "Loaded");
					},
					Err(e) => {
						tracing::error!(
							component = "gateway",
							implementation = %name,
							error = %e,
							"Failed to create gateway implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create gateway implementation '{}': {}",
							name, e
						)));
					},
				}
			}
		}

		let primary_gateway = &self.config.gateway.primary;
		let gateway_backend = gateway_impls.remove(primary_gateway).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary gateway '{}' has no registered implementation",
				primary_gateway
			))
		})?;
		let gateway = Arc::new(GatewayService::new(primary_gateway.clone(), gateway_backend));

		// Create wallet providers
		let mut providers: BTreeMap<String, Arc<dyn WalletInterface>> = BTreeMap::new();
		for (key, table) in &self.config.wallet.providers {
			let implementation = table
				.get("implementation")
				.and_then(|value| value.as_str())
				.unwrap_or_default();
			let Some(factory) = factories.wallet_factories.get(implementation) else {
				tracing::warn!(
					component = "wallet",
					provider = %key,
					implementation = %implementation,
					"Unknown wallet implementation, skipping"
				);
				continue;
			};

			let mut provider_config = table.clone();
			if let Some(entries) = provider_config.as_table_mut() {
				entries.remove("implementation");
			}
			match factory(&provider_config) {
				Ok(provider) => {
					tracing::info!(component = "wallet", provider = %key, implementation = %implementation, "Loaded");
					providers.insert(key.clone(), Arc::from(provider));
				},
				Err(e) => {
					tracing::error!(
						component = "wallet",
						provider = %key,
						error = %e,
						"Failed to create wallet provider"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create wallet provider '{}': {}",
						key, e
					)));
				},
			}
		}

		if providers.is_empty() {
			return Err(BuilderError::MissingComponent(
				"No wallet providers available".into(),
			));
		}

		let preferences: Arc<dyn PreferenceStore> =
			match (self.preferences, &self.config.wallet.preferences_path) {
				(Some(store), _) => store,
				(None, Some(path)) => Arc::new(FilePreferences::new(path.clone())),
				(None, None) => Arc::new(MemoryPreferences::new()),
			};
		let wallets = Arc::new(WalletProviderRegistry::new(
			providers,
			self.config.wallet.priority.clone(),
			preferences,
		));

		let settings = OrchestratorSettings {
			network: self.config.delegator.network,
			stake_registration: self.config.delegation.stake_registration,
			partial_sign: self.config.delegation.partial_sign,
		};

		Ok(DelegationOrchestrator::new(
			settings,
			gateway,
			wallets,
			EventBus::new(EVENT_CAPACITY),
		))
	}
}
