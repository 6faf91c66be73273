//! Registry of the gateway and wallet implementations this binary ships.
//!
//! Every implementation crate exposes `get_all_implementations()`; the
//! registry collects them by configuration name and hands them to the core
//! builder.

use delegator_config::Config;
use delegator_core::{DelegationOrchestrator, DelegatorFactories, OrchestratorBuilder};
use delegator_gateway::GatewayFactory;
use delegator_wallet::WalletFactory;
use std::collections::HashMap;

/// Factories for every known implementation, by configuration name.
pub struct FactoryRegistry {
	pub gateway: HashMap<String, GatewayFactory>,
	pub wallet: HashMap<String, WalletFactory>,
}

impl FactoryRegistry {
	/// Registry holding every implementation compiled into the binary.
	pub fn with_all_implementations() -> Self {
		let mut registry = Self {
			gateway: HashMap::new(),
			wallet: HashMap::new(),
		};
		for (name, factory) in delegator_gateway::get_all_implementations() {
			registry.gateway.insert(name.to_string(), factory);
		}
		for (name, factory) in delegator_wallet::get_all_implementations() {
			registry.wallet.insert(name.to_string(), factory);
		}
		registry
	}

	pub fn into_factories(self) -> DelegatorFactories<GatewayFactory, WalletFactory> {
		DelegatorFactories {
			gateway_factories: self.gateway,
			wallet_factories: self.wallet,
		}
	}
}

/// Builds the orchestrator described by `config`.
pub fn build_orchestrator(config: Config) -> Result<DelegationOrchestrator, Box<dyn std::error::Error>> {
	let factories = FactoryRegistry::with_all_implementations().into_factories();
	Ok(OrchestratorBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_registry_knows_shipped_implementations() {
		let registry = FactoryRegistry::with_all_implementations();
		assert!(registry.gateway.contains_key("blockfrost"));
		assert!(registry.gateway.contains_key("fixed"));
		assert!(registry.wallet.contains_key("bridge"));
		assert!(registry.wallet.contains_key("mock"));
	}

	#[tokio::test]
	async fn test_builds_from_config_file() {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		write!(
			file,
			r#"
[delegator]
id = "delegator-cli-test"
network = "preview"

[gateway]
primary = "fixed"
[gateway.implementations.fixed]

[wallet.providers.nami]
implementation = "mock"
name = "Nami"
network_id = 0
"#
		)
		.unwrap();

		let config = Config::from_file(file.path().to_str().unwrap()).await.unwrap();
		let orchestrator = build_orchestrator(config).unwrap();
		assert_eq!(orchestrator.wallets().list_providers(), vec!["nami"]);
	}
}
