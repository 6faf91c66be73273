//! Chain-data gateway module for the delegation builder.
//!
//! The builder reads two things from the chain: the current protocol
//! parameters, fetched once per attempt, and whether the wallet's stake
//! credential is already registered. Both come from a gateway implementation
//! selected in configuration.

use async_trait::async_trait;
use delegator_ledger::RewardAddress;
use delegator_types::{ConfigSchema, ImplementationRegistry, ProtocolParameters};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod blockfrost;
	pub mod fixed;
}

/// Errors that can occur while talking to a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The gateway answered with a non-success status.
	#[error("Gateway returned HTTP {status}: {message}")]
	Status { status: u16, message: String },
	/// The request never produced a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The response could not be understood.
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl GatewayError {
	/// HTTP status of the failed request, when there was one.
	pub fn status(&self) -> Option<u16> {
		match self {
			GatewayError::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Trait defining the interface for chain-data gateways.
#[async_trait]
pub trait GatewayInterface: Send + Sync {
	/// Returns the configuration schema for this gateway implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the parameters of the current epoch. A single round trip, no
	/// retry and no staleness check.
	async fn fetch_current(&self) -> Result<ProtocolParameters, GatewayError>;

	/// Whether the stake credential behind `reward` is registered on chain.
	async fn is_stake_registered(&self, reward: &RewardAddress) -> Result<bool, GatewayError>;
}

/// Type alias for gateway factory functions.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>;

/// Registry trait for gateway implementations.
pub trait GatewayRegistry: ImplementationRegistry<Factory = GatewayFactory> {}

/// Get all registered gateway implementations.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{blockfrost, fixed};

	vec![
		(blockfrost::Registry::NAME, blockfrost::Registry::factory()),
		(fixed::Registry::NAME, fixed::Registry::factory()),
	]
}

/// Service wrapping the gateway chosen as primary.
pub struct GatewayService {
	name: String,
	gateway: Box<dyn GatewayInterface>,
}

impl GatewayService {
	pub fn new(name: impl Into<String>, gateway: Box<dyn GatewayInterface>) -> Self {
		Self {
			name: name.into(),
			gateway,
		}
	}

	/// Name of the configured implementation.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn fetch_current(&self) -> Result<ProtocolParameters, GatewayError> {
		match self.gateway.fetch_current().await {
			Ok(params) => {
				tracing::debug!(
					component = "gateway",
					gateway = %self.name,
					min_fee_a = params.min_fee_a,
					min_fee_b = params.min_fee_b,
					key_deposit = params.key_deposit,
					"Fetched protocol parameters"
				);
				Ok(params)
			},
			Err(e) => {
				tracing::warn!(component = "gateway", gateway = %self.name, error = %e, "Protocol parameter fetch failed");
				Err(e)
			},
		}
	}

	pub async fn is_stake_registered(&self, reward: &RewardAddress) -> Result<bool, GatewayError> {
		let registered = self.gateway.is_stake_registered(reward).await?;
		tracing::debug!(
			component = "gateway",
			gateway = %self.name,
			reward = %reward.to_hex(),
			registered,
			"Checked stake registration"
		);
		Ok(registered)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["blockfrost", "fixed"]);
	}

	#[test]
	fn test_status_accessor() {
		let err = GatewayError::Status {
			status: 403,
			message: "forbidden".into(),
		};
		assert_eq!(err.status(), Some(403));
		assert_eq!(GatewayError::Network("reset".into()).status(), None);
	}

	#[tokio::test]
	async fn test_service_delegates_to_primary() {
		let config: toml::Value = toml::from_str("min_fee_a = 44\nmin_fee_b = 155381").unwrap();
		let (_, factory) = get_all_implementations()
			.into_iter()
			.find(|(name, _)| *name == "fixed")
			.unwrap();
		let service = GatewayService::new("fixed", factory(&config).unwrap());
		assert_eq!(service.name(), "fixed");
		let params = service.fetch_current().await.unwrap();
		assert_eq!(params.min_fee_a, 44);
		assert_eq!(params.min_fee_b, 155_381);
	}
}
