//! Gateway answering from configuration.
//!
//! Serves a parameter set written in the config file and a static list of
//! registered stake addresses. Used offline and in tests.

use crate::{GatewayError, GatewayFactory, GatewayInterface, GatewayRegistry};
use async_trait::async_trait;
use delegator_ledger::RewardAddress;
use delegator_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, ProtocolParameters, Schema,
	ValidationError,
};
use serde::Deserialize;

/// Parameter values, defaulting to mainnet at the start of the Conway era.
#[derive(Debug, Clone, Deserialize)]
pub struct FixedGatewayConfig {
	#[serde(default = "defaults::min_fee_a")]
	pub min_fee_a: u64,
	#[serde(default = "defaults::min_fee_b")]
	pub min_fee_b: u64,
	#[serde(default = "defaults::coins_per_utxo_byte")]
	pub coins_per_utxo_byte: u64,
	#[serde(default = "defaults::pool_deposit")]
	pub pool_deposit: u64,
	#[serde(default = "defaults::key_deposit")]
	pub key_deposit: u64,
	#[serde(default = "defaults::max_tx_size")]
	pub max_tx_size: u32,
	#[serde(default = "defaults::max_value_size")]
	pub max_value_size: u32,
	/// Stake addresses (bech32 or hex) reported as registered.
	#[serde(default)]
	pub registered: Vec<String>,
}

mod defaults {
	pub fn min_fee_a() -> u64 {
		44
	}
	pub fn min_fee_b() -> u64 {
		155_381
	}
	pub fn coins_per_utxo_byte() -> u64 {
		4_310
	}
	pub fn pool_deposit() -> u64 {
		500_000_000
	}
	pub fn key_deposit() -> u64 {
		2_000_000
	}
	pub fn max_tx_size() -> u32 {
		16_384
	}
	pub fn max_value_size() -> u32 {
		5_000
	}
}

impl FixedGatewayConfig {
	fn parameters(&self) -> ProtocolParameters {
		ProtocolParameters {
			min_fee_a: self.min_fee_a,
			min_fee_b: self.min_fee_b,
			coins_per_utxo_byte: self.coins_per_utxo_byte,
			pool_deposit: self.pool_deposit,
			key_deposit: self.key_deposit,
			max_tx_size: self.max_tx_size,
			max_value_size: self.max_value_size,
		}
	}
}

pub struct FixedGateway {
	params: ProtocolParameters,
	registered: Vec<String>,
}

impl FixedGateway {
	pub fn new(config: FixedGatewayConfig) -> Self {
		Self {
			params: config.parameters(),
			registered: config
				.registered
				.iter()
				.map(|address| address.to_lowercase())
				.collect(),
		}
	}
}

#[async_trait]
impl GatewayInterface for FixedGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FixedGatewaySchema)
	}

	async fn fetch_current(&self) -> Result<ProtocolParameters, GatewayError> {
		Ok(self.params.clone())
	}

	async fn is_stake_registered(&self, reward: &RewardAddress) -> Result<bool, GatewayError> {
		let bech32 = reward
			.to_bech32()
			.map_err(|e| GatewayError::Decode(e.to_string()))?;
		let hex = reward.to_hex();
		Ok(self
			.registered
			.iter()
			.any(|address| *address == bech32 || *address == hex))
	}
}

/// Configuration schema for [`FixedGateway`].
pub struct FixedGatewaySchema;

impl FixedGatewaySchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for FixedGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let amount = || FieldType::Integer {
			min: Some(0),
			max: None,
		};
		let size = || FieldType::Integer {
			min: Some(1),
			max: Some(u32::MAX as i64),
		};
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("min_fee_a", amount()),
				Field::new("min_fee_b", amount()),
				Field::new("coins_per_utxo_byte", amount()),
				Field::new("pool_deposit", amount()),
				Field::new("key_deposit", amount()),
				Field::new("max_tx_size", size()),
				Field::new("max_value_size", size()),
				Field::new("registered", FieldType::Array(Box::new(FieldType::String))),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a fixed gateway from configuration.
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	FixedGatewaySchema::validate_config(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;
	let config: FixedGatewayConfig = config
		.clone()
		.try_into()
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;
	Ok(Box::new(FixedGateway::new(config)))
}

/// Registry for the fixed gateway implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "fixed";
	type Factory = GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use delegator_types::{Hash28, StakeCredential};

	fn reward(byte: u8) -> RewardAddress {
		RewardAddress {
			network_id: 0,
			credential: StakeCredential::KeyHash(Hash28::new([byte; 28])),
		}
	}

	#[tokio::test]
	async fn test_defaults() {
		let gateway = create_gateway(&toml::Value::Table(Default::default())).unwrap();
		let params = gateway.fetch_current().await.unwrap();
		assert_eq!(params.min_fee_a, 44);
		assert_eq!(params.key_deposit, 2_000_000);
		assert_eq!(params.max_tx_size, 16_384);
	}

	#[tokio::test]
	async fn test_registered_addresses_match_hex_or_bech32() {
		let by_hex = reward(0x01);
		let by_bech32 = reward(0x02);
		let mut config: FixedGatewayConfig =
			toml::Value::Table(Default::default()).try_into().unwrap();
		config.registered = vec![by_hex.to_hex().to_uppercase(), by_bech32.to_bech32().unwrap()];
		let gateway = FixedGateway::new(config);
		assert!(gateway.is_stake_registered(&by_hex).await.unwrap());
		assert!(gateway.is_stake_registered(&by_bech32).await.unwrap());
		assert!(!gateway.is_stake_registered(&reward(0x03)).await.unwrap());
	}

	#[test]
	fn test_rejects_negative_amounts() {
		let config: toml::Value = toml::from_str("key_deposit = -5").unwrap();
		assert!(create_gateway(&config).is_err());
	}
}
