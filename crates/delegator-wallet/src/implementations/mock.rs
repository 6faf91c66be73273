//! In-memory wallet for development and tests.
//!
//! Serves UTXOs and addresses from its configuration table and answers
//! enable, sign and submit requests according to configured behaviour. Every
//! call is recorded so tests can assert what reached the wallet.

use crate::{
	ApiErrorCode, SendErrorCode, SignErrorCode, WalletApi, WalletError, WalletFactory,
	WalletInterface, WalletRegistry,
};
use async_trait::async_trait;
use delegator_ledger::vkey_witness_set;
use delegator_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableBehavior {
	#[default]
	Approve,
	Refuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignBehavior {
	#[default]
	Approve,
	Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitBehavior {
	#[default]
	Accept,
	Reject,
}

/// Configuration of a mock wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockWalletConfig {
	#[serde(default = "default_name")]
	pub name: String,
	#[serde(default = "default_network_id")]
	pub network_id: u8,
	/// Hex CBOR `[input, output]` entries.
	#[serde(default)]
	pub utxos: Vec<String>,
	#[serde(default)]
	pub reward_addresses: Vec<String>,
	#[serde(default)]
	pub change_address: String,
	#[serde(default)]
	pub on_enable: EnableBehavior,
	#[serde(default)]
	pub on_sign: SignBehavior,
	#[serde(default)]
	pub on_submit: SubmitBehavior,
	/// Number of vkey witnesses returned by `sign_tx`.
	#[serde(default = "default_witnesses")]
	pub witnesses: usize,
	/// Id returned by `submit_tx`; a counter-derived id when unset.
	#[serde(default)]
	pub tx_id: Option<String>,
}

fn default_name() -> String {
	"Mock Wallet".to_string()
}

fn default_network_id() -> u8 {
	1
}

fn default_witnesses() -> usize {
	2
}

impl Default for MockWalletConfig {
	fn default() -> Self {
		Self {
			name: default_name(),
			network_id: default_network_id(),
			utxos: Vec::new(),
			reward_addresses: Vec::new(),
			change_address: String::new(),
			on_enable: EnableBehavior::default(),
			on_sign: SignBehavior::default(),
			on_submit: SubmitBehavior::default(),
			witnesses: default_witnesses(),
			tx_id: None,
		}
	}
}

/// Calls observed by a mock wallet.
#[derive(Debug, Clone, Default)]
pub struct MockCalls {
	pub enable: usize,
	pub get_utxos: usize,
	/// `(tx_hex, partial_sign)` of every signing request.
	pub sign_requests: Vec<(String, bool)>,
	pub submitted: Vec<String>,
}

pub struct MockWallet {
	config: MockWalletConfig,
	calls: Arc<Mutex<MockCalls>>,
}

impl MockWallet {
	pub fn new(config: MockWalletConfig) -> Self {
		Self {
			config,
			calls: Arc::new(Mutex::new(MockCalls::default())),
		}
	}

	/// Snapshot of the calls made so far, through any enabled handle.
	pub async fn calls(&self) -> MockCalls {
		self.calls.lock().await.clone()
	}
}

#[async_trait]
impl WalletInterface for MockWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockWalletSchema)
	}

	fn display_name(&self) -> &str {
		&self.config.name
	}

	async fn enable(&self) -> Result<Arc<dyn WalletApi>, WalletError> {
		self.calls.lock().await.enable += 1;
		match self.config.on_enable {
			EnableBehavior::Approve => Ok(Arc::new(MockApi {
				config: self.config.clone(),
				calls: self.calls.clone(),
			})),
			EnableBehavior::Refuse => Err(WalletError::Api {
				code: ApiErrorCode::Refused,
				info: "user refused access".into(),
			}),
		}
	}
}

struct MockApi {
	config: MockWalletConfig,
	calls: Arc<Mutex<MockCalls>>,
}

#[async_trait]
impl WalletApi for MockApi {
	async fn get_network_id(&self) -> Result<u8, WalletError> {
		Ok(self.config.network_id)
	}

	async fn get_utxos(&self) -> Result<Vec<String>, WalletError> {
		self.calls.lock().await.get_utxos += 1;
		Ok(self.config.utxos.clone())
	}

	async fn get_reward_addresses(&self) -> Result<Vec<String>, WalletError> {
		Ok(self.config.reward_addresses.clone())
	}

	async fn get_change_address(&self) -> Result<String, WalletError> {
		Ok(self.config.change_address.clone())
	}

	async fn sign_tx(&self, tx_hex: &str, partial_sign: bool) -> Result<String, WalletError> {
		self.calls
			.lock()
			.await
			.sign_requests
			.push((tx_hex.to_string(), partial_sign));
		match self.config.on_sign {
			SignBehavior::Approve => vkey_witness_set(self.config.witnesses)
				.map(hex::encode)
				.map_err(|e| WalletError::Sign {
					code: SignErrorCode::ProofGeneration,
					info: e.to_string(),
				}),
			SignBehavior::Decline => Err(WalletError::Sign {
				code: SignErrorCode::UserDeclined,
				info: "user declined to sign".into(),
			}),
		}
	}

	async fn submit_tx(&self, signed_hex: &str) -> Result<String, WalletError> {
		if self.config.on_submit == SubmitBehavior::Reject {
			return Err(WalletError::Send {
				code: SendErrorCode::Failure,
				info: "transaction rejected by the node".into(),
			});
		}
		let mut calls = self.calls.lock().await;
		calls.submitted.push(signed_hex.to_string());
		Ok(self
			.config
			.tx_id
			.clone()
			.unwrap_or_else(|| format!("{:064x}", calls.submitted.len())))
	}
}

/// Configuration schema for [`MockWallet`].
pub struct MockWalletSchema;

impl MockWalletSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for MockWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let hex_string = |value: &toml::Value| match value.as_str() {
			Some(s) if hex::decode(s).is_ok() => Ok(()),
			_ => Err("must be a hex string".to_string()),
		};
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("name", FieldType::String),
				Field::new(
					"network_id",
					FieldType::Integer {
						min: Some(0),
						max: Some(15),
					},
				),
				Field::new("utxos", FieldType::Array(Box::new(FieldType::String))).with_validator(
					|value| {
						let all_hex = value
							.as_array()
							.map(|items| items.iter().all(|item| item.as_str().is_some_and(|s| hex::decode(s).is_ok())))
							.unwrap_or(false);
						if all_hex {
							Ok(())
						} else {
							Err("every UTXO must be hex CBOR".to_string())
						}
					},
				),
				Field::new(
					"reward_addresses",
					FieldType::Array(Box::new(FieldType::String)),
				),
				Field::new("change_address", FieldType::String).with_validator(hex_string),
				Field::new("on_enable", FieldType::OneOf(&["approve", "refuse"])),
				Field::new("on_sign", FieldType::OneOf(&["approve", "decline"])),
				Field::new("on_submit", FieldType::OneOf(&["accept", "reject"])),
				Field::new(
					"witnesses",
					FieldType::Integer {
						min: Some(0),
						max: Some(64),
					},
				),
				Field::new("tx_id", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Factory for mock wallets.
pub fn create_wallet(config: &toml::Value) -> Result<Box<dyn WalletInterface>, WalletError> {
	MockWalletSchema::validate_config(config)
		.map_err(|e| WalletError::Configuration(format!("Invalid mock wallet config: {}", e)))?;
	let config: MockWalletConfig = config
		.clone()
		.try_into()
		.map_err(|e| WalletError::Configuration(format!("Invalid mock wallet config: {}", e)))?;
	Ok(Box::new(MockWallet::new(config)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = WalletFactory;

	fn factory() -> Self::Factory {
		create_wallet
	}
}

impl WalletRegistry for Registry {}
