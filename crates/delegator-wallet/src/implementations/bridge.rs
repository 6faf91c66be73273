//! CIP-30 wallet reached through an HTTP bridge.
//!
//! The bridge is a small page or extension host that owns the browser's
//! `window.cardano` object and relays calls. Every call is a JSON POST of
//! `{"wallet", "method", "params"}` answered by either `{"result": ...}` or
//! `{"error": {"code", "info"}}` carrying the CIP-30 error verbatim.

use crate::{
	ApiErrorCode, WalletApi, WalletError, WalletFactory, WalletInterface, WalletRegistry,
};
use async_trait::async_trait;
use delegator_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString,
	ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeWalletConfig {
	/// URL the bridge listens on.
	pub endpoint: String,
	/// Key of the wallet under `window.cardano`.
	pub wallet: String,
	#[serde(default)]
	pub name: Option<String>,
	/// Signing prompts wait on the user, so this is generous.
	#[serde(default = "default_timeout")]
	pub timeout_seconds: u64,
	#[serde(default)]
	pub token: Option<SecretString>,
}

fn default_timeout() -> u64 {
	DEFAULT_TIMEOUT_SECONDS
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
	wallet: &'a str,
	method: &'a str,
	params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BridgeErrorBody {
	code: i64,
	#[serde(default)]
	info: String,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<BridgeErrorBody>,
}

impl BridgeResponse {
	fn into_result(self, method: &str) -> Result<Value, WalletError> {
		if let Some(error) = self.error {
			return Err(WalletError::from_cip30(method, error.code, error.info));
		}
		// `undefined` results are dropped by JSON serialisation.
		Ok(self.result.unwrap_or(Value::Null))
	}
}

/// HTTP connection shared by the provider and its enabled handles.
#[derive(Clone)]
struct BridgeClient {
	http: reqwest::Client,
	endpoint: String,
	wallet: String,
	token: Option<SecretString>,
}

impl BridgeClient {
	async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, WalletError> {
		tracing::debug!(component = "wallet", wallet = %self.wallet, method, "Calling wallet bridge");

		let mut request = self.http.post(&self.endpoint).json(&BridgeRequest {
			wallet: &self.wallet,
			method,
			params,
		});
		if let Some(token) = &self.token {
			request = request.bearer_auth(token.expose_secret());
		}

		let response = request
			.send()
			.await
			.map_err(|e| WalletError::Transport(format!("{} request failed: {}", method, e)))?;
		let status = response.status();
		let body: BridgeResponse = response.json().await.map_err(|e| {
			WalletError::Transport(format!("{} returned HTTP {} with unreadable body: {}", method, status, e))
		})?;
		body.into_result(method)
	}

	async fn call_string(&self, method: &str, params: Vec<Value>) -> Result<String, WalletError> {
		let value = self.call(method, params).await?;
		as_string(method, value)
	}
}

fn as_string(method: &str, value: Value) -> Result<String, WalletError> {
	match value {
		Value::String(s) => Ok(s),
		other => Err(unexpected(method, "a string", &other)),
	}
}

fn as_string_list(method: &str, value: Value) -> Result<Vec<String>, WalletError> {
	match value {
		Value::Null => Ok(Vec::new()),
		Value::Array(items) => items.into_iter().map(|item| as_string(method, item)).collect(),
		other => Err(unexpected(method, "an array of strings", &other)),
	}
}

fn unexpected(method: &str, expected: &str, value: &Value) -> WalletError {
	WalletError::Api {
		code: ApiErrorCode::InternalError,
		info: format!("{} returned {} instead of {}", method, value, expected),
	}
}

pub struct BridgeWallet {
	name: String,
	client: BridgeClient,
}

impl BridgeWallet {
	pub fn new(config: BridgeWalletConfig) -> Result<Self, WalletError> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| WalletError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self {
			name: config.name.unwrap_or_else(|| config.wallet.clone()),
			client: BridgeClient {
				http,
				endpoint: config.endpoint,
				wallet: config.wallet,
				token: config.token,
			},
		})
	}
}

#[async_trait]
impl WalletInterface for BridgeWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BridgeWalletSchema)
	}

	fn display_name(&self) -> &str {
		&self.name
	}

	async fn enable(&self) -> Result<Arc<dyn WalletApi>, WalletError> {
		self.client.call("enable", Vec::new()).await?;
		tracing::info!(component = "wallet", wallet = %self.client.wallet, "Wallet enabled");
		Ok(Arc::new(BridgeApi {
			client: self.client.clone(),
		}))
	}
}

struct BridgeApi {
	client: BridgeClient,
}

#[async_trait]
impl WalletApi for BridgeApi {
	async fn get_network_id(&self) -> Result<u8, WalletError> {
		let value = self.client.call("getNetworkId", Vec::new()).await?;
		value
			.as_u64()
			.and_then(|id| u8::try_from(id).ok())
			.ok_or_else(|| unexpected("getNetworkId", "a network id", &value))
	}

	async fn get_utxos(&self) -> Result<Vec<String>, WalletError> {
		let value = self.client.call("getUtxos", Vec::new()).await?;
		as_string_list("getUtxos", value)
	}

	async fn get_reward_addresses(&self) -> Result<Vec<String>, WalletError> {
		let value = self.client.call("getRewardAddresses", Vec::new()).await?;
		as_string_list("getRewardAddresses", value)
	}

	async fn get_change_address(&self) -> Result<String, WalletError> {
		self.client.call_string("getChangeAddress", Vec::new()).await
	}

	async fn sign_tx(&self, tx_hex: &str, partial_sign: bool) -> Result<String, WalletError> {
		self.client
			.call_string("signTx", vec![json!(tx_hex), json!(partial_sign)])
			.await
	}

	async fn submit_tx(&self, signed_hex: &str) -> Result<String, WalletError> {
		self.client
			.call_string("submitTx", vec![json!(signed_hex)])
			.await
	}
}

/// Configuration schema for [`BridgeWallet`].
pub struct BridgeWalletSchema;

impl BridgeWalletSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for BridgeWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("endpoint", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("endpoint must be an http(s) URL".to_string()),
					}
				}),
				Field::new("wallet", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("wallet key cannot be empty".to_string()),
					}
				}),
			],
			vec![
				Field::new("name", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
				Field::new("token", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Factory for bridge wallets.
pub fn create_wallet(config: &toml::Value) -> Result<Box<dyn WalletInterface>, WalletError> {
	BridgeWalletSchema::validate_config(config)
		.map_err(|e| WalletError::Configuration(format!("Invalid bridge wallet config: {}", e)))?;
	let config: BridgeWalletConfig = config
		.clone()
		.try_into()
		.map_err(|e| WalletError::Configuration(format!("Invalid bridge wallet config: {}", e)))?;
	Ok(Box::new(BridgeWallet::new(config)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "bridge";
	type Factory = WalletFactory;

	fn factory() -> Self::Factory {
		create_wallet
	}
}

impl WalletRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{SendErrorCode, SignErrorCode};

	fn response(text: &str) -> BridgeResponse {
		serde_json::from_str(text).unwrap()
	}

	#[test]
	fn test_factory_accepts_minimal_table() {
		let config: toml::Value = toml::from_str(
			r#"
			implementation = "bridge"
			endpoint = "http://127.0.0.1:7070/cip30"
			wallet = "eternl"
			"#,
		)
		.unwrap();
		let wallet = create_wallet(&config).unwrap();
		assert_eq!(wallet.display_name(), "eternl");
	}

	#[test]
	fn test_factory_rejects_bad_tables() {
		let no_wallet: toml::Value = toml::from_str("endpoint = \"http://localhost\"").unwrap();
		assert!(create_wallet(&no_wallet).is_err());

		let bad_url: toml::Value =
			toml::from_str("endpoint = \"localhost\"\nwallet = \"nami\"").unwrap();
		assert!(create_wallet(&bad_url).is_err());

		let zero_timeout: toml::Value = toml::from_str(
			"endpoint = \"http://localhost\"\nwallet = \"nami\"\ntimeout_seconds = 0",
		)
		.unwrap();
		assert!(create_wallet(&zero_timeout).is_err());
	}

	#[test]
	fn test_token_is_not_debug_printed() {
		let config: BridgeWalletConfig = toml::from_str(
			r#"
			endpoint = "https://bridge.local"
			wallet = "lace"
			token = "s3cr3t"
			"#,
		)
		.unwrap();
		assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
		assert!(!format!("{:?}", config).contains("s3cr3t"));
	}

	#[test]
	fn test_error_bodies_map_to_cip30_families() {
		let declined = response(r#"{"error": {"code": 2, "info": "user declined"}}"#);
		assert!(matches!(
			declined.into_result("signTx"),
			Err(WalletError::Sign {
				code: SignErrorCode::UserDeclined,
				..
			})
		));

		let failed = response(r#"{"error": {"code": 2, "info": "bad inputs"}}"#);
		assert!(matches!(
			failed.into_result("submitTx"),
			Err(WalletError::Send {
				code: SendErrorCode::Failure,
				..
			})
		));

		let refused = response(r#"{"error": {"code": -3}}"#);
		assert!(matches!(
			refused.into_result("enable"),
			Err(WalletError::Api {
				code: ApiErrorCode::Refused,
				..
			})
		));
	}

	#[test]
	fn test_missing_result_reads_as_null() {
		let value = response("{}").into_result("getUtxos").unwrap();
		assert!(as_string_list("getUtxos", value).unwrap().is_empty());
		let value = response("{}").into_result("getChangeAddress").unwrap();
		assert!(as_string("getChangeAddress", value).is_err());
	}

	#[test]
	fn test_result_shapes() {
		assert_eq!(
			as_string_list("getUtxos", json!(["8200", "8201"])).unwrap(),
			vec!["8200", "8201"]
		);
		assert!(as_string_list("getUtxos", Value::Null).unwrap().is_empty());
		assert!(as_string_list("getUtxos", json!([1])).is_err());
		assert!(as_string("getChangeAddress", json!(7)).is_err());
	}
}
