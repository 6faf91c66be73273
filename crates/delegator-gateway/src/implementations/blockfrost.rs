//! Blockfrost-compatible gateway.
//!
//! Works against Blockfrost itself or any proxy exposing the same routes.
//! Numeric fields are accepted as JSON numbers or decimal strings since
//! Blockfrost returns lovelace amounts as strings.

use crate::{GatewayError, GatewayFactory, GatewayInterface, GatewayRegistry};
use async_trait::async_trait;
use delegator_ledger::RewardAddress;
use delegator_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, ProtocolParameters, Schema,
	SecretString, ValidationError,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_MAX_TX_SIZE: u32 = 16_384;
const DEFAULT_MAX_VALUE_SIZE: u32 = 5_000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Longest slice of an error body carried into [`GatewayError::Status`].
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct BlockfrostConfig {
	/// e.g. `https://cardano-mainnet.blockfrost.io/api/v0`
	pub base_url: String,
	/// Sent as the `project_id` header. Proxies that inject it themselves
	/// leave this unset.
	#[serde(default)]
	pub project_id: Option<SecretString>,
	#[serde(default = "default_timeout")]
	pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
	DEFAULT_TIMEOUT_SECONDS
}

pub struct BlockfrostGateway {
	client: reqwest::Client,
	base_url: String,
	project_id: Option<SecretString>,
}

impl BlockfrostGateway {
	pub fn new(config: BlockfrostConfig) -> Result<Self, GatewayError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self {
			client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
			project_id: config.project_id,
		})
	}

	async fn get(&self, path: &str) -> Result<reqwest::Response, GatewayError> {
		let url = format!("{}{}", self.base_url, path);
		tracing::debug!(component = "gateway", url = %url, "GET");
		let mut request = self.client.get(&url);
		if let Some(project_id) = self.project_id.as_ref().filter(|p| !p.is_empty()) {
			request = request.header("project_id", project_id.expose_secret());
		}
		request
			.send()
			.await
			.map_err(|e| GatewayError::Network(e.to_string()))
	}
}

async fn status_error(response: reqwest::Response) -> GatewayError {
	let status = response.status().as_u16();
	let mut message = response.text().await.unwrap_or_default();
	if let Some((cut, _)) = message.char_indices().nth(ERROR_BODY_LIMIT) {
		message.truncate(cut);
	}
	GatewayError::Status { status, message }
}

async fn read_json(response: reqwest::Response) -> Result<Value, GatewayError> {
	response
		.json()
		.await
		.map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Reads the first present field among `names` as an unsigned integer.
fn number(object: &Value, names: &[&str]) -> Result<Option<u64>, GatewayError> {
	for name in names {
		match object.get(*name) {
			None | Some(Value::Null) => continue,
			Some(Value::Number(n)) => {
				return n.as_u64().map(Some).ok_or_else(|| {
					GatewayError::Decode(format!("{} is not an unsigned integer: {}", name, n))
				})
			},
			Some(Value::String(s)) => {
				return s.trim().parse::<u64>().map(Some).map_err(|_| {
					GatewayError::Decode(format!("{} is not an unsigned integer: {:?}", name, s))
				})
			},
			Some(other) => {
				return Err(GatewayError::Decode(format!(
					"{} has unexpected type: {}",
					name, other
				)))
			},
		}
	}
	Ok(None)
}

fn required(object: &Value, names: &[&str]) -> Result<u64, GatewayError> {
	number(object, names)?
		.ok_or_else(|| GatewayError::Decode(format!("missing field {}", names[0])))
}

fn size(object: &Value, names: &[&str], default: u32) -> Result<u32, GatewayError> {
	match number(object, names)? {
		Some(n) => u32::try_from(n)
			.map_err(|_| GatewayError::Decode(format!("{} out of range: {}", names[0], n))),
		None => Ok(default),
	}
}

/// Interprets an `/epochs/latest/parameters` document.
///
/// Snake-case Blockfrost names are read first, camelCase names second. The
/// per-byte UTXO cost falls back to the pre-Babbage per-word cost divided by
/// eight, then to zero.
pub fn parse_parameters(object: &Value) -> Result<ProtocolParameters, GatewayError> {
	if !object.is_object() {
		return Err(GatewayError::Decode("parameters must be a JSON object".into()));
	}
	let coins_per_utxo_byte = match number(
		object,
		&["coins_per_utxo_size", "coins_per_utxo_byte", "coinsPerUtxoByte"],
	)? {
		Some(per_byte) => per_byte,
		None => number(object, &["coins_per_utxo_word", "coinsPerUtxoWord"])?
			.map(|per_word| per_word / 8)
			.unwrap_or(0),
	};

	Ok(ProtocolParameters {
		min_fee_a: required(object, &["min_fee_a", "minFeeA"])?,
		min_fee_b: required(object, &["min_fee_b", "minFeeB"])?,
		coins_per_utxo_byte,
		pool_deposit: required(object, &["pool_deposit", "poolDeposit"])?,
		key_deposit: required(object, &["key_deposit", "keyDeposit"])?,
		max_tx_size: size(object, &["max_tx_size", "maxTxSize"], DEFAULT_MAX_TX_SIZE)?,
		max_value_size: size(
			object,
			&["max_val_size", "max_value_size", "maxValueSize"],
			DEFAULT_MAX_VALUE_SIZE,
		)?,
	})
}

#[async_trait]
impl GatewayInterface for BlockfrostGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BlockfrostSchema)
	}

	async fn fetch_current(&self) -> Result<ProtocolParameters, GatewayError> {
		let response = self.get("/epochs/latest/parameters").await?;
		if !response.status().is_success() {
			return Err(status_error(response).await);
		}
		parse_parameters(&read_json(response).await?)
	}

	async fn is_stake_registered(&self, reward: &RewardAddress) -> Result<bool, GatewayError> {
		let stake = reward
			.to_bech32()
			.map_err(|e| GatewayError::Decode(e.to_string()))?;
		let response = self.get(&format!("/accounts/{}", stake)).await?;
		// Accounts that never appeared on chain are unknown to the indexer.
		if response.status() == StatusCode::NOT_FOUND {
			return Ok(false);
		}
		if !response.status().is_success() {
			return Err(status_error(response).await);
		}
		let account = read_json(response).await?;
		account
			.get("active")
			.and_then(Value::as_bool)
			.ok_or_else(|| GatewayError::Decode("account has no boolean 'active' field".into()))
	}
}

/// Configuration schema for [`BlockfrostGateway`].
pub struct BlockfrostSchema;

impl BlockfrostSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for BlockfrostSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("base_url must be an http(s) URL".to_string()),
				}
			})],
			vec![
				Field::new("project_id", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Blockfrost gateway from configuration.
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	BlockfrostSchema::validate_config(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;
	let config: BlockfrostConfig = config
		.clone()
		.try_into()
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;
	Ok(Box::new(BlockfrostGateway::new(config)?))
}

/// Registry for the Blockfrost gateway implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "blockfrost";
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
	use serde_json::json;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;
	use tokio::task::JoinHandle;

	/// Answers one HTTP request with a canned response and yields the
	/// request head it received.
	async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let base_url = format!("http://{}", listener.local_addr().unwrap());
		let handle = tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut request = Vec::new();
			let mut buf = [0u8; 1024];
			while !request.windows(4).any(|w| w == b"\r\n\r\n") {
				let n = socket.read(&mut buf).await.unwrap();
				if n == 0 {
					break;
				}
				request.extend_from_slice(&buf[..n]);
			}
			let response = format!(
				"HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
				status,
				body.len(),
				body
			);
			socket.write_all(response.as_bytes()).await.unwrap();
			socket.shutdown().await.unwrap();
			String::from_utf8_lossy(&request).to_string()
		});
		(base_url, handle)
	}

	fn gateway(base_url: &str, project_id: Option<&str>) -> BlockfrostGateway {
		BlockfrostGateway::new(BlockfrostConfig {
			base_url: base_url.to_string(),
			project_id: project_id.map(SecretString::from),
			timeout_seconds: 5,
		})
		.unwrap()
	}

	fn reward() -> RewardAddress {
		RewardAddress {
			network_id: 1,
			credential: StakeCredential::KeyHash(Hash28::new([0x11; 28])),
		}
	}

	#[test]
	fn test_parse_blockfrost_document() {
		let params = parse_parameters(&json!({
			"epoch": 500,
			"min_fee_a": 44,
			"min_fee_b": 155381,
			"max_tx_size": 16384,
			"max_val_size": "5000",
			"key_deposit": "2000000",
			"pool_deposit": "500000000",
			"coins_per_utxo_size": "4310",
			"coins_per_utxo_word": "34482"
		}))
		.unwrap();
		assert_eq!(params.min_fee_a, 44);
		assert_eq!(params.min_fee_b, 155_381);
		assert_eq!(params.coins_per_utxo_byte, 4_310);
		assert_eq!(params.key_deposit, 2_000_000);
		assert_eq!(params.pool_deposit, 500_000_000);
		assert_eq!(params.max_value_size, 5_000);
	}

	#[test]
	fn test_parse_camel_case_with_fallbacks() {
		let params = parse_parameters(&json!({
			"minFeeA": "44",
			"minFeeB": "155381",
			"poolDeposit": 500000000,
			"keyDeposit": 2000000,
			"coinsPerUtxoWord": 34482
		}))
		.unwrap();
		assert_eq!(params.coins_per_utxo_byte, 34_482 / 8);
		assert_eq!(params.max_tx_size, DEFAULT_MAX_TX_SIZE);
		assert_eq!(params.max_value_size, DEFAULT_MAX_VALUE_SIZE);

		let no_utxo_cost = parse_parameters(&json!({
			"min_fee_a": 1,
			"min_fee_b": 2,
			"pool_deposit": 3,
			"key_deposit": 4
		}))
		.unwrap();
		assert_eq!(no_utxo_cost.coins_per_utxo_byte, 0);
	}

	#[test]
	fn test_parse_rejects_bad_documents() {
		assert!(parse_parameters(&json!([])).is_err());
		assert!(parse_parameters(&json!({"min_fee_a": 44})).is_err());
		let negative = json!({
			"min_fee_a": -1,
			"min_fee_b": 2,
			"pool_deposit": 3,
			"key_deposit": 4
		});
		assert!(matches!(
			parse_parameters(&negative),
			Err(GatewayError::Decode(_))
		));
	}

	#[test]
	fn test_factory_validates_table() {
		let missing: toml::Value = toml::from_str("project_id = \"abc\"").unwrap();
		assert!(create_gateway(&missing).is_err());
		let bad_url: toml::Value = toml::from_str("base_url = \"ftp://x\"").unwrap();
		assert!(create_gateway(&bad_url).is_err());
		let ok: toml::Value =
			toml::from_str("base_url = \"https://cardano-mainnet.blockfrost.io/api/v0\"").unwrap();
		assert!(create_gateway(&ok).is_ok());
	}

	#[tokio::test]
	async fn test_fetch_current_sends_project_id() {
		let (base_url, server) = serve_once(
			"200 OK",
			r#"{"min_fee_a":44,"min_fee_b":155381,"key_deposit":"2000000","pool_deposit":"500000000","coins_per_utxo_size":"4310"}"#,
		)
		.await;
		let params = gateway(&base_url, Some("mainnetXYZ"))
			.fetch_current()
			.await
			.unwrap();
		assert_eq!(params.coins_per_utxo_byte, 4_310);

		let request = server.await.unwrap();
		assert!(request.starts_with("GET /epochs/latest/parameters "));
		assert!(request.to_lowercase().contains("project_id: mainnetxyz"));
	}

	#[tokio::test]
	async fn test_fetch_current_reports_status() {
		let (base_url, _server) =
			serve_once("403 Forbidden", r#"{"error":"Forbidden","status_code":403}"#).await;
		let err = gateway(&base_url, None).fetch_current().await.unwrap_err();
		assert_eq!(err.status(), Some(403));
	}

	#[tokio::test]
	async fn test_unknown_account_is_unregistered() {
		let (base_url, server) = serve_once("404 Not Found", r#"{"status_code":404}"#).await;
		assert!(!gateway(&base_url, None)
			.is_stake_registered(&reward())
			.await
			.unwrap());
		let request = server.await.unwrap();
		assert!(request.starts_with("GET /accounts/stake1u"));
	}

	#[tokio::test]
	async fn test_active_account_is_registered() {
		let (base_url, _server) =
			serve_once("200 OK", r#"{"active":true,"controlled_amount":"0"}"#).await;
		assert!(gateway(&base_url, None)
			.is_stake_registered(&reward())
			.await
			.unwrap());
	}
}
