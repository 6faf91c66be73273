//! Configuration module for the delegation transaction builder.
//!
//! Configuration is read from TOML. Values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`, which keeps gateway project
//! ids out of the file itself.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["gateway.toml", "wallets.toml"]` to include other files
//! - Each top-level section must be unique across all files

mod loader;

pub use loader::ConfigLoader;

use delegator_ledger::{decode_drep_id, decode_pool_id};
use delegator_types::{IdentifierKind, Network};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Wallet names tried, in order, when neither an explicit choice nor a
/// remembered one is available.
pub const DEFAULT_WALLET_PRIORITY: [&str; 7] = [
	"eternl",
	"nami",
	"lace",
	"yoroi",
	"gerowallet",
	"nufi",
	"typhoncip30",
];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub delegator: DelegatorConfig,
	/// Chain-data gateway used for protocol parameters and account lookups.
	pub gateway: GatewayConfig,
	/// Wallet providers present in this host environment.
	pub wallet: WalletConfig,
	/// Bech32 identifiers offered as delegation targets.
	#[serde(default)]
	pub targets: TargetsConfig,
	#[serde(default)]
	pub delegation: DelegationConfig,
}

/// Identity of this builder instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelegatorConfig {
	/// Instance id used in log lines.
	pub id: String,
	#[serde(default)]
	pub network: Network,
}

/// Gateway selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Which implementation serves requests.
	pub primary: String,
	/// Implementation name to its raw TOML table.
	pub implementations: HashMap<String, toml::Value>,
}

/// Wallet discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Fallback order applied after the preferred and last-used wallet.
	#[serde(default = "default_wallet_priority")]
	pub priority: Vec<String>,
	/// Where the last-used wallet name is remembered. In memory when unset.
	#[serde(default)]
	pub preferences_path: Option<PathBuf>,
	/// Provider key to its table. Every table names its `implementation`.
	pub providers: BTreeMap<String, toml::Value>,
}

fn default_wallet_priority() -> Vec<String> {
	DEFAULT_WALLET_PRIORITY.iter().map(|s| s.to_string()).collect()
}

/// Configured pool and DRep identifiers.
///
/// Every entry is decoded when the configuration loads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetsConfig {
	#[serde(default)]
	pub pools: Vec<String>,
	#[serde(default)]
	pub dreps: Vec<String>,
}

impl TargetsConfig {
	/// Configured identifiers of the given kind, in file order.
	pub fn of_kind(&self, kind: IdentifierKind) -> &[String] {
		match kind {
			IdentifierKind::Pool => &self.pools,
			IdentifierKind::DRep => &self.dreps,
		}
	}

	/// The first configured identifier of the given kind.
	pub fn default_for(&self, kind: IdentifierKind) -> Option<&str> {
		self.of_kind(kind).first().map(String::as_str)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for id in &self.pools {
			decode_pool_id(id)
				.map_err(|e| ConfigError::Validation(format!("targets.pools '{}': {}", id, e)))?;
		}
		for id in &self.dreps {
			decode_drep_id(id)
				.map_err(|e| ConfigError::Validation(format!("targets.dreps '{}': {}", id, e)))?;
		}
		Ok(())
	}
}

/// Whether a delegation certificate also registers the stake credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeRegistration {
	/// Ask the gateway whether the reward account is registered.
	#[default]
	Auto,
	/// Always pay the key deposit.
	Always,
	/// Assume the reward account is already registered.
	Never,
}

/// Transaction building behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelegationConfig {
	#[serde(default)]
	pub stake_registration: StakeRegistration,
	/// Passed as `partialSign` to the wallet's `signTx`.
	#[serde(default = "default_partial_sign")]
	pub partial_sign: bool,
}

impl Default for DelegationConfig {
	fn default() -> Self {
		Self {
			stake_registration: StakeRegistration::default(),
			partial_sign: default_partial_sign(),
		}
	}
}

fn default_partial_sign() -> bool {
	true
}

/// Resolves `${VAR}` and `${VAR:-default}` references.
///
/// Input is limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		resolved.push_str(&input[last..whole.start()]);
		resolved.push_str(&value);
		last = whole.end();
	}
	resolved.push_str(&input[last..]);

	Ok(resolved)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Checks cross-field rules serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.delegator.id.trim().is_empty() {
			return Err(ConfigError::Validation("Delegator ID cannot be empty".into()));
		}

		if self.gateway.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one gateway implementation must be configured".into(),
			));
		}
		if self.gateway.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Gateway primary implementation cannot be empty".into(),
			));
		}
		if !self
			.gateway
			.implementations
			.contains_key(&self.gateway.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary gateway '{}' not found in implementations",
				self.gateway.primary
			)));
		}

		if self.wallet.providers.is_empty() {
			return Err(ConfigError::Validation(
				"At least one wallet provider must be configured".into(),
			));
		}
		for (name, table) in &self.wallet.providers {
			if name.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Wallet provider names cannot be empty".into(),
				));
			}
			match table.get("implementation").and_then(|v| v.as_str()) {
				Some(implementation) if !implementation.is_empty() => {},
				_ => {
					return Err(ConfigError::Validation(format!(
						"Wallet provider '{}' must name its implementation",
						name
					)))
				},
			}
		}
		if self.wallet.priority.iter().any(|p| p.trim().is_empty()) {
			return Err(ConfigError::Validation(
				"Wallet priority entries cannot be empty".into(),
			));
		}

		self.targets.validate()
	}

	/// Configuration of the primary gateway implementation.
	pub fn primary_gateway(&self) -> Option<&toml::Value> {
		self.gateway.implementations.get(&self.gateway.primary)
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
