//! Wallet connection module for the delegation builder.
//!
//! A wallet provider is something the host environment exposes under a key
//! (`eternl`, `nami`, ...). Enabling it yields the CIP-30 capability surface
//! used to read UTXOs and addresses, request a signature and submit. The
//! builder never holds signing keys; everything that needs a key goes
//! through [`WalletApi`].

use async_trait::async_trait;
use delegator_types::{ConfigSchema, ImplementationRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod bridge;
	pub mod mock;
}
pub mod preferences;
pub mod providers;

pub use preferences::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use providers::WalletProviderRegistry;

/// CIP-30 `APIError` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorCode {
	InvalidRequest,
	InternalError,
	Refused,
	AccountChange,
}

impl ApiErrorCode {
	pub fn from_code(code: i64) -> Option<Self> {
		match code {
			-1 => Some(ApiErrorCode::InvalidRequest),
			-2 => Some(ApiErrorCode::InternalError),
			-3 => Some(ApiErrorCode::Refused),
			-4 => Some(ApiErrorCode::AccountChange),
			_ => None,
		}
	}
}

/// CIP-30 `TxSignError` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignErrorCode {
	ProofGeneration,
	UserDeclined,
}

impl SignErrorCode {
	pub fn from_code(code: i64) -> Option<Self> {
		match code {
			1 => Some(SignErrorCode::ProofGeneration),
			2 => Some(SignErrorCode::UserDeclined),
			_ => None,
		}
	}
}

/// CIP-30 `TxSendError` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendErrorCode {
	Refused,
	Failure,
}

impl SendErrorCode {
	pub fn from_code(code: i64) -> Option<Self> {
		match code {
			1 => Some(SendErrorCode::Refused),
			2 => Some(SendErrorCode::Failure),
			_ => None,
		}
	}
}

/// Errors raised by wallet providers and their capability surface.
#[derive(Debug, Error)]
pub enum WalletError {
	#[error("Wallet API error ({code:?}): {info}")]
	Api { code: ApiErrorCode, info: String },
	#[error("Signing error ({code:?}): {info}")]
	Sign { code: SignErrorCode, info: String },
	#[error("Submission error ({code:?}): {info}")]
	Send { code: SendErrorCode, info: String },
	#[error("No wallet found")]
	NoWalletFound,
	#[error("Transport error: {0}")]
	Transport(String),
	#[error("Preference store error: {0}")]
	Preferences(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl WalletError {
	/// Maps a raw CIP-30 error to the family the called method can raise.
	///
	/// Negative codes are always `APIError`. Positive codes belong to
	/// `TxSignError` for `signTx` and to `TxSendError` for `submitTx`.
	pub fn from_cip30(method: &str, code: i64, info: String) -> Self {
		if let Some(code) = ApiErrorCode::from_code(code) {
			return WalletError::Api { code, info };
		}
		let classified = match method {
			"signTx" => SignErrorCode::from_code(code).map(|code| WalletError::Sign {
				code,
				info: info.clone(),
			}),
			"submitTx" => SendErrorCode::from_code(code).map(|code| WalletError::Send {
				code,
				info: info.clone(),
			}),
			_ => None,
		};
		classified.unwrap_or(WalletError::Api {
			code: ApiErrorCode::InternalError,
			info: format!("{} failed with code {}: {}", method, code, info),
		})
	}
}

/// The capability surface of an enabled wallet.
///
/// Hex strings are exchanged exactly as CIP-30 defines them: UTXOs are CBOR
/// `[input, output]`, addresses are raw bytes, transactions are CBOR.
#[async_trait]
pub trait WalletApi: Send + Sync {
	async fn get_network_id(&self) -> Result<u8, WalletError>;

	async fn get_utxos(&self) -> Result<Vec<String>, WalletError>;

	async fn get_reward_addresses(&self) -> Result<Vec<String>, WalletError>;

	async fn get_change_address(&self) -> Result<String, WalletError>;

	/// Asks the user to sign. Returns a witness set, or with some wallets
	/// the whole signed transaction.
	async fn sign_tx(&self, tx_hex: &str, partial_sign: bool) -> Result<String, WalletError>;

	/// Returns the transaction id reported by the wallet.
	async fn submit_tx(&self, signed_hex: &str) -> Result<String, WalletError>;
}

/// A wallet provider installed in the host environment.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	/// Schema of the provider's configuration table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Human readable wallet name.
	fn display_name(&self) -> &str;

	/// Requests access. May prompt the user; refusal is `APIError::Refused`.
	async fn enable(&self) -> Result<Arc<dyn WalletApi>, WalletError>;
}

/// Factory signature every wallet implementation provides.
pub type WalletFactory = fn(&toml::Value) -> Result<Box<dyn WalletInterface>, WalletError>;

/// Registry trait for wallet implementations.
pub trait WalletRegistry: ImplementationRegistry<Factory = WalletFactory> {}

/// All wallet implementations, by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::{bridge, mock};

	vec![
		(bridge::Registry::NAME, bridge::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}
