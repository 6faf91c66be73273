//! Cardano ledger encodings used by the delegation builder.
//!
//! Everything in this crate is pure: raw address bytes to structured
//! addresses and back, bech32 pool and DRep identifiers, the CBOR shapes of
//! wallet UTXOs, transaction bodies, certificates and witness sets.

use thiserror::Error;

pub mod address;
pub mod cbor;
pub mod identifier;
pub mod signed;
pub mod utxo;

pub use address::{
	decode_change_address, decode_reward, decode_reward_address, encode_reward, Address,
	PaymentCredential, RewardAddress,
};
pub use cbor::{
	encode_certificate, encode_transaction, encode_value, vkey_witness_set, TransactionBody,
	TransactionOutput, WitnessAllowance,
};
pub use identifier::{
	decode_bech32_identifier, decode_drep_id, decode_pool_id, encode_drep_id, encode_pool_id,
};
pub use signed::attach_witnesses;
pub use utxo::UnspentOutput;

/// Errors raised while decoding or encoding ledger data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
	#[error("Invalid reward address: {0}")]
	InvalidRewardAddress(String),
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("Invalid identifier: {0}")]
	InvalidIdentifier(String),
	#[error("Invalid UTXO: {0}")]
	InvalidUtxo(String),
	#[error("Invalid signed transaction: {0}")]
	InvalidWitness(String),
	#[error("Encoding error: {0}")]
	Encode(String),
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for LedgerError {
	fn from(err: minicbor::encode::Error<std::convert::Infallible>) -> Self {
		LedgerError::Encode(err.to_string())
	}
}

/// Decodes hex text from a wallet, tolerating a `0x` prefix.
pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
	hex::decode(delegator_types::without_0x_prefix(text.trim()))
}
