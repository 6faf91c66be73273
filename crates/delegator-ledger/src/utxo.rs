//! Wallet UTXO decoding.
//!
//! `getUtxos` returns hex CBOR of `[input, output]` pairs. Only the input
//! reference, address and value are read; datums and script references are
//! skipped. Both the legacy array output and the post-Alonzo map output are
//! accepted, with definite or indefinite lengths.

use crate::cbor::TransactionOutput;
use crate::{decode_hex, LedgerError};
use delegator_types::{Hash28, Hash32, Lovelace, MultiAsset, TransactionInput, Value};
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use std::collections::BTreeMap;

const OUTPUT_ADDRESS: u64 = 0;
const OUTPUT_VALUE: u64 = 1;

/// A spendable output offered by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
	/// The wallet's CBOR blob.
	pub raw: Vec<u8>,
	pub input: TransactionInput,
	/// Raw address bytes of the output.
	pub address: Vec<u8>,
	pub value: Value,
}

impl UnspentOutput {
	pub fn coin(&self) -> Lovelace {
		self.value.coin
	}

	/// Builds the `[input, [address, value]]` blob a wallet would return.
	pub fn new(input: TransactionInput, address: Vec<u8>, value: Value) -> Result<Self, LedgerError> {
		let output = TransactionOutput { address, value }.to_cbor()?;
		let mut e = Encoder::new(Vec::new());
		e.array(2)?
			.array(2)?
			.bytes(input.tx_hash.as_bytes())?
			.u64(input.index)?;
		let mut raw = e.into_writer();
		raw.extend_from_slice(&output);
		Self::from_cbor(raw)
	}

	pub fn to_hex(&self) -> String {
		hex::encode(&self.raw)
	}

	pub fn from_hex(text: &str) -> Result<Self, LedgerError> {
		let raw = decode_hex(text).map_err(|e| LedgerError::InvalidUtxo(e.to_string()))?;
		Self::from_cbor(raw)
	}

	pub fn from_cbor(raw: Vec<u8>) -> Result<Self, LedgerError> {
		let (input, address, value) = {
			let mut d = Decoder::new(&raw);
			let outer = d.array().map_err(invalid)?;
			if let Some(len) = outer {
				if len != 2 {
					return Err(LedgerError::InvalidUtxo(format!(
						"expected [input, output], got {} elements",
						len
					)));
				}
			}
			let input = decode_input(&mut d)?;
			let (address, value) = decode_output(&mut d)?;
			(input, address, value)
		};
		Ok(Self {
			raw,
			input,
			address,
			value,
		})
	}
}

fn invalid(err: impl std::fmt::Display) -> LedgerError {
	LedgerError::InvalidUtxo(err.to_string())
}

/// Visits each element of a container whose length may be indefinite.
fn each<'b, F>(d: &mut Decoder<'b>, len: Option<u64>, mut visit: F) -> Result<(), LedgerError>
where
	F: FnMut(&mut Decoder<'b>) -> Result<(), LedgerError>,
{
	match len {
		Some(n) => {
			for _ in 0..n {
				visit(d)?;
			}
		},
		None => loop {
			if d.datatype().map_err(invalid)? == Type::Break {
				d.set_position(d.position() + 1);
				break;
			}
			visit(d)?;
		},
	}
	Ok(())
}

fn decode_input(d: &mut Decoder<'_>) -> Result<TransactionInput, LedgerError> {
	let len = d.array().map_err(invalid)?;
	let tx_hash = Hash32::try_from(d.bytes().map_err(invalid)?).map_err(invalid)?;
	let index = d.u64().map_err(invalid)?;
	if len.is_none() {
		if d.datatype().map_err(invalid)? != Type::Break {
			return Err(LedgerError::InvalidUtxo("input has trailing fields".into()));
		}
		d.set_position(d.position() + 1);
	}
	Ok(TransactionInput { tx_hash, index })
}

fn decode_output(d: &mut Decoder<'_>) -> Result<(Vec<u8>, Value), LedgerError> {
	let mut address = None;
	let mut value = None;

	match d.datatype().map_err(invalid)? {
		Type::Array | Type::ArrayIndef => {
			let len = d.array().map_err(invalid)?;
			let mut position = 0usize;
			each(d, len, |d| {
				match position {
					0 => address = Some(d.bytes().map_err(invalid)?.to_vec()),
					1 => value = Some(decode_value(d)?),
					_ => d.skip().map_err(invalid)?,
				}
				position += 1;
				Ok(())
			})?;
		},
		Type::Map | Type::MapIndef => {
			let len = d.map().map_err(invalid)?;
			each(d, len, |d| {
				match d.u64().map_err(invalid)? {
					OUTPUT_ADDRESS => address = Some(d.bytes().map_err(invalid)?.to_vec()),
					OUTPUT_VALUE => value = Some(decode_value(d)?),
					_ => d.skip().map_err(invalid)?,
				}
				Ok(())
			})?;
		},
		other => {
			return Err(LedgerError::InvalidUtxo(format!(
				"output must be an array or map, got {}",
				other
			)))
		},
	}

	match (address, value) {
		(Some(address), Some(value)) => Ok((address, value)),
		(None, _) => Err(LedgerError::InvalidUtxo("output has no address".into())),
		(_, None) => Err(LedgerError::InvalidUtxo("output has no value".into())),
	}
}

fn decode_value(d: &mut Decoder<'_>) -> Result<Value, LedgerError> {
	match d.datatype().map_err(invalid)? {
		Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::coin(d.u64().map_err(invalid)?)),
		Type::Array | Type::ArrayIndef => {
			let len = d.array().map_err(invalid)?;
			let coin = d.u64().map_err(invalid)?;
			let assets = decode_multiasset(d)?;
			if len.is_none() {
				if d.datatype().map_err(invalid)? != Type::Break {
					return Err(LedgerError::InvalidUtxo("value has trailing fields".into()));
				}
				d.set_position(d.position() + 1);
			}
			Ok(Value { coin, assets })
		},
		other => Err(LedgerError::InvalidUtxo(format!(
			"value must be a coin or [coin, assets], got {}",
			other
		))),
	}
}

fn decode_multiasset(d: &mut Decoder<'_>) -> Result<MultiAsset, LedgerError> {
	let mut assets = MultiAsset::new();
	let policies = d.map().map_err(invalid)?;
	each(d, policies, |d| {
		let policy = Hash28::try_from(d.bytes().map_err(invalid)?).map_err(invalid)?;
		let mut names = BTreeMap::new();
		let count = d.map().map_err(invalid)?;
		each(d, count, |d| {
			let name = d.bytes().map_err(invalid)?.to_vec();
			let quantity = d.u64().map_err(invalid)?;
			names.insert(name, quantity);
			Ok(())
		})?;
		if !names.is_empty() {
			assets.insert(policy, names);
		}
		Ok(())
	})?;
	Ok(assets)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hash_hex() -> String {
		"ab".repeat(32)
	}

	fn address_hex() -> String {
		format!("61{}", "07".repeat(28))
	}

	#[test]
	fn test_legacy_array_output() {
		// [[hash, 3], [addr, 5000000]]
		let text = format!("82825820{}03 82581d{}1a004c4b40", hash_hex(), address_hex())
			.replace(' ', "");
		let utxo = UnspentOutput::from_hex(&text).unwrap();
		assert_eq!(utxo.input.index, 3);
		assert_eq!(utxo.input.tx_hash.to_hex(), hash_hex());
		assert_eq!(utxo.coin(), 5_000_000);
		assert_eq!(hex::encode(&utxo.address), address_hex());
		assert!(utxo.value.is_coin_only());
	}

	#[test]
	fn test_map_output_with_datum_and_assets() {
		// [[hash, 0], {0: addr, 1: [2000000, {policy: {"TOK": 7}}], 2: [0, h'00']}]
		let text = format!(
			"82825820{}00a300581d{}01821a001e8480a1581c{}a143544f4b070282004100",
			hash_hex(),
			address_hex(),
			"99".repeat(28)
		);
		let utxo = UnspentOutput::from_hex(&text).unwrap();
		assert_eq!(utxo.coin(), 2_000_000);
		let policy = Hash28::new([0x99; 28]);
		assert_eq!(utxo.value.assets[&policy][b"TOK".as_slice()], 7);
	}

	#[test]
	fn test_indefinite_lengths() {
		// [_ [_ hash, 1 ], [_ addr, 1000000, h'dd'] ]
		let text = format!(
			"9f9f5820{}01ff9f581d{}1a000f424041ddffff",
			hash_hex(),
			address_hex()
		);
		let utxo = UnspentOutput::from_hex(&text).unwrap();
		assert_eq!(utxo.input.index, 1);
		assert_eq!(utxo.coin(), 1_000_000);
	}

	#[test]
	fn test_raw_blob_is_kept() {
		let text = format!("82825820{}0082581d{}0a", hash_hex(), address_hex());
		let utxo = UnspentOutput::from_hex(&text).unwrap();
		assert_eq!(hex::encode(&utxo.raw), text);
	}

	#[test]
	fn test_new_builds_wallet_shaped_blob() {
		let input = TransactionInput {
			tx_hash: Hash32::new([0xab; 32]),
			index: 3,
		};
		let address = hex::decode(address_hex()).unwrap();
		let utxo = UnspentOutput::new(input, address, Value::coin(5_000_000)).unwrap();
		let expected = format!("82825820{}0382581d{}1a004c4b40", hash_hex(), address_hex());
		assert_eq!(utxo.to_hex(), expected);
		assert_eq!(UnspentOutput::from_hex(&expected).unwrap(), utxo);
	}

	#[test]
	fn test_rejects_malformed() {
		assert!(UnspentOutput::from_hex("zz").is_err());
		assert!(UnspentOutput::from_hex("80").is_err());
		// output without value
		let text = format!("82825820{}00a100581d{}", hash_hex(), address_hex());
		let err = UnspentOutput::from_hex(&text).unwrap_err();
		assert_eq!(err, LedgerError::InvalidUtxo("output has no value".into()));
		// short transaction hash
		assert!(UnspentOutput::from_hex("8282410000820000").is_err());
	}
}
