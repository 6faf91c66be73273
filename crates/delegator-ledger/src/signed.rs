//! Combining the wallet's signing result with the unsigned body.

use crate::cbor::encode_transaction;
use crate::{decode_hex, LedgerError};
use minicbor::data::Type;
use minicbor::Decoder;

fn invalid(err: impl std::fmt::Display) -> LedgerError {
	LedgerError::InvalidWitness(err.to_string())
}

/// Builds the submittable transaction from what `signTx` returned.
///
/// CIP-30 wallets return a witness set (a CBOR map), which is spliced next
/// to the exact body bytes that were signed. Some wallets return a complete
/// transaction instead; it is accepted only if its body matches `body`.
pub fn attach_witnesses(body: &[u8], signed_hex: &str) -> Result<Vec<u8>, LedgerError> {
	let signed = decode_hex(signed_hex).map_err(invalid)?;
	let mut d = Decoder::new(&signed);

	match d.datatype().map_err(invalid)? {
		Type::Map | Type::MapIndef => {
			d.skip().map_err(invalid)?;
			if d.position() != signed.len() {
				return Err(LedgerError::InvalidWitness(
					"trailing bytes after witness set".into(),
				));
			}
			Ok(encode_transaction(body, &signed))
		},
		Type::Array => {
			if d.array().map_err(invalid)? != Some(4) {
				return Err(LedgerError::InvalidWitness(
					"transaction must have four elements".into(),
				));
			}
			let start = d.position();
			d.skip().map_err(invalid)?;
			if &signed[start..d.position()] != body {
				return Err(LedgerError::InvalidWitness(
					"signed transaction body differs from the one submitted for signing".into(),
				));
			}
			Ok(signed)
		},
		other => Err(LedgerError::InvalidWitness(format!(
			"expected a witness set or transaction, got {}",
			other
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cbor::{vkey_witness_set, TransactionBody};

	fn body() -> Vec<u8> {
		TransactionBody {
			fee: 170_000,
			..Default::default()
		}
		.to_cbor()
		.unwrap()
	}

	#[test]
	fn test_witness_set_is_spliced() {
		let body = body();
		let witnesses = vkey_witness_set(2).unwrap();
		let tx = attach_witnesses(&body, &hex::encode(&witnesses)).unwrap();
		assert_eq!(tx[0], 0x84);
		assert_eq!(&tx[1..1 + body.len()], body.as_slice());
		assert_eq!(&tx[1 + body.len()..tx.len() - 2], witnesses.as_slice());
		assert_eq!(&tx[tx.len() - 2..], &[0xf5, 0xf6]);
	}

	#[test]
	fn test_full_transaction_with_same_body_is_accepted() {
		let body = body();
		let full = encode_transaction(&body, &vkey_witness_set(1).unwrap());
		let tx = attach_witnesses(&body, &hex::encode(&full)).unwrap();
		assert_eq!(tx, full);
	}

	#[test]
	fn test_full_transaction_with_other_body_is_rejected() {
		let other = TransactionBody {
			fee: 1,
			..Default::default()
		}
		.to_cbor()
		.unwrap();
		let full = encode_transaction(&other, &[0xa0]);
		let err = attach_witnesses(&body(), &hex::encode(full)).unwrap_err();
		assert!(err.to_string().contains("differs"));
	}

	#[test]
	fn test_garbage_is_rejected() {
		assert!(attach_witnesses(&body(), "01").is_err());
		assert!(attach_witnesses(&body(), "a0ff").is_err());
		assert!(attach_witnesses(&body(), "xyz").is_err());
	}
}
