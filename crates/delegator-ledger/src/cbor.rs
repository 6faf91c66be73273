//! CBOR encoding of delegation transactions.
//!
//! Encodings are definite-length with minimal integer widths. The body map
//! uses ascending keys: 0 inputs, 1 outputs, 2 fee, 4 certificates. Inputs
//! are written sorted by (transaction hash, index).

use crate::LedgerError;
use delegator_types::{
	Certificate, DRep, Lovelace, StakeCredential, TransactionInput, Value,
};
use minicbor::Encoder;

type Enc = Encoder<Vec<u8>>;
type EncResult = Result<(), minicbor::encode::Error<std::convert::Infallible>>;

const BODY_INPUTS: u8 = 0;
const BODY_OUTPUTS: u8 = 1;
const BODY_FEE: u8 = 2;
const BODY_CERTIFICATES: u8 = 4;

const WITNESS_VKEYS: u8 = 0;
const WITNESS_BOOTSTRAP: u8 = 2;
const VKEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;
const CHAIN_CODE_LEN: usize = 32;

// Certificate tags, Conway CDDL.
const CERT_STAKE_DELEGATION: u8 = 2;
const CERT_VOTE_DELEGATION: u8 = 9;
const CERT_STAKE_REG_DELEGATION: u8 = 11;
const CERT_VOTE_REG_DELEGATION: u8 = 12;

/// An output: raw address bytes and the value locked at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
	pub address: Vec<u8>,
	pub value: Value,
}

impl TransactionOutput {
	/// Legacy array form `[address, value]`.
	pub fn to_cbor(&self) -> Result<Vec<u8>, LedgerError> {
		let mut e = Encoder::new(Vec::new());
		write_output(&mut e, self)?;
		Ok(e.into_writer())
	}
}

/// The fields of a transaction body a delegation needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionBody {
	pub inputs: Vec<TransactionInput>,
	pub outputs: Vec<TransactionOutput>,
	pub fee: Lovelace,
	pub certificates: Vec<Certificate>,
}

impl TransactionBody {
	pub fn to_cbor(&self) -> Result<Vec<u8>, LedgerError> {
		let mut e = Encoder::new(Vec::new());
		self.write(&mut e)?;
		Ok(e.into_writer())
	}

	fn write(&self, e: &mut Enc) -> EncResult {
		let entries = if self.certificates.is_empty() { 3 } else { 4 };
		e.map(entries)?;

		let mut inputs = self.inputs.clone();
		inputs.sort();
		e.u8(BODY_INPUTS)?.array(inputs.len() as u64)?;
		for input in &inputs {
			e.array(2)?.bytes(input.tx_hash.as_bytes())?.u64(input.index)?;
		}

		e.u8(BODY_OUTPUTS)?.array(self.outputs.len() as u64)?;
		for output in &self.outputs {
			write_output(e, output)?;
		}

		e.u8(BODY_FEE)?.u64(self.fee)?;

		if !self.certificates.is_empty() {
			e.u8(BODY_CERTIFICATES)?
				.array(self.certificates.len() as u64)?;
			for certificate in &self.certificates {
				write_certificate(e, certificate)?;
			}
		}
		Ok(())
	}
}

fn write_output(e: &mut Enc, output: &TransactionOutput) -> EncResult {
	e.array(2)?.bytes(&output.address)?;
	write_value(e, &output.value)
}

fn write_value(e: &mut Enc, value: &Value) -> EncResult {
	if value.is_coin_only() {
		e.u64(value.coin)?;
		return Ok(());
	}
	e.array(2)?.u64(value.coin)?;
	e.map(value.assets.len() as u64)?;
	for (policy, names) in &value.assets {
		e.bytes(policy.as_bytes())?.map(names.len() as u64)?;
		for (name, quantity) in names {
			e.bytes(name)?.u64(*quantity)?;
		}
	}
	Ok(())
}

fn write_credential(e: &mut Enc, credential: &StakeCredential) -> EncResult {
	let tag = u8::from(credential.is_script());
	e.array(2)?.u8(tag)?.bytes(credential.hash().as_bytes())?;
	Ok(())
}

fn write_drep(e: &mut Enc, drep: &DRep) -> EncResult {
	let tag = match drep {
		DRep::KeyHash(_) => 0,
		DRep::ScriptHash(_) => 1,
	};
	e.array(2)?.u8(tag)?.bytes(drep.hash().as_bytes())?;
	Ok(())
}

fn write_certificate(e: &mut Enc, certificate: &Certificate) -> EncResult {
	match certificate {
		Certificate::StakeDelegation {
			credential,
			pool,
			deposit: None,
		} => {
			e.array(3)?.u8(CERT_STAKE_DELEGATION)?;
			write_credential(e, credential)?;
			e.bytes(pool.0.as_bytes())?;
		},
		Certificate::StakeDelegation {
			credential,
			pool,
			deposit: Some(deposit),
		} => {
			e.array(4)?.u8(CERT_STAKE_REG_DELEGATION)?;
			write_credential(e, credential)?;
			e.bytes(pool.0.as_bytes())?.u64(*deposit)?;
		},
		Certificate::VoteDelegation {
			credential,
			drep,
			deposit: None,
		} => {
			e.array(3)?.u8(CERT_VOTE_DELEGATION)?;
			write_credential(e, credential)?;
			write_drep(e, drep)?;
		},
		Certificate::VoteDelegation {
			credential,
			drep,
			deposit: Some(deposit),
		} => {
			e.array(4)?.u8(CERT_VOTE_REG_DELEGATION)?;
			write_credential(e, credential)?;
			write_drep(e, drep)?;
			e.u64(*deposit)?;
		},
	}
	Ok(())
}

/// CBOR of a value: a bare coin, or `[coin, multiasset]`.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, LedgerError> {
	let mut e = Encoder::new(Vec::new());
	write_value(&mut e, value)?;
	Ok(e.into_writer())
}

pub fn encode_certificate(certificate: &Certificate) -> Result<Vec<u8>, LedgerError> {
	let mut e = Encoder::new(Vec::new());
	write_certificate(&mut e, certificate)?;
	Ok(e.into_writer())
}

/// The witnesses a wallet is expected to add when signing.
///
/// Shelley key credentials are signed with vkey witnesses. Each Byron
/// address is signed with a bootstrap witness carrying the address
/// attributes, kept here as their serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WitnessAllowance {
	pub vkeys: usize,
	pub bootstrap: Vec<Vec<u8>>,
}

impl WitnessAllowance {
	pub fn count(&self) -> usize {
		self.vkeys + self.bootstrap.len()
	}

	/// A witness set of zeroed placeholders with the same encoded length
	/// as the real one.
	pub fn placeholder_set(&self) -> Result<Vec<u8>, LedgerError> {
		let mut e = Encoder::new(Vec::new());
		let entries = u64::from(self.vkeys > 0) + u64::from(!self.bootstrap.is_empty());
		e.map(entries)?;
		if self.vkeys > 0 {
			e.u8(WITNESS_VKEYS)?.array(self.vkeys as u64)?;
			for _ in 0..self.vkeys {
				e.array(2)?
					.bytes(&[0u8; VKEY_LEN])?
					.bytes(&[0u8; SIGNATURE_LEN])?;
			}
		}
		if !self.bootstrap.is_empty() {
			e.u8(WITNESS_BOOTSTRAP)?.array(self.bootstrap.len() as u64)?;
			for attributes in &self.bootstrap {
				e.array(4)?
					.bytes(&[0u8; VKEY_LEN])?
					.bytes(&[0u8; SIGNATURE_LEN])?
					.bytes(&[0u8; CHAIN_CODE_LEN])?
					.bytes(attributes)?;
			}
		}
		Ok(e.into_writer())
	}
}

/// A witness set holding `count` placeholder vkey witnesses.
pub fn vkey_witness_set(count: usize) -> Result<Vec<u8>, LedgerError> {
	WitnessAllowance {
		vkeys: count,
		bootstrap: Vec::new(),
	}
	.placeholder_set()
}

/// Splices `[body, witness_set, true, null]` around already encoded parts.
///
/// The body bytes are kept exactly as given so a signature over them stays
/// valid.
pub fn encode_transaction(body: &[u8], witness_set: &[u8]) -> Vec<u8> {
	let mut tx = Vec::with_capacity(body.len() + witness_set.len() + 3);
	tx.push(0x84);
	tx.extend_from_slice(body);
	tx.extend_from_slice(witness_set);
	tx.push(0xf5);
	tx.push(0xf6);
	tx
}

#[cfg(test)]
mod tests {
	use super::*;
	use delegator_types::{Hash28, Hash32, PoolId};

	fn credential() -> StakeCredential {
		StakeCredential::KeyHash(Hash28::new([0x11; 28]))
	}

	fn enterprise() -> Vec<u8> {
		let mut address = vec![0x61];
		address.extend_from_slice(&[0x07; 28]);
		address
	}

	#[test]
	fn test_body_encoding_is_canonical() {
		let body = TransactionBody {
			inputs: vec![
				TransactionInput {
					tx_hash: Hash32::new([0xbb; 32]),
					index: 1,
				},
				TransactionInput {
					tx_hash: Hash32::new([0xaa; 32]),
					index: 0,
				},
			],
			outputs: vec![TransactionOutput {
				address: enterprise(),
				value: Value::coin(3_000_000),
			}],
			fee: 200_000,
			certificates: vec![Certificate::StakeDelegation {
				credential: credential(),
				pool: PoolId(Hash28::new([0x22; 28])),
				deposit: None,
			}],
		};

		let expected = [
			"a4",
			"00",
			"82",
			"82",
			"5820",
			&"aa".repeat(32),
			"00",
			"82",
			"5820",
			&"bb".repeat(32),
			"01",
			"01",
			"81",
			"82",
			"581d",
			"61",
			&"07".repeat(28),
			"1a002dc6c0",
			"02",
			"1a00030d40",
			"04",
			"81",
			"83",
			"02",
			"8200581c",
			&"11".repeat(28),
			"581c",
			&"22".repeat(28),
		]
		.concat();

		assert_eq!(hex::encode(body.to_cbor().unwrap()), expected);
	}

	#[test]
	fn test_body_without_certificate_has_three_entries() {
		let body = TransactionBody::default();
		assert_eq!(hex::encode(body.to_cbor().unwrap()), "a3008001800200");
	}

	#[test]
	fn test_certificate_tags() {
		let pool = PoolId(Hash28::new([0x22; 28]));
		let drep = DRep::ScriptHash(Hash28::new([0x33; 28]));
		let cases = [
			(
				Certificate::StakeDelegation {
					credential: credential(),
					pool,
					deposit: None,
				},
				"8302",
			),
			(
				Certificate::StakeDelegation {
					credential: credential(),
					pool,
					deposit: Some(2_000_000),
				},
				"840b",
			),
			(
				Certificate::VoteDelegation {
					credential: credential(),
					drep,
					deposit: None,
				},
				"8309",
			),
			(
				Certificate::VoteDelegation {
					credential: credential(),
					drep,
					deposit: Some(2_000_000),
				},
				"840c",
			),
		];
		for (certificate, prefix) in cases {
			let encoded = hex::encode(encode_certificate(&certificate).unwrap());
			assert!(encoded.starts_with(prefix), "{} vs {}", encoded, prefix);
		}
	}

	#[test]
	fn test_registration_certificate_carries_deposit() {
		let encoded = encode_certificate(&Certificate::VoteDelegation {
			credential: StakeCredential::ScriptHash(Hash28::new([0x44; 28])),
			drep: DRep::KeyHash(Hash28::new([0x55; 28])),
			deposit: Some(2_000_000),
		})
		.unwrap();
		let text = hex::encode(encoded);
		assert!(text.starts_with("840c8201581c"));
		assert!(text.ends_with("1a001e8480"));
	}

	#[test]
	fn test_value_with_assets() {
		let mut value = Value::coin(1_500_000);
		value
			.assets
			.entry(Hash28::new([0x99; 28]))
			.or_default()
			.insert(b"TOK".to_vec(), 10);
		let text = hex::encode(encode_value(&value).unwrap());
		let expected = format!("821a0016e360a1581c{}a143544f4b0a", "99".repeat(28));
		assert_eq!(text, expected);
		assert_eq!(hex::encode(encode_value(&Value::coin(10)).unwrap()), "0a");
	}

	#[test]
	fn test_witness_allowance_size() {
		assert_eq!(vkey_witness_set(0).unwrap(), vec![0xa0]);
		let one = vkey_witness_set(1).unwrap();
		let two = vkey_witness_set(2).unwrap();
		// map header, key, array header, then 101 bytes per witness
		assert_eq!(one.len(), 3 + 101);
		assert_eq!(two.len() - one.len(), 101);
	}

	#[test]
	fn test_bootstrap_witnesses_are_sized_with_attributes() {
		let mixed = WitnessAllowance {
			vkeys: 1,
			bootstrap: vec![vec![0xa0]],
		};
		let set = mixed.placeholder_set().unwrap();
		assert_eq!(mixed.count(), 2);
		// a2, vkeys entry (2 + 101), bootstrap key and array header (2),
		// then [vkey, sig, chain code, attributes] = 1 + 34 + 66 + 34 + 2
		assert_eq!(set.len(), 1 + 2 + 101 + 2 + 137);
		assert_eq!(set[0], 0xa2);
		assert_eq!(&set[104..107], &[0x02, 0x81, 0x84]);
		assert!(hex::encode(&set).ends_with("41a0"));

		let byron_only = WitnessAllowance {
			vkeys: 0,
			bootstrap: vec![vec![0xa1, 0x02, 0x45, 1, 2, 3, 4, 5]],
		};
		let set = byron_only.placeholder_set().unwrap();
		assert!(hex::encode(&set).starts_with("a1028184"));
		assert!(hex::encode(&set).ends_with("48a102450102030405"));
	}

	#[test]
	fn test_transaction_splice() {
		let tx = encode_transaction(&[0xa0], &[0xa0]);
		assert_eq!(hex::encode(tx), "84a0a0f5f6");
	}
}
