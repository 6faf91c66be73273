//! Fixed-size hashes, amounts and values.
//!
//! Ledger hashes are stored as raw bytes and rendered as lowercase hex, which
//! is also their serde representation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Amount of lovelace (1 ADA = 1_000_000 lovelace).
pub type Lovelace = u64;

/// Error returned when bytes or hex text do not form a hash of the expected size.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
	#[error("Invalid hex: {0}")]
	Hex(String),
	#[error("Expected {expected} bytes, got {actual}")]
	Length { expected: usize, actual: usize },
}

/// A ledger hash of `N` bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const N: usize>([u8; N]);

/// Blake2b-224 digest: key hashes, script hashes, pool ids, policy ids.
pub type Hash28 = Hash<28>;
/// Blake2b-256 digest: transaction ids.
pub type Hash32 = Hash<32>;

impl<const N: usize> Hash<N> {
	pub const fn new(bytes: [u8; N]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; N] {
		&self.0
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl<const N: usize> TryFrom<&[u8]> for Hash<N> {
	type Error = HashError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		let array: [u8; N] = bytes.try_into().map_err(|_| HashError::Length {
			expected: N,
			actual: bytes.len(),
		})?;
		Ok(Self(array))
	}
}

impl<const N: usize> FromStr for Hash<N> {
	type Err = HashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = hex::decode(s).map_err(|e| HashError::Hex(e.to_string()))?;
		Self::try_from(bytes.as_slice())
	}
}

impl<const N: usize> AsRef<[u8]> for Hash<N> {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl<const N: usize> fmt::Display for Hash<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl<const N: usize> fmt::Debug for Hash<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Hash<{}>({})", N, self.to_hex())
	}
}

impl<const N: usize> Serialize for Hash<N> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de, const N: usize> Deserialize<'de> for Hash<N> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Reference to an output of a previous transaction.
///
/// The derived ordering (hash first, then index) is the canonical ledger order
/// used when serializing transaction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionInput {
	pub tx_hash: Hash32,
	pub index: u64,
}

impl fmt::Display for TransactionInput {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.tx_hash, self.index)
	}
}

/// Native assets grouped by policy id, then asset name.
pub type MultiAsset = BTreeMap<Hash28, BTreeMap<Vec<u8>, u64>>;

/// Value held by an output: lovelace plus any native assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
	pub coin: Lovelace,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub assets: MultiAsset,
}

impl Value {
	/// A value made of lovelace only.
	pub fn coin(coin: Lovelace) -> Self {
		Self {
			coin,
			assets: MultiAsset::new(),
		}
	}

	pub fn is_coin_only(&self) -> bool {
		self.assets.is_empty()
	}

	/// Adds two values, returning `None` on overflow of any quantity.
	pub fn checked_add(&self, other: &Value) -> Option<Value> {
		let mut sum = self.clone();
		sum.coin = sum.coin.checked_add(other.coin)?;
		for (policy, names) in &other.assets {
			let entry = sum.assets.entry(*policy).or_default();
			for (name, quantity) in names {
				let slot = entry.entry(name.clone()).or_insert(0);
				*slot = slot.checked_add(*quantity)?;
			}
		}
		Some(sum)
	}
}

/// Identifier the wallet returns after submitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_hex_roundtrip() {
		let text = "e7843464e6b4090c2e7377e529136c7f6f93a8a91d2716532661de8e";
		let hash: Hash28 = text.parse().unwrap();
		assert_eq!(hash.to_string(), text);
		assert_eq!(hash.as_bytes()[0], 0xe7);
	}

	#[test]
	fn test_hash_wrong_length() {
		let err = "abcd".parse::<Hash28>().unwrap_err();
		assert_eq!(
			err,
			HashError::Length {
				expected: 28,
				actual: 2
			}
		);
	}

	#[test]
	fn test_input_ordering_is_hash_then_index() {
		let low = Hash32::new([1u8; 32]);
		let high = Hash32::new([2u8; 32]);
		let mut inputs = vec![
			TransactionInput {
				tx_hash: high,
				index: 0,
			},
			TransactionInput {
				tx_hash: low,
				index: 5,
			},
			TransactionInput {
				tx_hash: low,
				index: 1,
			},
		];
		inputs.sort();
		assert_eq!(inputs[0].index, 1);
		assert_eq!(inputs[1].index, 5);
		assert_eq!(inputs[2].tx_hash, high);
	}

	#[test]
	fn test_value_addition_merges_assets() {
		let policy = Hash28::new([9u8; 28]);
		let mut a = Value::coin(1_000_000);
		a.assets
			.entry(policy)
			.or_default()
			.insert(b"TOK".to_vec(), 5);
		let mut b = Value::coin(2_000_000);
		b.assets
			.entry(policy)
			.or_default()
			.insert(b"TOK".to_vec(), 7);

		let sum = a.checked_add(&b).unwrap();
		assert_eq!(sum.coin, 3_000_000);
		assert_eq!(sum.assets[&policy][b"TOK".as_slice()], 12);
		assert!(!sum.is_coin_only());
	}

	#[test]
	fn test_value_addition_overflow() {
		let a = Value::coin(u64::MAX);
		assert!(a.checked_add(&Value::coin(1)).is_none());
	}
}
