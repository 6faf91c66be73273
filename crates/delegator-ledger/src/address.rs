//! Shelley and Byron address decoding.
//!
//! The first byte of a Shelley address is a header: the high nibble is the
//! address type, the low nibble the network id.
//!
//! | type  | shape                         |
//! |-------|-------------------------------|
//! | 0..=3 | base (payment + stake)        |
//! | 4, 5  | pointer                       |
//! | 6, 7  | enterprise (payment only)     |
//! | 8     | Byron (CBOR, not a header)    |
//! | 14,15 | reward (stake credential)     |
//!
//! Odd types and bit 5 of base addresses mark script credentials.

use crate::{decode_hex, LedgerError};
use bech32::{Bech32, Hrp};
use delegator_types::{Hash28, Network, StakeCredential};
use minicbor::Decoder;

const HASH_LEN: usize = 28;
const REWARD_LEN: usize = 1 + HASH_LEN;
const BASE_LEN: usize = 1 + 2 * HASH_LEN;
/// Encoded-CBOR tag wrapping the Byron address payload.
const BYRON_PAYLOAD_TAG: u64 = 24;

/// Credential that authorises spending from a payment address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentCredential {
	KeyHash(Hash28),
	ScriptHash(Hash28),
}

/// A 29-byte reward (stake) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAddress {
	pub network_id: u8,
	pub credential: StakeCredential,
}

impl RewardAddress {
	pub fn to_bytes(&self) -> Vec<u8> {
		let (kind, hash) = match &self.credential {
			StakeCredential::KeyHash(h) => (0b1110, h),
			StakeCredential::ScriptHash(h) => (0b1111, h),
		};
		let mut bytes = Vec::with_capacity(REWARD_LEN);
		bytes.push((kind << 4) | (self.network_id & 0x0f));
		bytes.extend_from_slice(hash.as_bytes());
		bytes
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.to_bytes())
	}

	/// Bech32 form with the `stake` or `stake_test` prefix.
	pub fn to_bech32(&self) -> Result<String, LedgerError> {
		let hrp = if self.network_id == Network::Mainnet.network_id() {
			Network::Mainnet.stake_hrp()
		} else {
			Network::Preprod.stake_hrp()
		};
		let hrp = Hrp::parse(hrp).map_err(|e| LedgerError::Encode(e.to_string()))?;
		bech32::encode::<Bech32>(hrp, &self.to_bytes())
			.map_err(|e| LedgerError::Encode(e.to_string()))
	}

	fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
		let Some(&header) = bytes.first() else {
			return Err(LedgerError::InvalidRewardAddress("empty address".into()));
		};
		if bytes.len() != REWARD_LEN {
			return Err(LedgerError::InvalidRewardAddress(format!(
				"expected {} bytes, got {}",
				REWARD_LEN,
				bytes.len()
			)));
		}
		let hash = hash_at(&bytes[1..])
			.map_err(|_| LedgerError::InvalidRewardAddress("truncated credential".into()))?;
		let credential = match header >> 4 {
			0b1110 => StakeCredential::KeyHash(hash),
			0b1111 => StakeCredential::ScriptHash(hash),
			other => {
				return Err(LedgerError::InvalidRewardAddress(format!(
					"header type {} is not a reward address",
					other
				)))
			},
		};
		Ok(Self {
			network_id: header & 0x0f,
			credential,
		})
	}
}

/// A decoded address as it appears in outputs and wallet responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
	Base {
		network_id: u8,
		payment: PaymentCredential,
		stake: StakeCredential,
	},
	Pointer {
		network_id: u8,
		payment: PaymentCredential,
		/// Variable-length chain pointer, kept verbatim.
		pointer: Vec<u8>,
	},
	Enterprise {
		network_id: u8,
		payment: PaymentCredential,
	},
	Reward(RewardAddress),
	/// Legacy address; the CBOR payload is kept opaque.
	Byron(Vec<u8>),
}

impl Address {
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
		let Some(&header) = bytes.first() else {
			return Err(LedgerError::InvalidAddress("empty address".into()));
		};
		let kind = header >> 4;
		let network_id = header & 0x0f;
		let payment_is_script = kind & 0b0001 != 0;
		let invalid = |what: &str| LedgerError::InvalidAddress(format!("{} (header {:#04x})", what, header));

		match kind {
			0..=3 => {
				if bytes.len() != BASE_LEN {
					return Err(invalid("base address must be 57 bytes"));
				}
				let payment = payment_credential(payment_is_script, hash_at(&bytes[1..])?);
				let stake_hash = hash_at(&bytes[1 + HASH_LEN..])?;
				let stake = if kind & 0b0010 != 0 {
					StakeCredential::ScriptHash(stake_hash)
				} else {
					StakeCredential::KeyHash(stake_hash)
				};
				Ok(Address::Base {
					network_id,
					payment,
					stake,
				})
			},
			4 | 5 => {
				if bytes.len() <= REWARD_LEN {
					return Err(invalid("pointer address is truncated"));
				}
				Ok(Address::Pointer {
					network_id,
					payment: payment_credential(payment_is_script, hash_at(&bytes[1..])?),
					pointer: bytes[REWARD_LEN..].to_vec(),
				})
			},
			6 | 7 => {
				if bytes.len() != REWARD_LEN {
					return Err(invalid("enterprise address must be 29 bytes"));
				}
				Ok(Address::Enterprise {
					network_id,
					payment: payment_credential(payment_is_script, hash_at(&bytes[1..])?),
				})
			},
			8 => Ok(Address::Byron(bytes.to_vec())),
			14 | 15 => RewardAddress::from_bytes(bytes)
				.map(Address::Reward)
				.map_err(|e| LedgerError::InvalidAddress(e.to_string())),
			_ => Err(invalid("unknown address type")),
		}
	}

	pub fn from_hex(text: &str) -> Result<Self, LedgerError> {
		let bytes = decode_hex(text).map_err(|e| LedgerError::InvalidAddress(e.to_string()))?;
		Self::from_bytes(&bytes)
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		match self {
			Address::Base {
				network_id,
				payment,
				stake,
			} => {
				let (payment_script, payment_hash) = split_payment(payment);
				let stake_script = stake.is_script() as u8;
				let kind = (stake_script << 1) | payment_script;
				let mut bytes = Vec::with_capacity(BASE_LEN);
				bytes.push((kind << 4) | (network_id & 0x0f));
				bytes.extend_from_slice(payment_hash.as_bytes());
				bytes.extend_from_slice(stake.hash().as_bytes());
				bytes
			},
			Address::Pointer {
				network_id,
				payment,
				pointer,
			} => {
				let (script, hash) = split_payment(payment);
				let mut bytes = vec![((4 | script) << 4) | (network_id & 0x0f)];
				bytes.extend_from_slice(hash.as_bytes());
				bytes.extend_from_slice(pointer);
				bytes
			},
			Address::Enterprise {
				network_id,
				payment,
			} => {
				let (script, hash) = split_payment(payment);
				let mut bytes = vec![((6 | script) << 4) | (network_id & 0x0f)];
				bytes.extend_from_slice(hash.as_bytes());
				bytes
			},
			Address::Reward(reward) => reward.to_bytes(),
			Address::Byron(raw) => raw.clone(),
		}
	}

	pub fn network_id(&self) -> Option<u8> {
		match self {
			Address::Base { network_id, .. }
			| Address::Pointer { network_id, .. }
			| Address::Enterprise { network_id, .. } => Some(*network_id),
			Address::Reward(reward) => Some(reward.network_id),
			Address::Byron(_) => None,
		}
	}

	pub fn is_payment(&self) -> bool {
		!matches!(self, Address::Reward(_))
	}

	/// Hash of the key whose vkey witness spends from this address.
	///
	/// Script credentials and Byron addresses yield `None`; Byron inputs are
	/// signed with bootstrap witnesses, see [`Address::bootstrap_attributes`].
	pub fn signer(&self) -> Option<Vec<u8>> {
		match self {
			Address::Base { payment, .. }
			| Address::Pointer { payment, .. }
			| Address::Enterprise { payment, .. } => match payment {
				PaymentCredential::KeyHash(hash) => Some(hash.as_bytes().to_vec()),
				PaymentCredential::ScriptHash(_) => None,
			},
			Address::Reward(_) | Address::Byron(_) => None,
		}
	}

	/// Serialized attributes map a bootstrap witness for this address carries.
	///
	/// A Byron address is `[#6.24(bytes .cbor [root, attributes, type]), crc]`.
	/// Shelley addresses yield `None`.
	pub fn bootstrap_attributes(&self) -> Result<Option<Vec<u8>>, LedgerError> {
		let Address::Byron(raw) = self else {
			return Ok(None);
		};
		let invalid = |e: minicbor::decode::Error| {
			LedgerError::InvalidAddress(format!("malformed Byron address: {}", e))
		};

		let mut d = Decoder::new(raw);
		d.array().map_err(invalid)?;
		let tag = d.tag().map_err(invalid)?;
		if tag.as_u64() != BYRON_PAYLOAD_TAG {
			return Err(LedgerError::InvalidAddress(format!(
				"Byron address payload has tag {}",
				tag.as_u64()
			)));
		}
		let payload = d.bytes().map_err(invalid)?;

		let mut d = Decoder::new(payload);
		d.array().map_err(invalid)?;
		d.bytes().map_err(invalid)?;
		let start = d.position();
		d.skip().map_err(invalid)?;
		Ok(Some(payload[start..d.position()].to_vec()))
	}
}

fn hash_at(bytes: &[u8]) -> Result<Hash28, LedgerError> {
	bytes
		.get(..HASH_LEN)
		.ok_or_else(|| LedgerError::InvalidAddress("truncated credential".into()))
		.and_then(|slice| {
			Hash28::try_from(slice).map_err(|e| LedgerError::InvalidAddress(e.to_string()))
		})
}

fn payment_credential(script: bool, hash: Hash28) -> PaymentCredential {
	if script {
		PaymentCredential::ScriptHash(hash)
	} else {
		PaymentCredential::KeyHash(hash)
	}
}

fn split_payment(payment: &PaymentCredential) -> (u8, &Hash28) {
	match payment {
		PaymentCredential::KeyHash(h) => (0, h),
		PaymentCredential::ScriptHash(h) => (1, h),
	}
}

/// Decodes a hex reward address returned by `getRewardAddresses`.
pub fn decode_reward_address(text: &str) -> Result<RewardAddress, LedgerError> {
	let bytes = decode_hex(text).map_err(|e| LedgerError::InvalidRewardAddress(e.to_string()))?;
	RewardAddress::from_bytes(&bytes)
}

/// Extracts the stake credential from a hex reward address.
pub fn decode_reward(text: &str) -> Result<StakeCredential, LedgerError> {
	decode_reward_address(text).map(|reward| reward.credential)
}

/// Decodes the wallet's change address. Reward addresses cannot hold outputs.
pub fn decode_change_address(text: &str) -> Result<Address, LedgerError> {
	let address = Address::from_hex(text)?;
	if !address.is_payment() {
		return Err(LedgerError::InvalidAddress(
			"change address is a reward address".into(),
		));
	}
	Ok(address)
}

/// Raw reward address bytes for a credential on a network.
pub fn encode_reward(credential: &StakeCredential, network: Network) -> Vec<u8> {
	RewardAddress {
		network_id: network.network_id(),
		credential: *credential,
	}
	.to_bytes()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(byte: u8) -> Hash28 {
		Hash28::new([byte; 28])
	}

	#[test]
	fn test_reward_roundtrip_for_every_credential_kind() {
		for network in [Network::Mainnet, Network::Preprod] {
			for credential in [
				StakeCredential::KeyHash(key(0x11)),
				StakeCredential::ScriptHash(key(0x22)),
			] {
				let raw = encode_reward(&credential, network);
				assert_eq!(raw.len(), 29);
				assert_eq!(decode_reward(&hex::encode(&raw)).unwrap(), credential);
			}
		}
	}

	#[test]
	fn test_reward_header_bytes() {
		let mainnet_key = encode_reward(&StakeCredential::KeyHash(key(1)), Network::Mainnet);
		assert_eq!(mainnet_key[0], 0xe1);
		let testnet_script = encode_reward(&StakeCredential::ScriptHash(key(1)), Network::Preview);
		assert_eq!(testnet_script[0], 0xf0);
	}

	#[test]
	fn test_reward_rejects_payment_address() {
		let mut enterprise = vec![0x61];
		enterprise.extend_from_slice(&[7u8; 28]);
		let err = decode_reward(&hex::encode(enterprise)).unwrap_err();
		assert!(matches!(err, LedgerError::InvalidRewardAddress(_)));
	}

	#[test]
	fn test_reward_rejects_wrong_length() {
		let err = decode_reward("e1aabb").unwrap_err();
		assert!(matches!(err, LedgerError::InvalidRewardAddress(_)));
		assert!(decode_reward("not hex").is_err());
	}

	#[test]
	fn test_reward_accepts_0x_prefix() {
		let raw = encode_reward(&StakeCredential::KeyHash(key(3)), Network::Mainnet);
		let text = format!("0x{}", hex::encode(raw));
		assert!(decode_reward(&text).is_ok());
	}

	#[test]
	fn test_reward_bech32_prefix_follows_network() {
		let mainnet = decode_reward_address(&hex::encode(encode_reward(
			&StakeCredential::KeyHash(key(4)),
			Network::Mainnet,
		)))
		.unwrap();
		assert!(mainnet.to_bech32().unwrap().starts_with("stake1"));

		let testnet = RewardAddress {
			network_id: 0,
			..mainnet
		};
		assert!(testnet.to_bech32().unwrap().starts_with("stake_test1"));
	}

	#[test]
	fn test_base_address_roundtrip() {
		let address = Address::Base {
			network_id: 1,
			payment: PaymentCredential::KeyHash(key(5)),
			stake: StakeCredential::ScriptHash(key(6)),
		};
		let bytes = address.to_bytes();
		assert_eq!(bytes.len(), 57);
		assert_eq!(bytes[0], 0x21);
		assert_eq!(Address::from_bytes(&bytes).unwrap(), address);
		assert_eq!(address.signer(), Some(vec![5u8; 28]));
	}

	#[test]
	fn test_script_payment_needs_no_vkey() {
		let address = Address::Enterprise {
			network_id: 0,
			payment: PaymentCredential::ScriptHash(key(9)),
		};
		let decoded = Address::from_bytes(&address.to_bytes()).unwrap();
		assert_eq!(decoded.signer(), None);
	}

	#[test]
	fn test_change_address_must_be_payment() {
		let reward = encode_reward(&StakeCredential::KeyHash(key(1)), Network::Mainnet);
		assert!(decode_change_address(&hex::encode(reward)).is_err());

		let mut enterprise = vec![0x61];
		enterprise.extend_from_slice(&[7u8; 28]);
		let decoded = decode_change_address(&hex::encode(&enterprise)).unwrap();
		assert_eq!(decoded.to_bytes(), enterprise);
	}

	#[test]
	fn test_pointer_and_byron_are_kept_verbatim() {
		let mut pointer = vec![0x41];
		pointer.extend_from_slice(&[8u8; 28]);
		pointer.extend_from_slice(&[0x81, 0x00, 0x02, 0x03]);
		assert_eq!(Address::from_bytes(&pointer).unwrap().to_bytes(), pointer);

		let byron = vec![0x82, 0xd8, 0x18, 0x58, 0x21];
		let decoded = Address::from_bytes(&byron).unwrap();
		assert_eq!(decoded, Address::Byron(byron.clone()));
		assert_eq!(decoded.network_id(), None);
		assert!(decoded.bootstrap_attributes().is_err());
	}

	#[test]
	fn test_byron_bootstrap_attributes() {
		// [24([root, {}, 0]), crc]
		let icarus = hex::decode(format!("82d818582183581c{}a0001a01020304", "11".repeat(28))).unwrap();
		let address = Address::from_bytes(&icarus).unwrap();
		assert_eq!(address.signer(), None);
		assert_eq!(address.bootstrap_attributes().unwrap(), Some(vec![0xa0]));

		// testnet addresses carry the protocol magic as attribute 2
		let magic = "a102451a2d964a09";
		let payload = format!("83581c{}{}00", "22".repeat(28), magic);
		let testnet = hex::decode(format!("82d81858{:02x}{}1a01020304", payload.len() / 2, payload)).unwrap();
		let attributes = Address::from_bytes(&testnet).unwrap().bootstrap_attributes().unwrap();
		assert_eq!(attributes, Some(hex::decode(magic).unwrap()));

		let shelley = Address::Enterprise {
			network_id: 1,
			payment: PaymentCredential::KeyHash(key(2)),
		};
		assert_eq!(shelley.bootstrap_attributes().unwrap(), None);
	}
}
