//! Bech32 pool and DRep identifiers.
//!
//! Identifiers are checked with the original bech32 checksum (bech32m is
//! rejected) and the human readable prefix must match the requested kind
//! before any key hash is extracted.
//!
//! Accepted forms:
//! - `pool` + 28-byte operator key hash
//! - `drep` + 29 bytes (CIP-129: header `0x22` key hash, `0x23` script hash)
//! - `drep` + 28-byte key hash (CIP-105)
//! - `drep_script` + 28-byte script hash (CIP-105)

use crate::LedgerError;
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use delegator_types::{DRep, DelegationTarget, Hash28, IdentifierKind, PoolId};

const POOL_HRP: &str = "pool";
const DREP_HRP: &str = "drep";
const DREP_SCRIPT_HRP: &str = "drep_script";

const CIP129_DREP_KEY: u8 = 0x22;
const CIP129_DREP_SCRIPT: u8 = 0x23;

/// Decodes `text` as an identifier of the requested kind.
pub fn decode_bech32_identifier(
	text: &str,
	kind: IdentifierKind,
) -> Result<DelegationTarget, LedgerError> {
	let checked = CheckedHrpstring::new::<Bech32>(text.trim())
		.map_err(|e| LedgerError::InvalidIdentifier(format!("{}: {}", kind, e)))?;
	let hrp = checked.hrp().to_lowercase();
	let payload: Vec<u8> = checked.byte_iter().collect();

	match kind {
		IdentifierKind::Pool => {
			if hrp != POOL_HRP {
				return Err(wrong_prefix(kind, &hrp));
			}
			Ok(DelegationTarget::Pool(PoolId(hash(kind, &payload)?)))
		},
		IdentifierKind::DRep => {
			let drep = match (hrp.as_str(), payload.len()) {
				(DREP_HRP, 29) => match payload[0] {
					CIP129_DREP_KEY => DRep::KeyHash(hash(kind, &payload[1..])?),
					CIP129_DREP_SCRIPT => DRep::ScriptHash(hash(kind, &payload[1..])?),
					header => {
						return Err(LedgerError::InvalidIdentifier(format!(
							"drep: unsupported header byte {:#04x}",
							header
						)))
					},
				},
				(DREP_HRP, _) => DRep::KeyHash(hash(kind, &payload)?),
				(DREP_SCRIPT_HRP, _) => DRep::ScriptHash(hash(kind, &payload)?),
				_ => return Err(wrong_prefix(kind, &hrp)),
			};
			Ok(DelegationTarget::DRep(drep))
		},
	}
}

/// Decodes a `pool1...` identifier.
pub fn decode_pool_id(text: &str) -> Result<PoolId, LedgerError> {
	match decode_bech32_identifier(text, IdentifierKind::Pool)? {
		DelegationTarget::Pool(pool) => Ok(pool),
		DelegationTarget::DRep(_) => Err(wrong_prefix(IdentifierKind::Pool, DREP_HRP)),
	}
}

/// Decodes a `drep1...` or `drep_script1...` identifier.
pub fn decode_drep_id(text: &str) -> Result<DRep, LedgerError> {
	match decode_bech32_identifier(text, IdentifierKind::DRep)? {
		DelegationTarget::DRep(drep) => Ok(drep),
		DelegationTarget::Pool(_) => Err(wrong_prefix(IdentifierKind::DRep, POOL_HRP)),
	}
}

pub fn encode_pool_id(pool: &PoolId) -> Result<String, LedgerError> {
	encode(POOL_HRP, pool.0.as_bytes())
}

/// Renders a DRep in the CIP-129 form.
pub fn encode_drep_id(drep: &DRep) -> Result<String, LedgerError> {
	let header = match drep {
		DRep::KeyHash(_) => CIP129_DREP_KEY,
		DRep::ScriptHash(_) => CIP129_DREP_SCRIPT,
	};
	let mut payload = Vec::with_capacity(29);
	payload.push(header);
	payload.extend_from_slice(drep.hash().as_bytes());
	encode(DREP_HRP, &payload)
}

fn encode(hrp: &str, payload: &[u8]) -> Result<String, LedgerError> {
	let hrp = Hrp::parse(hrp).map_err(|e| LedgerError::Encode(e.to_string()))?;
	bech32::encode::<Bech32>(hrp, payload).map_err(|e| LedgerError::Encode(e.to_string()))
}

fn hash(kind: IdentifierKind, payload: &[u8]) -> Result<Hash28, LedgerError> {
	Hash28::try_from(payload).map_err(|e| LedgerError::InvalidIdentifier(format!("{}: {}", kind, e)))
}

fn wrong_prefix(kind: IdentifierKind, found: &str) -> LedgerError {
	LedgerError::InvalidIdentifier(format!(
		"expected a {} identifier, found prefix '{}'",
		kind, found
	))
}
