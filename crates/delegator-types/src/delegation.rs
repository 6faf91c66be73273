//! Stake credentials and delegation targets.

use crate::Hash28;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential that controls a reward account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "hash", rename_all = "snake_case")]
pub enum StakeCredential {
	KeyHash(Hash28),
	ScriptHash(Hash28),
}

impl StakeCredential {
	pub fn hash(&self) -> &Hash28 {
		match self {
			StakeCredential::KeyHash(hash) | StakeCredential::ScriptHash(hash) => hash,
		}
	}

	pub fn is_script(&self) -> bool {
		matches!(self, StakeCredential::ScriptHash(_))
	}
}

/// Key hash of a stake pool operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub Hash28);

impl fmt::Display for PoolId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// A registered governance representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "hash", rename_all = "snake_case")]
pub enum DRep {
	KeyHash(Hash28),
	ScriptHash(Hash28),
}

impl DRep {
	pub fn hash(&self) -> &Hash28 {
		match self {
			DRep::KeyHash(hash) | DRep::ScriptHash(hash) => hash,
		}
	}
}

/// Where a delegation attempt points the wallet's stake or voting power.
///
/// This is the single dispatch point between the two delegation flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum DelegationTarget {
	Pool(PoolId),
	DRep(DRep),
}

impl DelegationTarget {
	pub fn kind(&self) -> IdentifierKind {
		match self {
			DelegationTarget::Pool(_) => IdentifierKind::Pool,
			DelegationTarget::DRep(_) => IdentifierKind::DRep,
		}
	}
}

/// Kind of bech32 identifier accepted at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
	Pool,
	DRep,
}

impl fmt::Display for IdentifierKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IdentifierKind::Pool => f.write_str("pool"),
			IdentifierKind::DRep => f.write_str("drep"),
		}
	}
}
