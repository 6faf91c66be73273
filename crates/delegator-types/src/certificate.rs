//! Certificates carried by delegation transactions.
//!
//! A delegation transaction carries exactly one certificate. When the reward
//! account still needs registering, the key deposit travels inside the same
//! certificate (the Conway combined registration and delegation forms).

use crate::{DRep, Lovelace, PoolId, StakeCredential};
use serde::{Deserialize, Serialize};

/// The certificate placed in a delegation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Certificate {
	StakeDelegation {
		credential: StakeCredential,
		pool: PoolId,
		/// Key deposit paid when the certificate also registers the credential.
		deposit: Option<Lovelace>,
	},
	VoteDelegation {
		credential: StakeCredential,
		drep: DRep,
		deposit: Option<Lovelace>,
	},
}

impl Certificate {
	pub fn credential(&self) -> &StakeCredential {
		match self {
			Certificate::StakeDelegation { credential, .. }
			| Certificate::VoteDelegation { credential, .. } => credential,
		}
	}

	/// Lovelace this certificate locks as a deposit (zero when none).
	pub fn deposit(&self) -> Lovelace {
		match self {
			Certificate::StakeDelegation { deposit, .. }
			| Certificate::VoteDelegation { deposit, .. } => deposit.unwrap_or(0),
		}
	}
}
