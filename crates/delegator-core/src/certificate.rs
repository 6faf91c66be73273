//! Delegation certificate construction.

use delegator_types::{Certificate, DRep, DelegationTarget, Lovelace, PoolId, StakeCredential};

/// Builds the single certificate a delegation transaction carries.
///
/// A `deposit` turns the certificate into the combined registration and
/// delegation form, which registers the stake credential in the same
/// transaction.
pub struct CertificateBuilder;

impl CertificateBuilder {
	pub fn build_stake_delegation(credential: StakeCredential, pool: PoolId) -> Certificate {
		Certificate::StakeDelegation {
			credential,
			pool,
			deposit: None,
		}
	}

	pub fn build_vote_delegation(credential: StakeCredential, drep: DRep) -> Certificate {
		Certificate::VoteDelegation {
			credential,
			drep,
			deposit: None,
		}
	}

	pub fn build(
		credential: StakeCredential,
		target: &DelegationTarget,
		deposit: Option<Lovelace>,
	) -> Certificate {
		match *target {
			DelegationTarget::Pool(pool) => Certificate::StakeDelegation {
				credential,
				pool,
				deposit,
			},
			DelegationTarget::DRep(drep) => Certificate::VoteDelegation {
				credential,
				drep,
				deposit,
			},
		}
	}
}
