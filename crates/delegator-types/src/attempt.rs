//! Delegation attempt lifecycle.
//!
//! An attempt moves strictly forward:
//! Idle -> ParamsAndWalletReady -> Selected -> CertificateBuilt -> Assembled
//! -> AwaitingSignature -> Signed -> Submitted, and may drop into Failed from
//! any non-terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classification recorded when an attempt terminates early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	NoWalletFound,
	WalletUnavailable,
	InvalidRewardAddress,
	InvalidIdentifier,
	InvalidWalletData,
	ParameterFetchFailed,
	InsufficientFunds,
	ValueTooSmallForChange,
	MaxSizeExceeded,
	SigningRejected,
	SubmissionRejected,
	Internal,
}

impl FailureKind {
	/// A user cancelling in the wallet is not an error banner.
	pub fn is_benign(&self) -> bool {
		matches!(self, FailureKind::SigningRejected)
	}
}

/// State of a single delegation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AttemptState {
	Idle,
	ParamsAndWalletReady,
	Selected,
	CertificateBuilt,
	Assembled,
	AwaitingSignature,
	Signed,
	Submitted,
	Failed(FailureKind),
}

impl AttemptState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, AttemptState::Submitted | AttemptState::Failed(_))
	}
}

impl fmt::Display for AttemptState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttemptState::Idle => f.write_str("idle"),
			AttemptState::ParamsAndWalletReady => f.write_str("params_and_wallet_ready"),
			AttemptState::Selected => f.write_str("selected"),
			AttemptState::CertificateBuilt => f.write_str("certificate_built"),
			AttemptState::Assembled => f.write_str("assembled"),
			AttemptState::AwaitingSignature => f.write_str("awaiting_signature"),
			AttemptState::Signed => f.write_str("signed"),
			AttemptState::Submitted => f.write_str("submitted"),
			AttemptState::Failed(kind) => write!(f, "failed({:?})", kind),
		}
	}
}
