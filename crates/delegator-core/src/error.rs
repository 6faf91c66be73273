//! Failure taxonomy of a delegation attempt.
//!
//! Every error that ends an attempt is one of these variants. None of them is
//! retried automatically; the caller decides whether to start a new attempt.

use delegator_gateway::GatewayError;
use delegator_types::{format_ada, AttemptState, FailureKind, IdentifierKind, Lovelace};
use delegator_wallet::{ApiErrorCode, SignErrorCode, WalletError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
	#[error("No wallet found")]
	NoWalletFound,
	#[error("Wallet unavailable: {0}")]
	WalletUnavailable(String),
	#[error("Invalid reward address: {0}")]
	InvalidRewardAddress(String),
	#[error("Invalid identifier: {0}")]
	InvalidIdentifier(String),
	#[error("Invalid wallet data: {0}")]
	InvalidWalletData(String),
	#[error("Protocol parameter fetch failed: {message}")]
	ParameterFetchFailed { status: Option<u16>, message: String },
	#[error("Insufficient funds: need {required} lovelace, wallet holds {available}")]
	InsufficientFunds { required: Lovelace, available: Lovelace },
	#[error(
		"Change too small: inputs of {available} lovelace leave less than {minimum} after fee {fee} and deposit {deposit}"
	)]
	ValueTooSmallForChange {
		available: Lovelace,
		fee: Lovelace,
		deposit: Lovelace,
		minimum: Lovelace,
	},
	#[error("Transaction of {size} bytes exceeds the maximum of {max}")]
	MaxSizeExceeded { size: usize, max: u32 },
	#[error("Change value of {size} bytes exceeds the maximum of {max}")]
	MaxValueSizeExceeded { size: usize, max: u32 },
	#[error("Signing rejected: {0}")]
	SigningRejected(String),
	#[error("Submission rejected: {0}")]
	SubmissionRejected(String),
	#[error("Gateway error: {0}")]
	Gateway(String),
	#[error("Wallet error: {0}")]
	Wallet(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: AttemptState, to: AttemptState },
	#[error("Internal error: {0}")]
	Internal(String),
}

impl DelegationError {
	/// The failure reason recorded in the terminal `Failed` state.
	pub fn kind(&self) -> FailureKind {
		match self {
			DelegationError::NoWalletFound => FailureKind::NoWalletFound,
			DelegationError::WalletUnavailable(_) => FailureKind::WalletUnavailable,
			DelegationError::InvalidRewardAddress(_) => FailureKind::InvalidRewardAddress,
			DelegationError::InvalidIdentifier(_) => FailureKind::InvalidIdentifier,
			DelegationError::InvalidWalletData(_) => FailureKind::InvalidWalletData,
			DelegationError::ParameterFetchFailed { .. } => FailureKind::ParameterFetchFailed,
			DelegationError::InsufficientFunds { .. } => FailureKind::InsufficientFunds,
			DelegationError::ValueTooSmallForChange { .. } => FailureKind::ValueTooSmallForChange,
			DelegationError::MaxSizeExceeded { .. } | DelegationError::MaxValueSizeExceeded { .. } => {
				FailureKind::MaxSizeExceeded
			},
			DelegationError::SigningRejected(_) => FailureKind::SigningRejected,
			DelegationError::SubmissionRejected(_) => FailureKind::SubmissionRejected,
			DelegationError::Gateway(_)
			| DelegationError::Wallet(_)
			| DelegationError::InvalidTransition { .. }
			| DelegationError::Internal(_) => FailureKind::Internal,
		}
	}

	/// A user cancelling is an expected outcome, not a fault.
	pub fn is_benign(&self) -> bool {
		self.kind().is_benign()
	}

	/// Short title and body suitable for showing to the user.
	///
	/// Provider text only appears for kinds where it is already classified;
	/// anything unexpected gets a generic body.
	pub fn user_message(&self, target: IdentifierKind) -> UserMessage {
		let (title, body) = match self {
			DelegationError::NoWalletFound => (
				"No wallet found",
				"Please install a Cardano wallet (Eternl, Nami, Lace) and refresh.".to_string(),
			),
			DelegationError::WalletUnavailable(_) => (
				"Wallet unavailable",
				"The wallet refused access or switched accounts. Reconnect and try again."
					.to_string(),
			),
			DelegationError::InvalidRewardAddress(_) => (
				"Staking key missing",
				"Your wallet doesn't have a staking key.".to_string(),
			),
			DelegationError::InvalidIdentifier(_) => (
				"Invalid identifier",
				match target {
					IdentifierKind::Pool => "The pool id is not a valid pool1 identifier.",
					IdentifierKind::DRep => "The DRep id is not a valid drep1 identifier.",
				}
				.to_string(),
			),
			DelegationError::InvalidWalletData(_) => (
				"Wallet data unreadable",
				"The wallet returned addresses or UTXOs that could not be read.".to_string(),
			),
			DelegationError::ParameterFetchFailed { .. } => (
				"Network unavailable",
				"Could not fetch current protocol parameters. Please try again later.".to_string(),
			),
			DelegationError::InsufficientFunds {
				required,
				available,
			} => (
				"Insufficient funds",
				format!(
					"This delegation needs {} for fee and deposit; the wallet holds {}.",
					format_ada(*required),
					format_ada(*available)
				),
			),
			DelegationError::ValueTooSmallForChange {
				fee,
				deposit,
				minimum,
				..
			} => (
				"Insufficient funds",
				format!(
					"The wallet needs at least {} to cover the fee, deposit and minimum change.",
					format_ada(fee.saturating_add(*deposit).saturating_add(*minimum))
				),
			),
			DelegationError::MaxSizeExceeded { .. } | DelegationError::MaxValueSizeExceeded { .. } => (
				"Transaction too large",
				"The wallet holds too many small outputs to fit one transaction. Consolidate them first."
					.to_string(),
			),
			DelegationError::SigningRejected(_) => (
				"Transaction rejected",
				"You rejected the transaction. Please try again.".to_string(),
			),
			DelegationError::SubmissionRejected(_) => (
				"Transaction failed",
				"Transaction was rejected by the network.".to_string(),
			),
			DelegationError::Gateway(_)
			| DelegationError::Wallet(_)
			| DelegationError::InvalidTransition { .. }
			| DelegationError::Internal(_) => (
				match target {
					IdentifierKind::Pool => "Pool delegation failed",
					IdentifierKind::DRep => "DRep delegation failed",
				},
				"Something went wrong while building the transaction.".to_string(),
			),
		};
		UserMessage { title, body }
	}
}

/// What the user sees when an attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
	pub title: &'static str,
	pub body: String,
}

impl From<WalletError> for DelegationError {
	fn from(err: WalletError) -> Self {
		match err {
			WalletError::NoWalletFound => DelegationError::NoWalletFound,
			WalletError::Api {
				code: ApiErrorCode::Refused | ApiErrorCode::AccountChange,
				info,
			} => DelegationError::WalletUnavailable(info),
			WalletError::Sign {
				code: SignErrorCode::UserDeclined,
				info,
			} => DelegationError::SigningRejected(info),
			WalletError::Send { info, .. } => DelegationError::SubmissionRejected(info),
			other => DelegationError::Wallet(other.to_string()),
		}
	}
}

impl From<GatewayError> for DelegationError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::Configuration(message) => DelegationError::Gateway(message),
			other => DelegationError::ParameterFetchFailed {
				status: other.status(),
				message: other.to_string(),
			},
		}
	}
}
