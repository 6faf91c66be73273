//! Events published while delegation attempts run.
//!
//! Observers (a UI, the CLI, logs) subscribe to these through the event bus
//! owned by the orchestrator.

use crate::{AttemptState, FailureKind, IdentifierKind, TransactionId};
use serde::{Deserialize, Serialize};

/// Event emitted by a delegation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DelegationEvent {
	/// The attempt moved between two states.
	Transition {
		attempt_id: String,
		kind: IdentifierKind,
		from: AttemptState,
		to: AttemptState,
	},
	/// The wallet accepted the signed transaction for submission.
	Submitted {
		attempt_id: String,
		kind: IdentifierKind,
		tx_id: TransactionId,
	},
	/// The attempt terminated with a classified failure.
	Failed {
		attempt_id: String,
		kind: IdentifierKind,
		failure: FailureKind,
		message: String,
	},
}

impl DelegationEvent {
	pub fn attempt_id(&self) -> &str {
		match self {
			DelegationEvent::Transition { attempt_id, .. }
			| DelegationEvent::Submitted { attempt_id, .. }
			| DelegationEvent::Failed { attempt_id, .. } => attempt_id,
		}
	}
}
