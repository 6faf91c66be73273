//! Attempt state machine.
//!
//! An attempt moves strictly forward through
//! Idle -> ParamsAndWalletReady -> Selected -> CertificateBuilt -> Assembled
//! -> AwaitingSignature -> Signed -> Submitted. Failed is reachable from every
//! non-terminal state. Nothing leaves a terminal state.

use crate::{event_bus::EventBus, DelegationError};
use delegator_types::{
	truncate_id, AttemptState, DelegationEvent, IdentifierKind, TransactionId,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ATTEMPT: AtomicU64 = AtomicU64::new(1);

/// Tracks one delegation attempt and reports its progress.
pub struct AttemptStateMachine {
	attempt_id: String,
	kind: IdentifierKind,
	state: AttemptState,
	history: Vec<AttemptState>,
	event_bus: EventBus,
}

impl AttemptStateMachine {
	/// Starts a new attempt in `Idle` with a fresh id.
	pub fn new(kind: IdentifierKind, event_bus: EventBus) -> Self {
		let sequence = NEXT_ATTEMPT.fetch_add(1, Ordering::Relaxed);
		let attempt_id = format!("{}-{}", delegator_types::current_timestamp(), sequence);
		Self {
			attempt_id,
			kind,
			state: AttemptState::Idle,
			history: vec![AttemptState::Idle],
			event_bus,
		}
	}

	pub fn attempt_id(&self) -> &str {
		&self.attempt_id
	}

	pub fn kind(&self) -> IdentifierKind {
		self.kind
	}

	pub fn state(&self) -> AttemptState {
		self.state
	}

	/// Every state the attempt has been in, oldest first.
	pub fn history(&self) -> &[AttemptState] {
		&self.history
	}

	/// Moves to `to` if the transition table allows it.
	pub fn transition(&mut self, to: AttemptState) -> Result<(), DelegationError> {
		let from = self.state;
		if !Self::is_valid_transition(&from, &to) {
			return Err(DelegationError::InvalidTransition { from, to });
		}

		self.state = to;
		self.history.push(to);
		tracing::debug!(
			attempt_id = %truncate_id(&self.attempt_id),
			from = %from,
			to = %to,
			"Attempt transition"
		);
		self.event_bus
			.publish(DelegationEvent::Transition {
				attempt_id: self.attempt_id.clone(),
				kind: self.kind,
				from,
				to,
			})
			.ok();
		Ok(())
	}

	/// Terminates the attempt with the failure classified from `error`.
	///
	/// A no-op once the attempt is already terminal.
	pub fn fail(&mut self, error: &DelegationError) {
		let failure = error.kind();
		if self.transition(AttemptState::Failed(failure)).is_err() {
			tracing::warn!(
				attempt_id = %truncate_id(&self.attempt_id),
				state = %self.state,
				error = %error,
				"Failure reported for finished attempt"
			);
			return;
		}

		if error.is_benign() {
			tracing::info!(attempt_id = %truncate_id(&self.attempt_id), "Delegation cancelled by user");
		} else {
			tracing::warn!(
				attempt_id = %truncate_id(&self.attempt_id),
				failure = ?failure,
				error = %error,
				"Delegation failed"
			);
		}
		self.event_bus
			.publish(DelegationEvent::Failed {
				attempt_id: self.attempt_id.clone(),
				kind: self.kind,
				failure,
				message: error.user_message(self.kind).body,
			})
			.ok();
	}

	/// Records the submission and announces the transaction id.
	pub fn submitted(&mut self, tx_id: &TransactionId) -> Result<(), DelegationError> {
		self.transition(AttemptState::Submitted)?;
		self.event_bus
			.publish(DelegationEvent::Submitted {
				attempt_id: self.attempt_id.clone(),
				kind: self.kind,
				tx_id: tx_id.clone(),
			})
			.ok();
		Ok(())
	}

	/// Checks if a state transition is valid
	fn is_valid_transition(from: &AttemptState, to: &AttemptState) -> bool {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		enum StateKind {
			Idle,
			ParamsAndWalletReady,
			Selected,
			CertificateBuilt,
			Assembled,
			AwaitingSignature,
			Signed,
			Submitted,
			Failed,
		}

		static TRANSITIONS: Lazy<HashMap<StateKind, HashSet<StateKind>>> = Lazy::new(|| {
			let forward = [
				(StateKind::Idle, StateKind::ParamsAndWalletReady),
				(StateKind::ParamsAndWalletReady, StateKind::Selected),
				(StateKind::Selected, StateKind::CertificateBuilt),
				(StateKind::CertificateBuilt, StateKind::Assembled),
				(StateKind::Assembled, StateKind::AwaitingSignature),
				(StateKind::AwaitingSignature, StateKind::Signed),
				(StateKind::Signed, StateKind::Submitted),
			];
			let mut m = HashMap::new();
			for (from, to) in forward {
				m.insert(from, HashSet::from([to, StateKind::Failed]));
			}
			m.insert(StateKind::Submitted, HashSet::new()); // terminal
			m.insert(StateKind::Failed, HashSet::new()); // terminal
			m
		});

		let state_kind = |state: &AttemptState| -> StateKind {
			match state {
				AttemptState::Idle => StateKind::Idle,
				AttemptState::ParamsAndWalletReady => StateKind::ParamsAndWalletReady,
				AttemptState::Selected => StateKind::Selected,
				AttemptState::CertificateBuilt => StateKind::CertificateBuilt,
				AttemptState::Assembled => StateKind::Assembled,
				AttemptState::AwaitingSignature => StateKind::AwaitingSignature,
				AttemptState::Signed => StateKind::Signed,
				AttemptState::Submitted => StateKind::Submitted,
				AttemptState::Failed(_) => StateKind::Failed,
			}
		};

		TRANSITIONS
			.get(&state_kind(from))
			.is_some_and(|allowed| allowed.contains(&state_kind(to)))
	}
}
