//! Command implementations.
//!
//! Delegation failures are reported as their classified user message only;
//! the underlying wallet or gateway text stays in the logs.

use crate::TargetArg;
use delegator_config::TargetsConfig;
use delegator_core::{DelegationError, DelegationOrchestrator};
use delegator_ledger::{decode_drep_id, decode_pool_id};
use delegator_types::{format_ada, DelegationEvent, DelegationTarget, IdentifierKind};
use std::io::Write;
use std::process::ExitCode;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type CommandResult = Result<ExitCode, Box<dyn std::error::Error>>;

impl TargetArg {
	fn kind(&self) -> IdentifierKind {
		match self {
			TargetArg::Pool { .. } => IdentifierKind::Pool,
			TargetArg::Drep { .. } => IdentifierKind::DRep,
		}
	}

	fn id(&self) -> Option<&str> {
		match self {
			TargetArg::Pool { id } | TargetArg::Drep { id } => id.as_deref(),
		}
	}
}

/// The identifier given on the command line, or the first configured one.
pub fn resolve_id<'a>(
	target: &'a TargetArg,
	targets: &'a TargetsConfig,
) -> Result<&'a str, DelegationError> {
	let kind = target.kind();
	target
		.id()
		.or_else(|| targets.default_for(kind))
		.ok_or_else(|| {
			DelegationError::InvalidIdentifier(format!("no {} identifier given or configured", kind))
		})
}

/// Decodes the identifier for the requested target kind.
pub fn parse_target(target: &TargetArg, targets: &TargetsConfig) -> Result<DelegationTarget, DelegationError> {
	let id = resolve_id(target, targets)?;
	let decoded = match target {
		TargetArg::Pool { .. } => decode_pool_id(id).map(DelegationTarget::Pool),
		TargetArg::Drep { .. } => decode_drep_id(id).map(DelegationTarget::DRep),
	};
	decoded.map_err(|e| DelegationError::InvalidIdentifier(e.to_string()))
}

/// Writes the classified message and picks the exit code.
///
/// Benign failures, such as the user declining to sign, exit successfully.
fn report(error: &DelegationError, kind: IdentifierKind, out: &mut impl Write) -> ExitCode {
	let message = error.user_message(kind);
	tracing::debug!(failure = ?error.kind(), "Command failed");
	// stderr is all that is left to report to
	let _ = writeln!(out, "{}: {}", message.title, message.body);
	if error.is_benign() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

pub fn providers(orchestrator: &DelegationOrchestrator) -> CommandResult {
	let wallets = orchestrator.wallets();
	for key in wallets.ordered_providers() {
		if let Some(provider) = wallets.get(&key) {
			println!("{:<16} {}", key, provider.display_name());
		}
	}
	Ok(ExitCode::SUCCESS)
}

pub fn targets(targets: &TargetsConfig) -> CommandResult {
	for kind in [IdentifierKind::Pool, IdentifierKind::DRep] {
		for (index, id) in targets.of_kind(kind).iter().enumerate() {
			let marker = if index == 0 { "*" } else { " " };
			println!("{} {:<5} {}", marker, kind, id);
		}
	}
	Ok(ExitCode::SUCCESS)
}

pub async fn params(orchestrator: &DelegationOrchestrator) -> CommandResult {
	match orchestrator.gateway().fetch_current().await {
		Ok(params) => {
			println!("{}", serde_json::to_string_pretty(&params)?);
			Ok(ExitCode::SUCCESS)
		},
		Err(e) => Ok(report(
			&DelegationError::from(e),
			IdentifierKind::Pool,
			&mut std::io::stderr(),
		)),
	}
}

pub async fn build(
	orchestrator: &DelegationOrchestrator,
	targets: &TargetsConfig,
	target: &TargetArg,
	wallet: Option<&str>,
) -> CommandResult {
	let decoded = match parse_target(target, targets) {
		Ok(decoded) => decoded,
		Err(e) => return Ok(report(&e, target.kind(), &mut std::io::stderr())),
	};
	match orchestrator.build_unsigned(decoded, wallet).await {
		Ok(unsigned) => {
			let draft = &unsigned.draft;
			eprintln!("wallet:  {}", unsigned.wallet);
			eprintln!("inputs:  {}", draft.inputs.len());
			eprintln!("fee:     {}", format_ada(draft.fee));
			eprintln!("deposit: {}", format_ada(draft.deposit));
			eprintln!("change:  {}", format_ada(draft.change.value.coin));
			eprintln!("size:    {} bytes", draft.size);
			println!("{}", unsigned.tx_hex());
			Ok(ExitCode::SUCCESS)
		},
		Err(e) => Ok(report(&e, target.kind(), &mut std::io::stderr())),
	}
}

fn progress_line(event: &DelegationEvent) -> Option<String> {
	match event {
		DelegationEvent::Transition { to, .. } => Some(format!("-> {}", to)),
		_ => None,
	}
}

/// Prints attempt progress until `done` fires, then drains what is buffered.
///
/// The task yields the number of lines printed.
fn spawn_progress(
	mut events: broadcast::Receiver<DelegationEvent>,
) -> (oneshot::Sender<()>, JoinHandle<usize>) {
	let (done, mut finished) = oneshot::channel::<()>();
	let task = tokio::spawn(async move {
		let mut printed = 0;
		let mut print = |event: &DelegationEvent| {
			if let Some(line) = progress_line(event) {
				eprintln!("{}", line);
				printed += 1;
			}
		};
		loop {
			tokio::select! {
				event = events.recv() => match event {
					Ok(event) => print(&event),
					Err(RecvError::Lagged(_)) => continue,
					Err(RecvError::Closed) => break,
				},
				_ = &mut finished => {
					loop {
						match events.try_recv() {
							Ok(event) => print(&event),
							Err(TryRecvError::Lagged(_)) => continue,
							Err(_) => break,
						}
					}
					break;
				},
			}
		}
		printed
	});
	(done, task)
}

pub async fn delegate(
	orchestrator: &DelegationOrchestrator,
	targets: &TargetsConfig,
	target: &TargetArg,
	wallet: Option<&str>,
) -> CommandResult {
	let id = match resolve_id(target, targets) {
		Ok(id) => id,
		Err(e) => return Ok(report(&e, target.kind(), &mut std::io::stderr())),
	};

	let (done, progress) = spawn_progress(orchestrator.event_bus().subscribe());
	let result = match target {
		TargetArg::Pool { .. } => orchestrator.delegate_to_pool(id, wallet).await,
		TargetArg::Drep { .. } => orchestrator.delegate_to_drep(id, wallet).await,
	};
	let _ = done.send(());
	let _ = progress.await;

	match result {
		Ok(receipt) => {
			eprintln!(
				"Delegated to {} via {}: fee {}, deposit {}",
				id,
				receipt.wallet,
				format_ada(receipt.fee),
				format_ada(receipt.deposit)
			);
			println!("{}", receipt.tx_id);
			Ok(ExitCode::SUCCESS)
		},
		Err(e) => Ok(report(&e, target.kind(), &mut std::io::stderr())),
	}
}
