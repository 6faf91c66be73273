//! Largest-first coin selection.

use crate::DelegationError;
use delegator_ledger::UnspentOutput;
use delegator_types::Lovelace;

/// Picks wallet outputs until their coin covers `target`.
///
/// Outputs are taken by descending coin value. Equal values are ordered by
/// input reference so the result does not depend on the order the wallet
/// listed them in. There is no minimisation pass: selection stops at the
/// first prefix that covers the target, and always includes at least one
/// output.
pub fn select(utxos: &[UnspentOutput], target: Lovelace) -> Result<Vec<UnspentOutput>, DelegationError> {
	let mut candidates: Vec<&UnspentOutput> = utxos.iter().collect();
	candidates.sort_by(|a, b| b.coin().cmp(&a.coin()).then_with(|| a.input.cmp(&b.input)));

	let mut selected = Vec::new();
	let mut total: Lovelace = 0;
	for utxo in candidates {
		if total >= target && !selected.is_empty() {
			break;
		}
		total = total.saturating_add(utxo.coin());
		selected.push(utxo.clone());
	}

	if total < target || selected.is_empty() {
		return Err(DelegationError::InsufficientFunds {
			required: target,
			available: total,
		});
	}
	Ok(selected)
}

/// Sum of the coin held by `utxos`.
pub fn total_coin(utxos: &[UnspentOutput]) -> Lovelace {
	utxos
		.iter()
		.fold(0, |sum: Lovelace, utxo| sum.saturating_add(utxo.coin()))
}
