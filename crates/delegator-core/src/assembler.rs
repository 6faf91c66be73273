//! Fee-balanced assembly of the delegation transaction.
//!
//! The fee depends on the serialized size, and the size depends on the change
//! output, which depends on the fee. Assembly therefore starts from a draft
//! without change, then alternates between writing the change output and
//! recomputing the fee until the fee stops growing.

use crate::DelegationError;
use delegator_ledger::{
	encode_transaction, encode_value, Address, LedgerError, TransactionBody, TransactionOutput,
	UnspentOutput, WitnessAllowance,
};
use delegator_types::{Certificate, Lovelace, ProtocolParameters, StakeCredential, Value};
use std::collections::BTreeSet;

/// Fee refinement converges after two passes in practice.
const MAX_FEE_PASSES: usize = 4;
/// Per-output overhead in bytes of the Babbage minimum-UTxO rule.
const UTXO_ENTRY_OVERHEAD: u64 = 160;
const EMPTY_WITNESS_SET: [u8; 1] = [0xa0];

/// A balanced, unsigned delegation transaction.
///
/// `sum(inputs) == change + fee + deposit` holds for every draft returned by
/// [`assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
	pub inputs: Vec<UnspentOutput>,
	pub certificate: Certificate,
	pub change: TransactionOutput,
	pub fee: Lovelace,
	pub deposit: Lovelace,
	/// Fee of the first pass, before the change output existed.
	pub provisional_fee: Lovelace,
	/// Witnesses the fee was sized for.
	pub witness_allowance: WitnessAllowance,
	/// Size in bytes of the transaction once the wallet's witnesses are in.
	pub size: usize,
	body: Vec<u8>,
}

impl TransactionDraft {
	/// Structured body, inputs in canonical order.
	pub fn body(&self) -> TransactionBody {
		TransactionBody {
			inputs: self.inputs.iter().map(|utxo| utxo.input).collect(),
			outputs: vec![self.change.clone()],
			fee: self.fee,
			certificates: vec![self.certificate],
		}
	}

	/// The exact body bytes the wallet signs.
	pub fn body_bytes(&self) -> &[u8] {
		&self.body
	}

	/// `[body, {}, true, null]`, the form handed to `signTx`.
	pub fn unsigned_bytes(&self) -> Vec<u8> {
		encode_transaction(&self.body, &EMPTY_WITNESS_SET)
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.unsigned_bytes())
	}

	pub fn input_coin(&self) -> Lovelace {
		self.inputs
			.iter()
			.fold(0, |sum: Lovelace, utxo| sum.saturating_add(utxo.coin()))
	}
}

fn internal(err: LedgerError) -> DelegationError {
	DelegationError::Internal(err.to_string())
}

/// Babbage minimum-UTxO: `(160 + serialized output size) * coins_per_utxo_byte`.
pub fn min_utxo(output: &TransactionOutput, params: &ProtocolParameters) -> Result<Lovelace, DelegationError> {
	let size = output.to_cbor().map_err(internal)?.len() as u64;
	Ok(UTXO_ENTRY_OVERHEAD
		.saturating_add(size)
		.saturating_mul(params.coins_per_utxo_byte))
}

/// Witnesses the wallet will add: one vkey witness per distinct payment key
/// among the inputs plus one for a key-hash stake credential, and one
/// bootstrap witness per distinct Byron address.
pub fn witness_allowance(
	inputs: &[UnspentOutput],
	certificate: &Certificate,
) -> Result<WitnessAllowance, DelegationError> {
	let mut signers = BTreeSet::new();
	let mut byron = BTreeSet::new();
	for utxo in inputs {
		let invalid = |e: LedgerError| {
			DelegationError::InvalidWalletData(format!("UTXO {}: {}", utxo.input, e))
		};
		let address = Address::from_bytes(&utxo.address).map_err(invalid)?;
		if let Some(signer) = address.signer() {
			signers.insert(signer);
		} else if let Some(attributes) = address.bootstrap_attributes().map_err(invalid)? {
			byron.insert((utxo.address.clone(), attributes));
		}
	}
	let stake_key = usize::from(matches!(certificate.credential(), StakeCredential::KeyHash(_)));
	Ok(WitnessAllowance {
		vkeys: signers.len() + stake_key,
		bootstrap: byron.into_iter().map(|(_, attributes)| attributes).collect(),
	})
}

fn transaction_size(body: &TransactionBody, witness_set: &[u8]) -> Result<usize, DelegationError> {
	let body = body.to_cbor().map_err(internal)?;
	Ok(encode_transaction(&body, witness_set).len())
}

/// Builds the fee-balanced draft spending `inputs`.
///
/// The deposit is the one carried by `certificate`. All input assets are
/// returned in the single change output.
pub fn assemble(
	inputs: Vec<UnspentOutput>,
	certificate: Certificate,
	change_address: &Address,
	params: &ProtocolParameters,
) -> Result<TransactionDraft, DelegationError> {
	if inputs.is_empty() {
		return Err(DelegationError::Internal("no inputs selected".into()));
	}
	if !change_address.is_payment() {
		return Err(DelegationError::InvalidWalletData(
			"change address cannot hold outputs".into(),
		));
	}

	let total = inputs
		.iter()
		.try_fold(Value::default(), |sum, utxo| sum.checked_add(&utxo.value))
		.ok_or_else(|| DelegationError::InvalidWalletData("input values overflow".into()))?;
	let available = total.coin;
	let deposit = certificate.deposit();

	let witness_allowance = witness_allowance(&inputs, &certificate)?;
	let witness_set = witness_allowance.placeholder_set().map_err(internal)?;

	let mut body = TransactionBody {
		inputs: inputs.iter().map(|utxo| utxo.input).collect(),
		outputs: Vec::new(),
		fee: 0,
		certificates: vec![certificate],
	};
	let provisional_fee = params.linear_fee(transaction_size(&body, &witness_set)?);

	let change_output = |coin: Lovelace| TransactionOutput {
		address: change_address.to_bytes(),
		value: Value {
			coin,
			assets: total.assets.clone(),
		},
	};

	let mut fee = provisional_fee;
	let mut converged = None;
	for pass in 0..MAX_FEE_PASSES {
		let Some(change_coin) = available.checked_sub(fee.saturating_add(deposit)) else {
			return Err(DelegationError::ValueTooSmallForChange {
				available,
				fee,
				deposit,
				minimum: min_utxo(&change_output(0), params)?,
			});
		};
		body.outputs = vec![change_output(change_coin)];
		body.fee = fee;

		let size = transaction_size(&body, &witness_set)?;
		let required = params.linear_fee(size);
		tracing::trace!(pass, size, fee, required, "Fee pass");
		if required <= fee {
			converged = Some(size);
			break;
		}
		fee = required;
	}
	let size = converged
		.ok_or_else(|| DelegationError::Internal("fee did not converge".into()))?;

	let change = body
		.outputs
		.first()
		.cloned()
		.ok_or_else(|| DelegationError::Internal("change output missing".into()))?;

	let minimum = min_utxo(&change, params)?;
	if change.value.coin < minimum {
		return Err(DelegationError::ValueTooSmallForChange {
			available,
			fee,
			deposit,
			minimum,
		});
	}

	let value_size = encode_value(&change.value).map_err(internal)?.len();
	if value_size > params.max_value_size as usize {
		return Err(DelegationError::MaxValueSizeExceeded {
			size: value_size,
			max: params.max_value_size,
		});
	}

	if size > params.max_tx_size as usize {
		return Err(DelegationError::MaxSizeExceeded {
			size,
			max: params.max_tx_size,
		});
	}

	debug_assert_eq!(available, change.value.coin + fee + deposit);

	let mut inputs = inputs;
	inputs.sort_by(|a, b| a.input.cmp(&b.input));
	let body_bytes = body.to_cbor().map_err(internal)?;

	Ok(TransactionDraft {
		inputs,
		certificate,
		change,
		fee,
		deposit,
		provisional_fee,
		witness_allowance,
		size,
		body: body_bytes,
	})
}
