//! Sequencing of a delegation attempt.
//!
//! The orchestrator is the single entry point the UI calls. It picks a wallet,
//! reads parameters and wallet state concurrently, selects inputs, builds the
//! certificate, assembles the draft, hands it to the wallet for signing and
//! submits the result. Every failure is terminal for the attempt.

use crate::assembler::{assemble, TransactionDraft};
use crate::certificate::CertificateBuilder;
use crate::event_bus::EventBus;
use crate::selection;
use crate::state::AttemptStateMachine;
use crate::DelegationError;
use delegator_config::StakeRegistration;
use delegator_gateway::GatewayService;
use delegator_ledger::{
	attach_witnesses, decode_change_address, decode_drep_id, decode_pool_id,
	decode_reward_address, Address, RewardAddress, UnspentOutput,
};
use delegator_types::{
	format_ada, truncate_id, AttemptState, Certificate, DelegationTarget, IdentifierKind,
	Lovelace, Network, ProtocolParameters, TransactionId,
};
use delegator_wallet::{WalletApi, WalletError, WalletInterface, WalletProviderRegistry};
use std::sync::Arc;
use tracing::instrument;

/// Settings the orchestrator applies to every attempt.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
	pub network: Network,
	pub stake_registration: StakeRegistration,
	pub partial_sign: bool,
}

/// Outcome of a submitted delegation.
#[derive(Debug, Clone)]
pub struct DelegationReceipt {
	pub attempt_id: String,
	pub wallet: String,
	pub target: DelegationTarget,
	pub tx_id: TransactionId,
	pub fee: Lovelace,
	pub deposit: Lovelace,
}

/// A draft built without asking the wallet to sign.
#[derive(Debug, Clone)]
pub struct UnsignedDelegation {
	pub attempt_id: String,
	pub wallet: String,
	pub target: DelegationTarget,
	pub draft: TransactionDraft,
}

impl UnsignedDelegation {
	pub fn tx_hex(&self) -> String {
		self.draft.to_hex()
	}
}

/// Everything read from the wallet once it is enabled.
struct WalletSnapshot {
	api: Arc<dyn WalletApi>,
	network_id: u8,
	reward_addresses: Vec<String>,
	change_address: String,
	utxos: Vec<String>,
}

/// A draft ready for signing, plus the wallet it came from.
struct Prepared {
	wallet: String,
	api: Arc<dyn WalletApi>,
	draft: TransactionDraft,
}

pub struct DelegationOrchestrator {
	settings: OrchestratorSettings,
	gateway: Arc<GatewayService>,
	wallets: Arc<WalletProviderRegistry>,
	event_bus: EventBus,
}

impl DelegationOrchestrator {
	pub fn new(
		settings: OrchestratorSettings,
		gateway: Arc<GatewayService>,
		wallets: Arc<WalletProviderRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			settings,
			gateway,
			wallets,
			event_bus,
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn wallets(&self) -> &WalletProviderRegistry {
		&self.wallets
	}

	pub fn gateway(&self) -> &GatewayService {
		&self.gateway
	}

	pub fn settings(&self) -> &OrchestratorSettings {
		&self.settings
	}

	/// Delegates stake to the pool named by a `pool1...` identifier.
	pub async fn delegate_to_pool(
		&self,
		pool_id: &str,
		preferred_wallet: Option<&str>,
	) -> Result<DelegationReceipt, DelegationError> {
		let mut machine = AttemptStateMachine::new(IdentifierKind::Pool, self.event_bus.clone());
		let target = match decode_pool_id(pool_id) {
			Ok(pool) => DelegationTarget::Pool(pool),
			Err(e) => {
				return Err(Self::abort(
					&mut machine,
					DelegationError::InvalidIdentifier(e.to_string()),
				))
			},
		};
		self.run(&mut machine, target, preferred_wallet).await
	}

	/// Delegates voting power to the DRep named by a `drep1...` identifier.
	pub async fn delegate_to_drep(
		&self,
		drep_id: &str,
		preferred_wallet: Option<&str>,
	) -> Result<DelegationReceipt, DelegationError> {
		let mut machine = AttemptStateMachine::new(IdentifierKind::DRep, self.event_bus.clone());
		let target = match decode_drep_id(drep_id) {
			Ok(drep) => DelegationTarget::DRep(drep),
			Err(e) => {
				return Err(Self::abort(
					&mut machine,
					DelegationError::InvalidIdentifier(e.to_string()),
				))
			},
		};
		self.run(&mut machine, target, preferred_wallet).await
	}

	/// Delegates to an already decoded target.
	pub async fn delegate(
		&self,
		target: DelegationTarget,
		preferred_wallet: Option<&str>,
	) -> Result<DelegationReceipt, DelegationError> {
		let mut machine = AttemptStateMachine::new(target.kind(), self.event_bus.clone());
		self.run(&mut machine, target, preferred_wallet).await
	}

	/// Runs an attempt up to `Assembled` and returns the unsigned transaction.
	pub async fn build_unsigned(
		&self,
		target: DelegationTarget,
		preferred_wallet: Option<&str>,
	) -> Result<UnsignedDelegation, DelegationError> {
		let mut machine = AttemptStateMachine::new(target.kind(), self.event_bus.clone());
		match self.prepare(&mut machine, &target, preferred_wallet).await {
			Ok(prepared) => Ok(UnsignedDelegation {
				attempt_id: machine.attempt_id().to_string(),
				wallet: prepared.wallet,
				target,
				draft: prepared.draft,
			}),
			Err(e) => Err(Self::abort(&mut machine, e)),
		}
	}

	fn abort(machine: &mut AttemptStateMachine, error: DelegationError) -> DelegationError {
		machine.fail(&error);
		error
	}

	async fn run(
		&self,
		machine: &mut AttemptStateMachine,
		target: DelegationTarget,
		preferred_wallet: Option<&str>,
	) -> Result<DelegationReceipt, DelegationError> {
		match self.execute(machine, target, preferred_wallet).await {
			Ok(receipt) => Ok(receipt),
			Err(e) => Err(Self::abort(machine, e)),
		}
	}

	#[instrument(skip_all, fields(attempt_id = %truncate_id(machine.attempt_id()), kind = %target.kind()))]
	async fn execute(
		&self,
		machine: &mut AttemptStateMachine,
		target: DelegationTarget,
		preferred_wallet: Option<&str>,
	) -> Result<DelegationReceipt, DelegationError> {
		let prepared = self.prepare(machine, &target, preferred_wallet).await?;
		let draft = &prepared.draft;

		machine.transition(AttemptState::AwaitingSignature)?;
		tracing::info!(
			wallet = %prepared.wallet,
			fee = %format_ada(draft.fee),
			deposit = %format_ada(draft.deposit),
			"Awaiting wallet signature"
		);
		let signed = prepared
			.api
			.sign_tx(&draft.to_hex(), self.settings.partial_sign)
			.await?;
		let signed_tx = attach_witnesses(draft.body_bytes(), &signed)
			.map_err(|e| DelegationError::InvalidWalletData(e.to_string()))?;
		machine.transition(AttemptState::Signed)?;

		let tx_id = prepared.api.submit_tx(&hex::encode(&signed_tx)).await?;
		let tx_id = TransactionId(tx_id);
		machine.submitted(&tx_id)?;
		tracing::info!(tx_id = %truncate_id(&tx_id.0), wallet = %prepared.wallet, "Delegation submitted");

		Ok(DelegationReceipt {
			attempt_id: machine.attempt_id().to_string(),
			wallet: prepared.wallet,
			target,
			tx_id,
			fee: draft.fee,
			deposit: draft.deposit,
		})
	}

	/// Everything up to and including `Assembled`.
	async fn prepare(
		&self,
		machine: &mut AttemptStateMachine,
		target: &DelegationTarget,
		preferred_wallet: Option<&str>,
	) -> Result<Prepared, DelegationError> {
		let (wallet, provider) = self.wallets.select(preferred_wallet).await?;

		let (params, snapshot) = tokio::join!(self.gateway.fetch_current(), Self::connect(provider));
		let params = params?;
		let snapshot = snapshot?;
		if let Err(e) = self.wallets.remember(&wallet).await {
			tracing::warn!(component = "wallet", wallet = %wallet, error = %e, "Failed to remember wallet");
		}

		let reward = Self::reward_address(&snapshot)?;
		if snapshot.network_id != self.settings.network.network_id()
			|| reward.network_id != self.settings.network.network_id()
		{
			tracing::warn!(
				wallet = %wallet,
				wallet_network = snapshot.network_id,
				configured = %self.settings.network,
				"Wallet is on a different network than configured"
			);
		}
		let change_address = decode_change_address(&snapshot.change_address)
			.map_err(|e| DelegationError::InvalidWalletData(e.to_string()))?;
		let utxos = snapshot
			.utxos
			.iter()
			.map(|raw| UnspentOutput::from_hex(raw))
			.collect::<Result<Vec<_>, _>>()
			.map_err(|e| DelegationError::InvalidWalletData(e.to_string()))?;
		let deposit = self.registration_deposit(&reward, &params).await?;
		machine.transition(AttemptState::ParamsAndWalletReady)?;

		let estimate = deposit.unwrap_or(0).saturating_add(params.linear_fee(0));
		let selected = selection::select(&utxos, estimate)?;
		tracing::debug!(
			inputs = selected.len(),
			selected = %format_ada(selection::total_coin(&selected)),
			"Selected inputs"
		);
		machine.transition(AttemptState::Selected)?;

		let certificate = CertificateBuilder::build(reward.credential, target, deposit);
		machine.transition(AttemptState::CertificateBuilt)?;

		let draft = Self::balance(&utxos, selected, certificate, &change_address, &params)?;
		machine.transition(AttemptState::Assembled)?;
		tracing::info!(
			wallet = %wallet,
			inputs = draft.inputs.len(),
			fee = %format_ada(draft.fee),
			size = draft.size,
			"Transaction assembled"
		);

		Ok(Prepared {
			wallet,
			api: snapshot.api,
			draft,
		})
	}

	/// Enables the wallet and reads what the attempt needs from it.
	async fn connect(provider: Arc<dyn WalletInterface>) -> Result<WalletSnapshot, WalletError> {
		let api = provider.enable().await?;
		tracing::info!(component = "wallet", wallet = %provider.display_name(), "Enabled");
		let network_id = api.get_network_id().await?;
		let reward_addresses = api.get_reward_addresses().await?;
		let change_address = api.get_change_address().await?;
		let utxos = api.get_utxos().await?;
		Ok(WalletSnapshot {
			api,
			network_id,
			reward_addresses,
			change_address,
			utxos,
		})
	}

	/// The wallet's first reward address is the one delegated.
	fn reward_address(snapshot: &WalletSnapshot) -> Result<RewardAddress, DelegationError> {
		let first = snapshot.reward_addresses.first().ok_or_else(|| {
			DelegationError::InvalidRewardAddress("wallet exposes no reward address".into())
		})?;
		decode_reward_address(first).map_err(|e| DelegationError::InvalidRewardAddress(e.to_string()))
	}

	/// Key deposit to attach to the certificate, if the credential needs registering.
	async fn registration_deposit(
		&self,
		reward: &RewardAddress,
		params: &ProtocolParameters,
	) -> Result<Option<Lovelace>, DelegationError> {
		let register = match self.settings.stake_registration {
			StakeRegistration::Always => true,
			StakeRegistration::Never => false,
			StakeRegistration::Auto => !self
				.gateway
				.is_stake_registered(reward)
				.await
				.map_err(|e| DelegationError::Gateway(format!("stake registration lookup failed: {}", e)))?,
		};
		tracing::debug!(register, "Stake registration decided");
		Ok(register.then_some(params.key_deposit))
	}

	/// Assembles the draft, widening the selection while the change is too small.
	fn balance(
		utxos: &[UnspentOutput],
		mut selected: Vec<UnspentOutput>,
		certificate: Certificate,
		change_address: &Address,
		params: &ProtocolParameters,
	) -> Result<TransactionDraft, DelegationError> {
		loop {
			match assemble(selected.clone(), certificate, change_address, params) {
				Ok(draft) => return Ok(draft),
				Err(DelegationError::ValueTooSmallForChange {
					fee,
					deposit,
					minimum,
					..
				}) if selected.len() < utxos.len() => {
					let required = fee.saturating_add(deposit).saturating_add(minimum);
					tracing::debug!(required = %format_ada(required), "Change too small, widening selection");
					selected = selection::select(utxos, required).unwrap_or_else(|_| utxos.to_vec());
				},
				Err(DelegationError::ValueTooSmallForChange {
					available,
					fee,
					deposit,
					..
				}) if available < fee.saturating_add(deposit) => {
					return Err(DelegationError::InsufficientFunds {
						required: fee.saturating_add(deposit),
						available,
					});
				},
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use delegator_gateway::implementations::fixed::FixedGateway;
	use delegator_types::{Hash28, Hash32, StakeCredential, TransactionInput, Value};
	use delegator_wallet::MemoryPreferences;

	fn params() -> ProtocolParameters {
		ProtocolParameters {
			min_fee_a: 44,
			min_fee_b: 155_381,
			coins_per_utxo_byte: 4_310,
			pool_deposit: 500_000_000,
			key_deposit: 2_000_000,
			max_tx_size: 16_384,
			max_value_size: 5_000,
		}
	}

	fn address() -> Address {
		Address::Base {
			network_id: 1,
			payment: delegator_ledger::PaymentCredential::KeyHash(Hash28::new([0x07; 28])),
			stake: StakeCredential::KeyHash(Hash28::new([0x11; 28])),
		}
	}

	fn utxo(tag: u8, coin: Lovelace) -> UnspentOutput {
		UnspentOutput::new(
			TransactionInput {
				tx_hash: Hash32::new([tag; 32]),
				index: 0,
			},
			address().to_bytes(),
			Value::coin(coin),
		)
		.unwrap()
	}

	fn certificate(deposit: Option<Lovelace>) -> Certificate {
		CertificateBuilder::build(
			StakeCredential::KeyHash(Hash28::new([0x11; 28])),
			&DelegationTarget::Pool(delegator_types::PoolId(Hash28::new([0x22; 28]))),
			deposit,
		)
	}

	#[test]
	fn test_balance_widens_selection_for_minimum_change() {
		// the largest output covers the estimate but leaves dust change
		let utxos = vec![utxo(1, 2_300_000), utxo(2, 1_500_000)];
		let selected = selection::select(&utxos, 2_155_381).unwrap();
		assert_eq!(selected.len(), 1);

		let draft = DelegationOrchestrator::balance(
			&utxos,
			selected,
			certificate(Some(2_000_000)),
			&address(),
			&params(),
		)
		.unwrap();
		assert_eq!(draft.inputs.len(), 2);
		assert_eq!(draft.input_coin(), draft.change.value.coin + draft.fee + draft.deposit);
	}

	#[test]
	fn test_balance_reports_shortfall_once_exhausted() {
		let utxos = vec![utxo(1, 2_100_000)];
		let err = DelegationOrchestrator::balance(
			&utxos,
			utxos.clone(),
			certificate(Some(2_000_000)),
			&address(),
			&params(),
		)
		.unwrap_err();
		assert!(matches!(err, DelegationError::InsufficientFunds { available: 2_100_000, .. }));

		// enough for fee and deposit but not for the minimum change
		let utxos = vec![utxo(1, 2_400_000)];
		let err = DelegationOrchestrator::balance(
			&utxos,
			utxos.clone(),
			certificate(Some(2_000_000)),
			&address(),
			&params(),
		)
		.unwrap_err();
		assert!(matches!(err, DelegationError::ValueTooSmallForChange { .. }));
	}

	#[tokio::test]
	async fn test_unknown_wallet_preference_without_providers_fails() {
		let gateway = FixedGateway::new(
			toml::Value::Table(Default::default()).try_into().unwrap(),
		);
		let orchestrator = DelegationOrchestrator::new(
			OrchestratorSettings {
				network: Network::Mainnet,
				stake_registration: StakeRegistration::Never,
				partial_sign: true,
			},
			Arc::new(GatewayService::new("fixed", Box::new(gateway))),
			Arc::new(WalletProviderRegistry::new(
				Default::default(),
				vec![],
				Arc::new(MemoryPreferences::new()),
			)),
			EventBus::default(),
		);
		let target = DelegationTarget::Pool(delegator_types::PoolId(Hash28::new([0x22; 28])));
		assert!(matches!(
			orchestrator.delegate(target, Some("eternl")).await,
			Err(DelegationError::NoWalletFound)
		));
	}
}
