//! Registry trait for self-registering implementations.
//!
//! Wallet providers and parameter gateways are selected by name from the
//! configuration file. Every implementation module exposes a `Registry`
//! struct implementing this trait so the builder can map that name to a
//! factory without a hand-maintained match.

/// Name and factory of one configurable implementation.
pub trait ImplementationRegistry {
	/// Key used in the configuration, e.g. `"blockfrost"` for
	/// `gateway.implementations.blockfrost` or `"bridge"` for a wallet
	/// provider's `implementation = "bridge"`.
	const NAME: &'static str;

	/// Factory signature of the owning module (`WalletFactory`, `GatewayFactory`).
	type Factory;

	fn factory() -> Self::Factory;
}
