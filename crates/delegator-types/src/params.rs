//! Protocol parameter snapshot.

use crate::Lovelace;
use serde::{Deserialize, Serialize};

/// Ledger cost parameters fetched once per delegation attempt.
///
/// The snapshot is only valid for the attempt that fetched it; it is never
/// cached between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
	/// Per-byte fee coefficient.
	pub min_fee_a: u64,
	/// Constant fee term.
	pub min_fee_b: u64,
	/// Lovelace required per byte of a stored output.
	pub coins_per_utxo_byte: u64,
	pub pool_deposit: Lovelace,
	pub key_deposit: Lovelace,
	pub max_tx_size: u32,
	pub max_value_size: u32,
}

impl ProtocolParameters {
	/// Linear fee for a transaction of `size` bytes: `min_fee_a * size + min_fee_b`.
	pub fn linear_fee(&self, size: usize) -> Lovelace {
		self.min_fee_a
			.saturating_mul(size as u64)
			.saturating_add(self.min_fee_b)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

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

	#[test]
	fn test_linear_fee() {
		assert_eq!(params().linear_fee(0), 155_381);
		assert_eq!(params().linear_fee(300), 155_381 + 44 * 300);
	}

	#[test]
	fn test_linear_fee_is_monotonic_in_size() {
		let p = params();
		let mut previous = 0;
		for size in (0..20_000).step_by(97) {
			let fee = p.linear_fee(size);
			assert!(fee >= previous);
			previous = fee;
		}
	}
}
