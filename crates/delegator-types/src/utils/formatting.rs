//! Display formatting for identifiers and amounts.

use crate::Lovelace;

const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Shortens a hash or id for log lines: first 8 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Strips an optional "0x"/"0X" prefix some wallets put in front of hex.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders lovelace as ADA with trailing zeros removed, e.g. `2.17 ADA`.
pub fn format_ada(amount: Lovelace) -> String {
	let whole = amount / LOVELACE_PER_ADA;
	let fraction = amount % LOVELACE_PER_ADA;
	if fraction == 0 {
		return format!("{} ADA", whole);
	}
	let digits = format!("{:06}", fraction);
	format!("{}.{} ADA", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("123456789"), "12345678..");
		assert_eq!(truncate_id("attempt-0001"), "attempt-..");
	}

	#[test]
	fn test_without_0x_prefix() {
		assert_eq!(without_0x_prefix("0x84a4"), "84a4");
		assert_eq!(without_0x_prefix("0X84a4"), "84a4");
		assert_eq!(without_0x_prefix("84a4"), "84a4");
	}

	#[test]
	fn test_format_ada() {
		assert_eq!(format_ada(0), "0 ADA");
		assert_eq!(format_ada(2_000_000), "2 ADA");
		assert_eq!(format_ada(2_170_000), "2.17 ADA");
		assert_eq!(format_ada(168_141), "0.168141 ADA");
	}
}
