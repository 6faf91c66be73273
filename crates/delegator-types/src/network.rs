//! Network discriminants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cardano network the builder targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	#[default]
	Mainnet,
	Preprod,
	Preview,
}

impl Network {
	/// Network id nibble stored in Shelley address headers.
	pub fn network_id(&self) -> u8 {
		match self {
			Network::Mainnet => 1,
			Network::Preprod | Network::Preview => 0,
		}
	}

	/// Human readable prefix used for reward addresses.
	pub fn stake_hrp(&self) -> &'static str {
		match self {
			Network::Mainnet => "stake",
			Network::Preprod | Network::Preview => "stake_test",
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Network::Mainnet => f.write_str("mainnet"),
			Network::Preprod => f.write_str("preprod"),
			Network::Preview => f.write_str("preview"),
		}
	}
}

impl FromStr for Network {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"mainnet" => Ok(Network::Mainnet),
			"preprod" => Ok(Network::Preprod),
			"preview" => Ok(Network::Preview),
			other => Err(format!("Unknown network '{}'", other)),
		}
	}
}
