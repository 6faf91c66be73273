//! Common types module for the delegation transaction builder.
//!
//! This module defines the ledger-facing data types shared by every crate of
//! the workspace: hashes and credentials, delegation targets and certificates,
//! protocol parameters, attempt states and the events published while a
//! delegation attempt runs.

/// Attempt lifecycle states and failure reasons.
pub mod attempt;
/// Certificate variants carried by delegation transactions.
pub mod certificate;
/// Stake credentials and delegation targets.
pub mod delegation;
/// Event types published during a delegation attempt.
pub mod events;
/// Network discriminants and their textual prefixes.
pub mod network;
/// Protocol parameter snapshot used for fee and deposit computation.
pub mod params;
/// Fixed-size hashes and ledger amounts.
pub mod primitives;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for API keys.
pub mod secret_string;
/// Utility functions for formatting and time.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use attempt::*;
pub use certificate::*;
pub use delegation::*;
pub use events::*;
pub use network::Network;
pub use params::ProtocolParameters;
pub use primitives::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{current_timestamp, format_ada, truncate_id, without_0x_prefix};
pub use validation::*;
