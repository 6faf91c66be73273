//! Formatting and time helpers shared across the workspace.

pub mod formatting;
pub mod helpers;

pub use formatting::{format_ada, truncate_id, without_0x_prefix};
pub use helpers::current_timestamp;
