//! Lifecycle tracking for delegation attempts.
//!
//! Each attempt owns one state machine that validates its transitions and
//! publishes them on the event bus.

pub mod attempt;

pub use attempt::AttemptStateMachine;
