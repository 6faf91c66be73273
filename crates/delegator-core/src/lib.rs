//! Core delegation engine.
//!
//! Turns a delegation request (a pool or DRep identifier) into a signed and
//! submitted transaction: wallet selection, protocol parameters, coin
//! selection, certificate construction, fee-balanced assembly, signing and
//! submission, each step tracked by an attempt state machine whose
//! transitions are broadcast to observers.

pub mod assembler;
pub mod builder;
pub mod certificate;
pub mod error;
pub mod event_bus;
pub mod orchestrator;
pub mod selection;
pub mod state;

pub use assembler::{assemble, TransactionDraft};
pub use builder::{BuilderError, DelegatorFactories, OrchestratorBuilder};
pub use certificate::CertificateBuilder;
pub use error::{DelegationError, UserMessage};
pub use event_bus::EventBus;
pub use orchestrator::{
	DelegationOrchestrator, DelegationReceipt, OrchestratorSettings, UnsignedDelegation,
};
pub use state::AttemptStateMachine;
