//! Broadcast channel carrying delegation events to observers.

use delegator_types::DelegationEvent;
use tokio::sync::broadcast;

/// Fan-out of [`DelegationEvent`]s.
///
/// Cloning the bus shares the underlying channel. Publishing with no
/// subscribers is not an error worth surfacing, so callers discard the result.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DelegationEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DelegationEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: DelegationEvent,
	) -> Result<(), broadcast::error::SendError<DelegationEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
