//! Domain event bus
//!
//! State transitions emit events instead of calling notifiers inline, so the
//! engine's success never depends on an unrelated I/O system. Consumers (an
//! email notifier, a progress websocket) subscribe on their own channels; a
//! missing consumer drops the event, which is the intended fire-and-forget
//! contract.

use tokio::sync::broadcast;

use crate::prelude::*;

/// Events emitted by the voting engine
#[derive(Clone, Debug)]
pub enum VoteEvent {
	/// A participant's ballot was stored (first submission or resubmission)
	BallotSubmitted {
		sn_id: SnId,
		participant_id: PId,
		submitted: u32,
		total: u32,
	},
	/// The session transitioned Open → Closed
	SessionClosed {
		sn_id: SnId,
		/// True when triggered by the last outstanding submission
		auto: bool,
	},
}

#[derive(Debug)]
pub struct EventBus {
	tx: broadcast::Sender<VoteEvent>,
}

impl EventBus {
	pub fn new(buffer_size: usize) -> Self {
		let (tx, _rx) = broadcast::channel(buffer_size);
		Self { tx }
	}

	/// Emit an event to all current subscribers; no subscriber is fine
	pub fn emit(&self, event: VoteEvent) {
		debug!(?event, "emitting");
		let _ = self.tx.send(event);
	}

	pub fn subscribe(&self) -> broadcast::Receiver<VoteEvent> {
		self.tx.subscribe()
	}

	pub fn receiver_count(&self) -> usize {
		self.tx.receiver_count()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}


// vim: ts=4
