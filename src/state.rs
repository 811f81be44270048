use std::cell::Cell;

use crate::channel::Channel;
use crate::error::Result;
use crate::{Cause, NodeId};

/// Event fired on invalidation channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidated {
	pub sender: NodeId,
	pub cause: Cause,
}

/// Valid flag plus the channels notified when it flips.
///
/// `on_next_invalidate` is registered as the first subscriber of
/// `on_every_invalidate`, so every invalidation drains it.
///
/// An untracked state has no flag: it always reports valid and every
/// call to [`State::invalidate`] fires.
pub struct State {
	valid: Cell<bool>,
	tracked: bool,
	on_every_invalidate: Channel<Invalidated>,
	on_next_invalidate: Channel<Invalidated>,
	on_validated: Channel<NodeId>,
}

impl Default for State {
	fn default() -> Self {
		State::new()
	}
}

impl State {
	/// A tracked state, initially invalid.
	pub fn new() -> Self {
		Self::with_tracking(true)
	}

	pub fn untracked() -> Self {
		Self::with_tracking(false)
	}

	fn with_tracking(tracked: bool) -> Self {
		let on_every_invalidate = Channel::new();
		let on_next_invalidate = Channel::draining();
		on_every_invalidate.add(on_next_invalidate.forwarder());

		State {
			valid: Cell::new(!tracked),
			tracked,
			on_every_invalidate,
			on_next_invalidate,
			on_validated: Channel::new(),
		}
	}

	#[inline]
	pub fn is_valid(&self) -> bool {
		self.valid.get()
	}

	pub fn is_tracked(&self) -> bool {
		self.tracked
	}

	pub fn on_every_invalidate(&self) -> &Channel<Invalidated> {
		&self.on_every_invalidate
	}

	pub fn on_next_invalidate(&self) -> &Channel<Invalidated> {
		&self.on_next_invalidate
	}

	pub fn on_validated(&self) -> &Channel<NodeId> {
		&self.on_validated
	}

	/// Returns `false` if the state was already invalid and nothing fired.
	pub fn invalidate(&self, sender: NodeId, cause: Cause) -> bool {
		if self.tracked {
			if !self.valid.get() {
				return false;
			}
			self.valid.set(false);
		}

		self.on_every_invalidate
			.fire(&Invalidated { sender, cause });
		true
	}

	/// Runs `recompute` only when invalid. The state becomes valid (and
	/// `on_validated` fires) only if `recompute` reports success.
	pub fn validate(
		&self,
		sender: NodeId,
		recompute: impl FnOnce() -> Result<bool>,
	) -> Result<bool> {
		if self.valid.get() {
			return Ok(true);
		}

		if !recompute()? {
			return Ok(false);
		}

		self.valid.set(true);
		self.on_validated.fire(&sender);
		Ok(true)
	}
}
