use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{Error, Result};

/// A callback registered on a [`Channel`].
///
/// Subscribers are compared by identity: a clone of a subscriber is
/// the same subscriber, two separately created closures never are.
pub struct Subscriber<E> {
	func: Rc<dyn Fn(&E)>,
}

impl<E> Clone for Subscriber<E> {
	fn clone(&self) -> Self {
		Self {
			func: self.func.clone(),
		}
	}
}

impl<E: 'static> Subscriber<E> {
	pub fn new(func: impl Fn(&E) + 'static) -> Self {
		Subscriber {
			func: Rc::new(func),
		}
	}

	#[inline]
	pub fn call(&self, event: &E) {
		(self.func)(event)
	}

	pub fn is(&self, other: &Subscriber<E>) -> bool {
		Rc::ptr_eq(&self.func, &other.func)
	}
}

impl<E> Debug for Subscriber<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscriber")
			.field("ptr", &Rc::as_ptr(&self.func).cast::<()>())
			.finish()
	}
}

/// Ordered broadcaster of events to subscribers.
///
/// Both variants fire in registration order. A draining channel removes
/// each subscriber right before invoking it, so every subscriber fires at
/// most once per registration.
pub struct Channel<E> {
	inner: Rc<ChannelInner<E>>,
}

struct ChannelInner<E> {
	subscribers: RefCell<SmallVec<[Subscriber<E>; 4]>>,
	draining: bool,
}

impl<E> Clone for Channel<E> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<E: 'static> Default for Channel<E> {
	fn default() -> Self {
		Channel::new()
	}
}

impl<E: 'static> Channel<E> {
	pub fn new() -> Self {
		Self::with_mode(false)
	}

	pub fn draining() -> Self {
		Self::with_mode(true)
	}

	fn with_mode(draining: bool) -> Self {
		Channel {
			inner: Rc::new(ChannelInner {
				subscribers: RefCell::new(SmallVec::new_const()),
				draining,
			}),
		}
	}

	pub fn is_draining(&self) -> bool {
		self.inner.draining
	}

	pub fn add(&self, subscriber: Subscriber<E>) -> &Self {
		self.inner.subscribers.borrow_mut().push(subscriber);
		self
	}

	/// Removes the first registration of `subscriber`.
	pub fn remove(&self, subscriber: &Subscriber<E>) -> Result<&Self> {
		let mut subscribers = self.inner.subscribers.borrow_mut();
		let position = subscribers
			.iter()
			.position(|s| s.is(subscriber))
			.ok_or(Error::MissingSubscriber)?;
		subscribers.remove(position);
		Ok(self)
	}

	pub fn contains(&self, subscriber: &Subscriber<E>) -> bool {
		self.inner
			.subscribers
			.borrow()
			.iter()
			.any(|s| s.is(subscriber))
	}

	pub fn clear(&self) {
		self.inner.subscribers.borrow_mut().clear();
	}

	pub fn len(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn fire(&self, event: &E) {
		if self.inner.draining {
			self.drain(event);
			return;
		}

		// Subscribers may unsubscribe themselves while we iterate.
		let snapshot = self.inner.subscribers.borrow().clone();
		for subscriber in snapshot {
			subscriber.call(event);
		}
	}

	fn drain(&self, event: &E) {
		let mut fired = 0usize;
		loop {
			let next = {
				let mut subscribers = self.inner.subscribers.borrow_mut();
				if subscribers.is_empty() {
					break;
				}
				subscribers.remove(0)
			};

			next.call(event);
			fired += 1;
		}

		tracing::trace!(fired, "drained channel");
	}

	/// A subscriber that re-fires every event on this channel.
	pub fn forwarder(&self) -> Subscriber<E> {
		let channel = self.clone();
		Subscriber::new(move |event| channel.fire(event))
	}
}

impl<E: 'static> Debug for Channel<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Channel")
			.field("draining", &self.inner.draining)
			.field("subscribers", &self.len())
			.finish()
	}
}
