use std::cmp::Ordering;
use std::rc::{Rc, Weak};

/// Identity of a cache owner, ordered by address.
///
/// The weak pointer keeps the allocation (not the owner) alive, so the
/// address cannot be reused by another owner while the key exists.
pub(crate) struct OwnerKey<T> {
	ptr: Weak<T>,
}

impl<T> OwnerKey<T> {
	pub fn new(owner: &Rc<T>) -> Self {
		OwnerKey {
			ptr: Rc::downgrade(owner),
		}
	}

	pub fn is_alive(&self) -> bool {
		self.ptr.strong_count() > 0
	}
}

impl<T> PartialEq for OwnerKey<T> {
	fn eq(&self, other: &Self) -> bool {
		Weak::as_ptr(&self.ptr).eq(&Weak::as_ptr(&other.ptr))
	}
}

impl<T> Eq for OwnerKey<T> {}

impl<T> Ord for OwnerKey<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		Weak::as_ptr(&self.ptr).cmp(&Weak::as_ptr(&other.ptr))
	}
}

impl<T> PartialOrd for OwnerKey<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
