use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::ops::Range;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::{Cause, Node, Requirable, Span};

/// A sequence that invalidates its node on every mutation.
pub struct ObservableList<T> {
	body: Rc<ListBody<T>>,
}

struct ListBody<T> {
	node: Node,
	items: RefCell<Vec<T>>,
}

impl<T> Clone for ObservableList<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for ObservableList<T> {
	fn default() -> Self {
		ObservableList::new()
	}
}

impl<T> FromIterator<T> for ObservableList<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		ObservableList::named("list", iter)
	}
}

fn check_index(index: usize, len: usize) -> Result<()> {
	if index < len {
		Ok(())
	} else {
		Err(Error::IndexOutOfRange { index, len })
	}
}

fn check_range(range: &Range<usize>, len: usize) -> Result<()> {
	if range.start > range.end {
		return Err(Error::IndexOutOfRange {
			index: range.start,
			len: range.end,
		});
	}
	if range.end > len {
		return Err(Error::IndexOutOfRange {
			index: range.end,
			len,
		});
	}
	Ok(())
}

impl<T> ObservableList<T> {
	pub fn new() -> Self {
		Self::named("list", [])
	}

	pub fn named(name: impl Into<Rc<str>>, items: impl IntoIterator<Item = T>) -> Self {
		ObservableList {
			body: Rc::new(ListBody {
				node: Node::leaf(name),
				items: RefCell::new(items.into_iter().collect()),
			}),
		}
	}

	pub fn len(&self) -> usize {
		self.body.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<T>
	where
		T: Clone,
	{
		self.body.items.borrow().get(index).cloned()
	}

	pub fn with<R>(&self, func: impl FnOnce(&[T]) -> R) -> R {
		func(&self.body.items.borrow())
	}

	pub fn to_vec(&self) -> Vec<T>
	where
		T: Clone,
	{
		self.body.items.borrow().clone()
	}

	/// Iterates over a snapshot, so the list may be mutated meanwhile.
	pub fn iter(&self) -> std::vec::IntoIter<T>
	where
		T: Clone,
	{
		self.to_vec().into_iter()
	}

	/// Copies `range` (clamped to the list bounds) into a new list.
	///
	/// Invalidations of the copy are re-fired on this list's
	/// `on_every_invalidate` channel. The copy does not write back.
	pub fn slice(&self, range: Range<usize>) -> ObservableList<T>
	where
		T: Clone,
	{
		let len = self.len();
		let start = range.start.min(len);
		let end = range.end.min(len).max(start);

		let items = self.body.items.borrow()[start..end].to_vec();
		let name = format!("{}[{}..{}]", self.body.node.name(), start, end);
		let slice = ObservableList::named(name, items);

		slice
			.node()
			.on_every_invalidate()
			.add(self.body.node.on_every_invalidate().forwarder());
		slice
	}

	pub fn set(&self, index: usize, value: T) -> Result<T> {
		let previous = {
			let mut items = self.body.items.borrow_mut();
			check_index(index, items.len())?;
			std::mem::replace(&mut items[index], value)
		};

		self.body
			.node
			.invalidate(Cause::ElementChanged(Span::Index(index)));
		Ok(previous)
	}

	pub fn replace_range(&self, range: Range<usize>, values: impl IntoIterator<Item = T>) -> Result<()> {
		let values: Vec<T> = values.into_iter().collect();
		{
			let mut items = self.body.items.borrow_mut();
			check_range(&range, items.len())?;
			items.splice(range.clone(), values);
		}

		self.body
			.node
			.invalidate(Cause::ElementChanged(Span::Range(range)));
		Ok(())
	}

	pub fn insert(&self, index: usize, value: T) -> Result<()> {
		{
			let mut items = self.body.items.borrow_mut();
			if index > items.len() {
				return Err(Error::IndexOutOfRange {
					index,
					len: items.len(),
				});
			}
			items.insert(index, value);
		}

		self.body.node.invalidate(Cause::ElementInserted(index));
		Ok(())
	}

	pub fn push(&self, value: T) {
		let index = {
			let mut items = self.body.items.borrow_mut();
			items.push(value);
			items.len() - 1
		};

		self.body.node.invalidate(Cause::ElementInserted(index));
	}

	pub fn remove(&self, index: usize) -> Result<T> {
		let removed = {
			let mut items = self.body.items.borrow_mut();
			check_index(index, items.len())?;
			items.remove(index)
		};

		self.body
			.node
			.invalidate(Cause::ElementDeleted(Span::Index(index)));
		Ok(removed)
	}

	pub fn remove_range(&self, range: Range<usize>) -> Result<()> {
		{
			let mut items = self.body.items.borrow_mut();
			check_range(&range, items.len())?;
			items.drain(range.clone());
		}

		self.body
			.node
			.invalidate(Cause::ElementDeleted(Span::Range(range)));
		Ok(())
	}

	pub fn pop(&self) -> Option<T> {
		let (index, popped) = {
			let mut items = self.body.items.borrow_mut();
			let popped = items.pop()?;
			(items.len(), popped)
		};

		self.body
			.node
			.invalidate(Cause::ElementDeleted(Span::Index(index)));
		Some(popped)
	}
}

impl<T> Requirable for ObservableList<T> {
	fn node(&self) -> &Node {
		&self.body.node
	}
}

impl<T> PartialEq for ObservableList<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<T> Debug for ObservableList<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.body.items.borrow().iter()).finish()
	}
}
