use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{Cause, Node, Requirable};

/// An insertion-ordered mapping that invalidates its node on every mutation.
pub struct ObservableMap<K, V> {
	body: Rc<MapBody<K, V>>,
}

struct MapBody<K, V> {
	node: Node,
	entries: RefCell<IndexMap<K, V, FxBuildHasher>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<K, V> Default for ObservableMap<K, V>
where
	K: Hash + Eq + Debug,
{
	fn default() -> Self {
		ObservableMap::new()
	}
}

fn label(key: &impl Debug) -> Rc<str> {
	format!("{:?}", key).into()
}

impl<K, V> ObservableMap<K, V>
where
	K: Hash + Eq + Debug,
{
	pub fn new() -> Self {
		Self::named("map", [])
	}

	pub fn named(name: impl Into<Rc<str>>, entries: impl IntoIterator<Item = (K, V)>) -> Self {
		let mut map = IndexMap::with_hasher(FxBuildHasher::default());
		map.extend(entries);

		ObservableMap {
			body: Rc::new(MapBody {
				node: Node::leaf(name),
				entries: RefCell::new(map),
			}),
		}
	}

	pub fn len(&self) -> usize {
		self.body.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.body.entries.borrow().contains_key(key)
	}

	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
		V: Clone,
	{
		self.body.entries.borrow().get(key).cloned()
	}

	pub fn with<Q, R>(&self, key: &Q, func: impl FnOnce(&V) -> R) -> Option<R>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.body.entries.borrow().get(key).map(func)
	}

	pub fn keys(&self) -> Vec<K>
	where
		K: Clone,
	{
		self.body.entries.borrow().keys().cloned().collect()
	}

	pub fn entries(&self) -> Vec<(K, V)>
	where
		K: Clone,
		V: Clone,
	{
		self.body
			.entries
			.borrow()
			.iter()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	pub fn insert(&self, key: K, value: V) -> Option<V> {
		let label = label(&key);
		let previous = self.body.entries.borrow_mut().insert(key, value);
		self.body.node.invalidate(Cause::KeyChanged(label));
		previous
	}

	/// Removing an absent key fires nothing.
	pub fn remove<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let removed = self.body.entries.borrow_mut().shift_remove_entry(key);
		let (key, value) = removed?;
		self.body.node.invalidate(Cause::KeyDeleted(label(&key)));
		Some(value)
	}

	/// Deletes keys one at a time, each with its own invalidation.
	pub fn clear(&self) {
		loop {
			let popped = self.body.entries.borrow_mut().pop();
			match popped {
				Some((key, _)) => {
					self.body.node.invalidate(Cause::KeyDeleted(label(&key)));
				}
				None => break,
			}
		}
	}
}

impl<K, V> Requirable for ObservableMap<K, V> {
	fn node(&self) -> &Node {
		&self.body.node
	}
}

impl<K, V> PartialEq for ObservableMap<K, V> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<K, V> Debug for ObservableMap<K, V>
where
	K: Debug,
	V: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.body.entries.borrow().iter()).finish()
	}
}
