use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::rc::Rc;

use tracing::debug;

use crate::addr::OwnerKey;
use crate::error::{Error, Result};
use crate::node::Recompute;
use crate::{Binding, Cause, Context, DependencySet, Node, Requirable, Spec};

/// A lazily computed value per owner.
///
/// Each owner gets its own cache, created on first use. A cache holds
/// the last computed value and a [`DependencySet`] whose context binds
/// `"self"` to the owner (weakly). The value is recomputed when the set
/// is validated, i.e. on the first read after any of the requirements
/// changed, or when another node requires the cache.
pub struct LazyProperty<O, T> {
	name: Rc<str>,
	getter: Option<Rc<dyn Fn(&Rc<O>) -> T>>,
	setter: Option<Rc<dyn Fn(&Rc<O>, T)>>,
	deleter: Option<Rc<dyn Fn(&Rc<O>)>>,
	requirements: Vec<Spec>,
	caches: RefCell<BTreeMap<OwnerKey<O>, CacheHandle<T>>>,
}

impl<O: 'static, T: 'static> LazyProperty<O, T> {
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		LazyProperty {
			name: name.into(),
			getter: None,
			setter: None,
			deleter: None,
			requirements: Vec::new(),
			caches: RefCell::new(BTreeMap::new()),
		}
	}

	pub fn computed(
		name: impl Into<Rc<str>>,
		requirements: impl IntoIterator<Item = Spec>,
		getter: impl Fn(&Rc<O>) -> T + 'static,
	) -> Self {
		Self::new(name).requires(requirements).getter(getter)
	}

	pub fn getter(mut self, getter: impl Fn(&Rc<O>) -> T + 'static) -> Self {
		self.getter = Some(Rc::new(getter));
		self
	}

	pub fn setter(mut self, setter: impl Fn(&Rc<O>, T) + 'static) -> Self {
		self.setter = Some(Rc::new(setter));
		self
	}

	pub fn deleter(mut self, deleter: impl Fn(&Rc<O>) + 'static) -> Self {
		self.deleter = Some(Rc::new(deleter));
		self
	}

	/// Requirements of caches created from now on.
	pub fn requires(mut self, requirements: impl IntoIterator<Item = Spec>) -> Self {
		self.requirements = requirements.into_iter().collect();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn get_or_create(&self, owner: &Rc<O>) -> CacheHandle<T> {
		if let Some(handle) = self.handle(owner) {
			return handle;
		}

		let handle = self.create(owner);
		let mut caches = self.caches.borrow_mut();
		caches.retain(|key, _| key.is_alive());
		caches.insert(OwnerKey::new(owner), handle.clone());
		handle
	}

	/// The cache of `owner`, if it was created.
	pub fn handle(&self, owner: &Rc<O>) -> Option<CacheHandle<T>> {
		self.caches.borrow().get(&OwnerKey::new(owner)).cloned()
	}

	pub fn is_cached(&self, owner: &Rc<O>) -> bool {
		self.caches.borrow().contains_key(&OwnerKey::new(owner))
	}

	/// The node of `owner`'s cache, to be used as a requirement.
	pub fn node(&self, owner: &Rc<O>) -> Node {
		self.get_or_create(owner).node().clone()
	}

	/// Returns the memoized value, recomputing it first if it is stale.
	pub fn read(&self, owner: &Rc<O>) -> Result<T>
	where
		T: Clone,
	{
		if self.getter.is_none() {
			return Err(Error::NotReadable(self.name.to_string()));
		}
		self.get_or_create(owner).get()
	}

	pub fn write(&self, owner: &Rc<O>, value: T) -> Result<()> {
		let setter = self
			.setter
			.as_ref()
			.ok_or_else(|| Error::NotWritable(self.name.to_string()))?;

		setter(owner, value);
		self.get_or_create(owner).node().invalidate(Cause::Set {
			property: self.name.clone(),
		});
		Ok(())
	}

	/// Invalidates and forgets `owner`'s cache, then runs the deleter.
	pub fn remove(&self, owner: &Rc<O>) {
		if let Some(handle) = self.handle(owner) {
			handle.node().invalidate(Cause::Deleted {
				property: self.name.clone(),
			});
		}

		if let Some(deleter) = &self.deleter {
			deleter(owner);
		}

		self.caches.borrow_mut().remove(&OwnerKey::new(owner));
	}

	fn create(&self, owner: &Rc<O>) -> CacheHandle<T> {
		let value = Rc::new(RefCell::new(None));

		let recompute = self.getter.clone().map(|getter| {
			let owner = Rc::downgrade(owner);
			let value = value.clone();
			let name = self.name.clone();
			Box::new(move || -> Result<bool> {
				let Some(owner) = owner.upgrade() else {
					return Ok(false);
				};

				debug!(property = %name, "recompute");
				let computed = getter(&owner);
				*value.borrow_mut() = Some(computed);
				Ok(true)
			}) as Recompute
		});

		let set = DependencySet::build(
			self.name.clone(),
			self.requirements.clone(),
			[("self".to_owned(), Binding::weak(owner))],
			recompute,
		);

		CacheHandle {
			body: Rc::new(CacheBody {
				property: self.name.clone(),
				value,
				set,
			}),
		}
	}
}

impl<O, T> Debug for LazyProperty<O, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LazyProperty")
			.field("name", &self.name)
			.field("caches", &self.caches.borrow().len())
			.finish()
	}
}

/// One owner's cache of a [`LazyProperty`].
pub struct CacheHandle<T> {
	body: Rc<CacheBody<T>>,
}

struct CacheBody<T> {
	property: Rc<str>,
	value: Rc<RefCell<Option<T>>>,
	set: DependencySet,
}

impl<T> Clone for CacheHandle<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> CacheHandle<T> {
	pub fn dependencies(&self) -> &DependencySet {
		&self.body.set
	}

	pub fn context(&self) -> &Context {
		self.body.set.context()
	}

	pub fn is_valid(&self) -> bool {
		self.body.set.is_valid()
	}

	/// The last computed value, stale or not.
	pub fn peek(&self) -> Option<T>
	where
		T: Clone,
	{
		self.body.value.borrow().clone()
	}

	pub fn get(&self) -> Result<T>
	where
		T: Clone,
	{
		if !self.body.set.validate()? {
			return Err(Error::Unsatisfied(self.body.property.to_string()));
		}

		self.body
			.value
			.borrow()
			.clone()
			.ok_or_else(|| Error::NotReadable(self.body.property.to_string()))
	}
}

impl<T> Requirable for CacheHandle<T> {
	fn node(&self) -> &Node {
		self.body.set.node()
	}
}

impl<T> Debug for CacheHandle<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CacheHandle")
			.field("value", &self.body.value.borrow())
			.field("valid", &self.is_valid())
			.finish()
	}
}
