use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::channel::Subscriber;
use crate::error::{Error, Result};
use crate::node::Recompute;
use crate::state::Invalidated;
use crate::{Node, ObservableList, ObservableMap, Requirable, Requirer, Trigger};

/// Names visible to deferred requirements.
pub type Context = ObservableMap<String, Binding>;

type NodeOf = fn(&dyn Any) -> Option<Node>;

fn node_of<R: Requirable + Any>(value: &dyn Any) -> Option<Node> {
	value.downcast_ref::<R>().map(|value| value.node().clone())
}

/// A type-erased value stored in a [`Context`].
#[derive(Clone)]
pub struct Binding {
	value: Rc<dyn Any>,
	type_name: &'static str,
	node_of: Option<NodeOf>,
}

impl Binding {
	pub fn new<T: Any>(value: T) -> Self {
		Self::shared(Rc::new(value))
	}

	pub fn shared<T: Any>(value: Rc<T>) -> Self {
		Binding {
			value,
			type_name: type_name::<T>(),
			node_of: None,
		}
	}

	/// Binds a value that resolves to its own node.
	pub fn requirable<R: Requirable + Any>(value: R) -> Self {
		Binding {
			node_of: Some(node_of::<R>),
			..Self::new(value)
		}
	}

	/// Binds `value` without keeping it alive.
	pub fn weak<T: Any>(value: &Rc<T>) -> Self {
		Binding {
			value: Rc::new(Rc::downgrade(value)),
			type_name: type_name::<T>(),
			node_of: None,
		}
	}

	/// The node of a requirable binding.
	pub fn node(&self) -> Option<Node> {
		let node_of = self.node_of?;
		node_of(&*self.value)
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Resolves shared and weak bindings of `T` alike.
	pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
		if let Ok(value) = self.value.clone().downcast::<T>() {
			return Some(value);
		}
		self.value.downcast_ref::<Weak<T>>()?.upgrade()
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}
}

impl Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Binding<{}>", self.type_name)
	}
}

impl ObservableMap<String, Binding> {
	pub fn bind<T: Any>(&self, name: impl Into<String>, value: T) -> Option<Binding> {
		self.insert(name.into(), Binding::new(value))
	}

	pub fn bind_requirable<R: Requirable + Any>(
		&self,
		name: impl Into<String>,
		value: R,
	) -> Option<Binding> {
		self.insert(name.into(), Binding::requirable(value))
	}

	pub fn get_as<T: Any>(&self, name: &str) -> Option<Rc<T>> {
		self.with(name, |binding| binding.downcast::<T>()).flatten()
	}
}

/// Result of evaluating a deferred requirement.
#[derive(Debug, Clone)]
pub enum Evaluated {
	Node(Node),
	Nodes(Vec<Node>),
	Nothing,
	/// Anything else, by type name. Fails validation.
	Other(&'static str),
}

impl From<Node> for Evaluated {
	fn from(node: Node) -> Self {
		Evaluated::Node(node)
	}
}

impl From<Vec<Node>> for Evaluated {
	fn from(nodes: Vec<Node>) -> Self {
		Evaluated::Nodes(nodes)
	}
}

impl From<Option<Node>> for Evaluated {
	fn from(node: Option<Node>) -> Self {
		node.map_or(Evaluated::Nothing, Evaluated::Node)
	}
}

impl From<()> for Evaluated {
	fn from(_: ()) -> Self {
		Evaluated::Nothing
	}
}

/// Requirables come before sequences: a bound list of nodes is required
/// as a list, not element by element.
impl From<&Binding> for Evaluated {
	fn from(binding: &Binding) -> Self {
		let known = binding
			.node()
			.or_else(|| node_of::<Node>(&*binding.value))
			.or_else(|| node_of::<Requirer>(&*binding.value))
			.or_else(|| node_of::<DependencySet>(&*binding.value))
			.or_else(|| node_of::<Trigger>(&*binding.value))
			.or_else(|| node_of::<ObservableList<Node>>(&*binding.value));
		if let Some(node) = known {
			return Evaluated::Node(node);
		}

		if let Some(nodes) = binding.downcast_ref::<Vec<Node>>() {
			return Evaluated::Nodes(nodes.clone());
		}
		if let Some(node) = binding.downcast_ref::<Option<Node>>() {
			return node.clone().into();
		}
		if binding.downcast_ref::<()>().is_some() {
			return Evaluated::Nothing;
		}
		Evaluated::Other(binding.type_name())
	}
}

/// A requirement resolved against the context every time it is needed.
#[derive(Clone)]
pub struct Deferred {
	label: Rc<str>,
	resolve: Rc<dyn Fn(&Context) -> Result<Evaluated>>,
}

impl Deferred {
	pub fn new<F, R>(label: impl Into<Rc<str>>, resolve: F) -> Self
	where
		F: Fn(&Context) -> Result<R> + 'static,
		R: Into<Evaluated>,
	{
		Deferred {
			label: label.into(),
			resolve: Rc::new(move |context| resolve(context).map(Into::into)),
		}
	}

	/// Requires whatever is bound to `name` at resolution time.
	pub fn var(name: impl Into<String>) -> Self {
		let name = name.into();
		Deferred::new(name.clone(), move |context: &Context| {
			context
				.with(name.as_str(), |binding| Evaluated::from(binding))
				.ok_or_else(|| Error::UnboundName(name.clone()))
		})
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn evaluate(&self, context: &Context) -> Result<Evaluated> {
		(self.resolve)(context)
	}
}

impl Debug for Deferred {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Deferred").field(&self.label).finish()
	}
}

/// Either side of a mixed requirement list.
#[derive(Debug, Clone)]
pub enum Spec {
	Node(Node),
	Deferred(Deferred),
}

impl From<Node> for Spec {
	fn from(node: Node) -> Self {
		Spec::Node(node)
	}
}

impl From<Deferred> for Spec {
	fn from(deferred: Deferred) -> Self {
		Spec::Deferred(deferred)
	}
}

impl<R: Requirable> From<&R> for Spec {
	fn from(requirable: &R) -> Self {
		Spec::Node(requirable.node().clone())
	}
}

fn split(specs: impl IntoIterator<Item = Spec>) -> (Vec<Node>, Vec<Deferred>) {
	let mut explicit = Vec::new();
	let mut deferred = Vec::new();
	for spec in specs {
		match spec {
			Spec::Node(node) => explicit.push(node),
			Spec::Deferred(expr) => deferred.push(expr),
		}
	}
	(explicit, deferred)
}

pub(crate) struct Dynamic {
	deferred: RefCell<Vec<Deferred>>,
	context: Context,
}

impl Dynamic {
	pub(crate) fn evaluate(&self) -> Result<Vec<Node>> {
		let deferred = self.deferred.borrow().clone();

		let mut nodes = Vec::new();
		for expr in &deferred {
			match expr.evaluate(&self.context)? {
				Evaluated::Node(node) => nodes.push(node),
				Evaluated::Nodes(many) => nodes.extend(many),
				Evaluated::Nothing => {}
				Evaluated::Other(found) => {
					return Err(Error::InvalidRequirementResult {
						expression: expr.label().to_owned(),
						found,
					})
				}
			}
		}
		Ok(nodes)
	}
}

/// A requirer whose requirements are partly computed from a context.
///
/// Any mutation of the context invalidates the set.
#[derive(Clone)]
pub struct DependencySet {
	node: Node,
	context: Context,
}

impl DependencySet {
	pub fn new(
		name: impl Into<Rc<str>>,
		specs: impl IntoIterator<Item = Spec>,
		bindings: impl IntoIterator<Item = (String, Binding)>,
	) -> Self {
		Self::build(name.into(), specs, bindings, None)
	}

	pub(crate) fn build(
		name: Rc<str>,
		specs: impl IntoIterator<Item = Spec>,
		bindings: impl IntoIterator<Item = (String, Binding)>,
		recompute: Option<Recompute>,
	) -> Self {
		let (explicit, deferred) = split(specs);
		let context = Context::named(format!("{}.context", name), bindings);

		let dynamic = Dynamic {
			deferred: RefCell::new(deferred),
			context: context.clone(),
		};
		let node = Node::composite(name, explicit, Some(dynamic), recompute);

		let owner = node.downgrade();
		context
			.node()
			.on_every_invalidate()
			.add(Subscriber::new(move |event: &Invalidated| {
				if let Some(node) = Node::upgrade(&owner) {
					node.invalidate(event.cause.clone());
				}
			}));

		DependencySet { node, context }
	}

	pub fn context(&self) -> &Context {
		&self.context
	}

	/// Replaces both explicit and deferred requirements and invalidates the set.
	pub fn set_requirements(&self, specs: impl IntoIterator<Item = Spec>) {
		let (explicit, deferred) = split(specs);
		if let Some(dynamic) = self.node.dynamic() {
			*dynamic.deferred.borrow_mut() = deferred;
		}
		self.node.replace_requirements(explicit);
	}
}

impl Deref for DependencySet {
	type Target = Node;
	fn deref(&self) -> &Self::Target {
		&self.node
	}
}

impl Requirable for DependencySet {
	fn node(&self) -> &Node {
		&self.node
	}
}

impl PartialEq for DependencySet {
	fn eq(&self, other: &Self) -> bool {
		self.node == other.node
	}
}

impl Debug for DependencySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DependencySet")
			.field("node", &self.node)
			.field("context", &self.context.keys())
			.finish()
	}
}
