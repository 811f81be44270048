use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::channel::{Channel, Subscriber};
use crate::error::Result;
use crate::set::Dynamic;
use crate::state::{Invalidated, State};
use crate::{Cause, Requirable};

/// Runs after every requirement of a composite node was required.
pub(crate) type Recompute = Box<dyn Fn() -> Result<bool>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
	fn next() -> Self {
		NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A node of the dependency graph.
///
/// Cloning is cheap and yields a handle to the same node.
#[derive(Clone)]
pub struct Node {
	body: Rc<NodeBody>,
}

pub(crate) struct NodeBody {
	id: NodeId,
	name: Rc<str>,
	state: State,
	kind: Kind,
}

enum Kind {
	Leaf { gate: Option<Box<dyn Fn() -> bool>> },
	Composite(Composite),
}

struct Composite {
	explicit: RefCell<Vec<Node>>,
	dynamic: Option<Dynamic>,
	recompute: Option<Recompute>,
	hooks: RefCell<Vec<Rc<Hook>>>,
}

impl Composite {
	fn resolve(&self) -> Result<Vec<Node>> {
		let mut requirements = self.explicit.borrow().clone();
		if let Some(dynamic) = &self.dynamic {
			requirements.extend(dynamic.evaluate()?);
		}
		Ok(requirements)
	}

	/// Unsubscribes every hook from its requirement.
	fn retire_hooks(&self) {
		let hooks = std::mem::take(&mut *self.hooks.borrow_mut());
		for hook in hooks {
			hook.retire();
		}
	}
}

impl Node {
	/// A node that can always be required and fires on every invalidation.
	pub fn leaf(name: impl Into<Rc<str>>) -> Self {
		Self::with_kind(name.into(), State::untracked(), Kind::Leaf { gate: None })
	}

	/// A leaf that can be required only while `gate` returns `true`.
	pub fn gated(name: impl Into<Rc<str>>, gate: impl Fn() -> bool + 'static) -> Self {
		Self::with_kind(
			name.into(),
			State::untracked(),
			Kind::Leaf {
				gate: Some(Box::new(gate)),
			},
		)
	}

	pub(crate) fn composite(
		name: Rc<str>,
		explicit: Vec<Node>,
		dynamic: Option<Dynamic>,
		recompute: Option<Recompute>,
	) -> Self {
		Self::with_kind(
			name,
			State::new(),
			Kind::Composite(Composite {
				explicit: RefCell::new(explicit),
				dynamic,
				recompute,
				hooks: RefCell::new(Vec::new()),
			}),
		)
	}

	fn with_kind(name: Rc<str>, state: State, kind: Kind) -> Self {
		Node {
			body: Rc::new(NodeBody {
				id: NodeId::next(),
				name,
				state,
				kind,
			}),
		}
	}

	pub(crate) fn downgrade(&self) -> Weak<NodeBody> {
		Rc::downgrade(&self.body)
	}

	pub(crate) fn upgrade(body: &Weak<NodeBody>) -> Option<Node> {
		body.upgrade().map(|body| Node { body })
	}

	#[inline]
	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn name(&self) -> &str {
		&self.body.name
	}

	/// Leaves are always valid.
	#[inline]
	pub fn is_valid(&self) -> bool {
		self.body.state.is_valid()
	}

	pub fn is_composite(&self) -> bool {
		matches!(self.body.kind, Kind::Composite(_))
	}

	pub fn on_every_invalidate(&self) -> &Channel<Invalidated> {
		self.body.state.on_every_invalidate()
	}

	pub fn on_next_invalidate(&self) -> &Channel<Invalidated> {
		self.body.state.on_next_invalidate()
	}

	pub fn on_validated(&self) -> &Channel<NodeId> {
		self.body.state.on_validated()
	}

	/// Marks the node stale and notifies subscribers.
	///
	/// Returns `false` when the node was already invalid, in which case
	/// nothing fires.
	pub fn invalidate(&self, cause: Cause) -> bool {
		let span = tracing::trace_span!("invalidate", node = %self, %cause);
		let _entered = span.enter();

		if let Kind::Composite(composite) = &self.body.kind {
			if self.is_valid() {
				composite.retire_hooks();
			}
		}

		let fired = self.body.state.invalidate(self.id(), cause);
		if !fired {
			trace!("already invalid");
		}
		fired
	}

	/// Brings the node up to date by requiring all of its requirements.
	///
	/// `Ok(false)` means some requirement cannot be required right now; the
	/// node stays invalid and validating again later is safe. A gated leaf
	/// validates only while its gate is open.
	pub fn validate(&self) -> Result<bool> {
		let composite = match &self.body.kind {
			Kind::Leaf { gate } => return Ok(gate.as_ref().map_or(true, |gate| gate())),
			Kind::Composite(composite) => composite,
		};

		let validated = self
			.body
			.state
			.validate(self.id(), || self.require_all(composite))?;

		trace!(node = %self, validated, "validate");
		Ok(validated)
	}

	/// Starts depending on this node.
	///
	/// The node is validated first. On success `on_next` is
	/// subscribed to the next invalidation only and `on_every` to all of
	/// them; on failure nothing is subscribed.
	pub fn require(
		&self,
		on_next: Option<Subscriber<Invalidated>>,
		on_every: Option<Subscriber<Invalidated>>,
	) -> Result<bool> {
		self.require_with(on_next, on_every, None)
	}

	/// Like [`Node::require`], also subscribing `on_validated` to every
	/// later validation of this node.
	pub fn require_with(
		&self,
		on_next: Option<Subscriber<Invalidated>>,
		on_every: Option<Subscriber<Invalidated>>,
		on_validated: Option<Subscriber<NodeId>>,
	) -> Result<bool> {
		if !self.validate()? {
			trace!(node = %self, "refused to be required");
			return Ok(false);
		}

		if let Some(subscriber) = on_next {
			self.on_next_invalidate().add(subscriber);
		}
		if let Some(subscriber) = on_every {
			self.on_every_invalidate().add(subscriber);
		}
		if let Some(subscriber) = on_validated {
			self.on_validated().add(subscriber);
		}
		Ok(true)
	}

	/// The effective requirement list, explicit requirements first.
	pub fn requirements(&self) -> Result<Vec<Node>> {
		match &self.body.kind {
			Kind::Leaf { .. } => Ok(Vec::new()),
			Kind::Composite(composite) => composite.resolve(),
		}
	}

	pub(crate) fn replace_requirements(&self, explicit: Vec<Node>) {
		if let Kind::Composite(composite) = &self.body.kind {
			*composite.explicit.borrow_mut() = explicit;
			self.invalidate(Cause::RequirementListChanged);
		}
	}

	pub(crate) fn dynamic(&self) -> Option<&Dynamic> {
		match &self.body.kind {
			Kind::Composite(composite) => composite.dynamic.as_ref(),
			Kind::Leaf { .. } => None,
		}
	}

	fn require_all(&self, composite: &Composite) -> Result<bool> {
		// Left over from an attempt that stopped at a refused requirement.
		composite.retire_hooks();

		for requirement in composite.resolve()? {
			let hook = Hook::new(self, &requirement);
			composite.hooks.borrow_mut().push(hook.clone());

			if !requirement.require(Some(hook.subscriber.clone()), None)? {
				trace!(node = %self, requirement = %requirement, "requirement not satisfied");
				return Ok(false);
			}
		}

		match &composite.recompute {
			Some(recompute) => recompute(),
			None => Ok(true),
		}
	}
}

impl Requirable for Node {
	fn node(&self) -> &Node {
		self
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl Eq for Node {}

impl Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.body.name, self.body.id)
	}
}

impl Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("id", &self.body.id)
			.field("name", &self.body.name)
			.field("valid", &self.is_valid())
			.finish()
	}
}

/// Invalidates its requirer when the requirement changes.
///
/// Owned by the requirer. The subscriber registered on the requirement
/// only holds the hook weakly, so a dropped hook never fires.
struct Hook {
	requirement: NodeId,
	source: Weak<NodeBody>,
	requirer: Weak<NodeBody>,
	subscriber: Subscriber<Invalidated>,
}

impl Hook {
	fn new(requirer: &Node, requirement: &Node) -> Rc<Self> {
		Rc::new_cyclic(|hook: &Weak<Hook>| {
			let hook = hook.clone();
			Hook {
				requirement: requirement.id(),
				source: requirement.downgrade(),
				requirer: requirer.downgrade(),
				subscriber: Subscriber::new(move |event: &Invalidated| {
					if let Some(hook) = hook.upgrade() {
						hook.fire(&event.cause);
					}
				}),
			}
		})
	}

	fn fire(&self, cause: &Cause) {
		if let Some(requirer) = Node::upgrade(&self.requirer) {
			requirer.invalidate(Cause::requirement(self.requirement, cause));
		}
	}

	fn retire(&self) {
		if let Some(source) = Node::upgrade(&self.source) {
			// Missing when the requirement already fired or refused us.
			let _ = source.on_next_invalidate().remove(&self.subscriber);
		}
	}
}

/// A node whose requirements are an explicit list of nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirer {
	node: Node,
}

impl Requirer {
	pub fn new(name: impl Into<Rc<str>>, requirements: impl IntoIterator<Item = Node>) -> Self {
		Requirer {
			node: Node::composite(name.into(), requirements.into_iter().collect(), None, None),
		}
	}

	/// Replaces the requirement list and invalidates the node.
	pub fn set_requirements(&self, requirements: impl IntoIterator<Item = Node>) {
		self.node
			.replace_requirements(requirements.into_iter().collect());
	}
}

impl Deref for Requirer {
	type Target = Node;
	fn deref(&self) -> &Self::Target {
		&self.node
	}
}

impl Requirable for Requirer {
	fn node(&self) -> &Node {
		&self.node
	}
}
