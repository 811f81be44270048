use std::rc::Rc;

use crate::{Cause, Node, Requirable};

/// A leaf that is invalidated every time it is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
	node: Node,
	name: Rc<str>,
}

impl Trigger {
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		let name = name.into();
		Trigger {
			node: Node::leaf(name.clone()),
			name,
		}
	}

	pub fn call(&self) -> bool {
		self.node.invalidate(Cause::MethodCalled(self.name.clone()))
	}
}

impl Requirable for Trigger {
	fn node(&self) -> &Node {
		&self.node
	}
}
