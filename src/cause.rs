use std::fmt::{self, Display};
use std::ops::Range;
use std::rc::Rc;

use crate::NodeId;

/// Why a node was invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
	/// A cached property was written.
	Set { property: Rc<str> },
	/// A cached property was deleted.
	Deleted { property: Rc<str> },
	KeyChanged(Rc<str>),
	KeyDeleted(Rc<str>),
	ElementChanged(Span),
	ElementInserted(usize),
	ElementDeleted(Span),
	/// One of the requirements was invalidated with `cause`.
	RequirementChanged {
		requirement: NodeId,
		cause: Rc<Cause>,
	},
	RequirementListChanged,
	MethodCalled(Rc<str>),
	Manual(Rc<str>),
}

impl Cause {
	pub fn manual(reason: impl Into<Rc<str>>) -> Self {
		Cause::Manual(reason.into())
	}

	pub(crate) fn requirement(requirement: NodeId, cause: &Cause) -> Self {
		Cause::RequirementChanged {
			requirement,
			cause: Rc::new(cause.clone()),
		}
	}

	/// The innermost cause of a chain of requirement changes.
	pub fn origin(&self) -> &Cause {
		let mut current = self;
		while let Cause::RequirementChanged { cause, .. } = current {
			current = &**cause;
		}
		current
	}

	/// Requirements walked from this cause down to its origin.
	pub fn path(&self) -> Vec<NodeId> {
		let mut path = Vec::new();
		let mut current = self;
		while let Cause::RequirementChanged { requirement, cause } = current {
			path.push(*requirement);
			current = &**cause;
		}
		path
	}
}

impl Display for Cause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Cause::Set { property } => write!(f, "setter was called on {}", property),
			Cause::Deleted { property } => write!(f, "deleter was called on {}", property),
			Cause::KeyChanged(key) => write!(f, "key {} has changed", key),
			Cause::KeyDeleted(key) => write!(f, "key {} has been deleted", key),
			Cause::ElementChanged(span) => write!(f, "{} was changed in the list", span),
			Cause::ElementInserted(index) => write!(f, "[{}] was inserted in the list", index),
			Cause::ElementDeleted(span) => write!(f, "{} was popped from the list", span),
			Cause::RequirementChanged { requirement, cause } => {
				write!(f, "changed requirement {}, cause: {}", requirement, cause)
			}
			Cause::RequirementListChanged => f.write_str("changed requirement list"),
			Cause::MethodCalled(name) => write!(f, "method {} was called", name),
			Cause::Manual(reason) => f.write_str(reason),
		}
	}
}

/// Position touched by a sequence mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
	Index(usize),
	Range(Range<usize>),
}

impl Display for Span {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Span::Index(index) => write!(f, "[{}]", index),
			Span::Range(range) => write!(f, "[{}..{}]", range.start, range.end),
		}
	}
}
