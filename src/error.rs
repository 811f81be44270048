use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("subscriber is not registered on this channel")]
	MissingSubscriber,

	/// A deferred requirement produced something that is neither a node,
	/// a sequence of nodes nor nothing.
	#[error("deferred requirement `{expression}` should evaluate to a node or a sequence of nodes, got {found}")]
	InvalidRequirementResult {
		expression: String,
		found: &'static str,
	},

	#[error("name `{0}` is not bound in the requirement context")]
	UnboundName(String),

	#[error("property `{0}` is not readable")]
	NotReadable(String),

	#[error("property `{0}` is not writable")]
	NotWritable(String),

	/// The requirements of a cached property could not be required right now.
	#[error("requirements of property `{0}` are not satisfied")]
	Unsatisfied(String),

	#[error("index {index} is out of range for length {len}")]
	IndexOutOfRange { index: usize, len: usize },
}
