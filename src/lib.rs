pub mod macros;

mod addr;
mod cache;
mod cause;
mod channel;
mod error;
mod list;
mod map;
mod node;
mod set;
mod state;
mod trigger;

pub use cache::{CacheHandle, LazyProperty};
pub use cause::{Cause, Span};
pub use channel::{Channel, Subscriber};
pub use error::{Error, Result};
pub use list::ObservableList;
pub use map::ObservableMap;
pub use node::{Node, NodeId, Requirer};
pub use set::{Binding, Context, Deferred, DependencySet, Evaluated, Spec};
pub use state::{Invalidated, State};
pub use trigger::Trigger;

/// Anything that can stand as a requirement of another node.
pub trait Requirable {
	fn node(&self) -> &Node;
}
