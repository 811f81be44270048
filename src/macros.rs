pub use enclose::*;

/// Builds a [`Deferred`](crate::Deferred) requirement. Handles listed in
/// parentheses are cloned into the resolver first.
///
/// ```
/// use requisite::{deferred, Node};
///
/// let extra = Node::leaf("extra");
/// let requirement = deferred!("extra", (extra) _ctx => Ok(extra.clone()));
/// assert_eq!(requirement.label(), "extra");
/// ```
#[macro_export]
macro_rules! deferred {
    ($label:expr, ( $($d_tt:tt)* ) $ctx:ident => $($b:tt)*) => {
        $crate::Deferred::new($label, $crate::macros::enclose!(($( $d_tt )*) move |$ctx: &$crate::Context| { $($b)* }))
    };
    ($label:expr, $ctx:ident => $($b:tt)*) => {
        $crate::Deferred::new($label, move |$ctx: &$crate::Context| { $($b)* })
    };
}
