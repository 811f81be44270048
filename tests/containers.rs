use std::cell::RefCell;
use std::rc::Rc;

use requisite::{
	Cause, Error, Invalidated, Node, ObservableList, ObservableMap, Requirable, Requirer, Span,
	Subscriber,
};

mod mock;

fn record(node: &Node) -> Rc<RefCell<Vec<Invalidated>>> {
	let events = Rc::new(RefCell::new(Vec::new()));
	node.on_every_invalidate().add(Subscriber::new({
		let events = events.clone();
		move |event: &Invalidated| events.borrow_mut().push(event.clone())
	}));
	events
}

fn causes(events: &Rc<RefCell<Vec<Invalidated>>>) -> Vec<Cause> {
	events.borrow().iter().map(|e| e.cause.clone()).collect()
}

#[test]
fn map_mutations_name_the_key() {
	let map = ObservableMap::<String, i32>::new();
	let events = record(map.node());

	assert_eq!(map.insert("a".to_owned(), 1), None);
	assert_eq!(map.insert("a".to_owned(), 2), Some(1));
	assert_eq!(map.remove("a"), Some(2));

	assert_eq!(
		causes(&events),
		vec![
			Cause::KeyChanged("\"a\"".into()),
			Cause::KeyChanged("\"a\"".into()),
			Cause::KeyDeleted("\"a\"".into()),
		]
	);
	assert_eq!(
		events.borrow()[0].cause.to_string(),
		"key \"a\" has changed"
	);
}

#[test]
fn removing_absent_key_fires_nothing() {
	let map = ObservableMap::<&'static str, i32>::named("map", [("kept", 1)]);
	let events = record(map.node());

	assert_eq!(map.remove("missing"), None);
	assert!(events.borrow().is_empty());
	assert_eq!(map.get("kept"), Some(1));
}

#[test]
fn map_reads_do_not_invalidate() {
	let map = ObservableMap::<u8, &'static str>::named("map", [(1, "one"), (2, "two")]);
	let events = record(map.node());

	assert_eq!(map.len(), 2);
	assert!(map.contains_key(&1u8));
	assert_eq!(map.keys(), vec![1, 2]);
	assert_eq!(map.with(&2u8, |v| v.len()), Some(3));
	assert_eq!(map.entries(), vec![(1, "one"), (2, "two")]);
	assert!(events.borrow().is_empty());
}

#[test]
fn clearing_map_deletes_each_key() {
	let map = ObservableMap::<u8, ()>::named("map", [(1, ()), (2, ()), (3, ())]);
	let events = record(map.node());

	map.clear();
	assert!(map.is_empty());
	assert_eq!(events.borrow().len(), 3);
	assert!(causes(&events)
		.iter()
		.all(|cause| matches!(cause, Cause::KeyDeleted(_))));
}

#[test]
fn map_mutation_invalidates_requirer() {
	let map = ObservableMap::<u8, u8>::new();
	let requirer = Requirer::new("requirer", [map.node().clone()]);
	requirer.validate().unwrap();

	map.insert(1, 1);
	assert!(!requirer.is_valid());
}

#[test]
fn list_mutations_name_the_position() {
	let list = ObservableList::named("list", [1, 2, 3]);
	let events = record(list.node());

	assert_eq!(list.set(0, 10), Ok(1));
	list.insert(1, 5).unwrap();
	list.push(7);
	assert_eq!(list.remove(0), Ok(10));
	list.replace_range(0..2, [8, 9, 10]).unwrap();
	list.remove_range(1..3).unwrap();
	assert_eq!(list.pop(), Some(7));

	assert_eq!(list.to_vec(), vec![8, 3]);
	assert_eq!(
		causes(&events),
		vec![
			Cause::ElementChanged(Span::Index(0)),
			Cause::ElementInserted(1),
			Cause::ElementInserted(4),
			Cause::ElementDeleted(Span::Index(0)),
			Cause::ElementChanged(Span::Range(0..2)),
			Cause::ElementDeleted(Span::Range(1..3)),
			Cause::ElementDeleted(Span::Index(2)),
		]
	);
}

#[test]
fn list_out_of_range_fires_nothing() {
	let list = ObservableList::named("list", ['a', 'b']);
	let events = record(list.node());

	assert_eq!(
		list.set(2, 'c'),
		Err(Error::IndexOutOfRange { index: 2, len: 2 })
	);
	assert_eq!(
		list.insert(3, 'c'),
		Err(Error::IndexOutOfRange { index: 3, len: 2 })
	);
	assert_eq!(
		list.remove_range(1..4),
		Err(Error::IndexOutOfRange { index: 4, len: 2 })
	);
	assert_eq!(ObservableList::<u8>::new().pop(), None);
	assert!(events.borrow().is_empty());
	assert_eq!(list.to_vec(), vec!['a', 'b']);
}

#[test]
fn slice_mutation_refires_parent_channel() {
	mock::trace();
	let parent = ObservableList::named("parent", [1, 2, 3, 4]);
	let requirer = Requirer::new("requirer", [parent.node().clone()]);
	requirer.validate().unwrap();

	let events = record(parent.node());
	let slice = parent.slice(1..3);
	assert_eq!(slice.to_vec(), vec![2, 3]);

	slice.set(0, 20).unwrap();

	let seen = events.borrow().clone();
	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].sender, slice.node().id());
	assert_eq!(seen[0].cause, Cause::ElementChanged(Span::Index(0)));

	// The parent's own flag and contents are untouched; its dependents are not.
	assert!(parent.node().is_valid());
	assert_eq!(parent.to_vec(), vec![1, 2, 3, 4]);
	assert!(!requirer.is_valid());
}

#[test]
fn slice_bounds_are_clamped() {
	let parent = ObservableList::named("parent", [1, 2, 3]);

	assert_eq!(parent.slice(2..10).to_vec(), vec![3]);
	assert!(parent.slice(5..9).is_empty());
	assert_eq!(parent.slice(1..3).node().name(), "parent[1..3]");
}

#[test]
fn nested_slices_forward_to_every_ancestor() {
	let root = ObservableList::named("root", 0..10);
	let events = record(root.node());

	let inner = root.slice(2..8).slice(1..3);
	assert_eq!(inner.to_vec(), vec![3, 4]);
	inner.push(5);

	assert_eq!(causes(&events), vec![Cause::ElementInserted(2)]);
}
