use std::cell::{Cell, RefCell};
use std::rc::Rc;

use requisite::{
	Cause, Deferred, Error, Invalidated, LazyProperty, Node, ObservableList, Requirable, Requirer,
	Spec, Subscriber,
};

mod mock;
use mock::Spy;

struct Person {
	name: &'static str,
	base: Cell<i64>,
	dependents: ObservableList<Rc<Person>>,
	spy: mock::SharedMock,
}

impl Person {
	fn new(
		name: &'static str,
		base: i64,
		dependents: impl IntoIterator<Item = Rc<Person>>,
		spy: &mock::SharedMock,
	) -> Rc<Person> {
		Rc::new(Person {
			name,
			base: Cell::new(base),
			dependents: ObservableList::named(format!("{name}.dependents"), dependents),
			spy: spy.clone(),
		})
	}
}

thread_local! {
	static VALUE: LazyProperty<Person, i64> = LazyProperty::new("value")
		.getter(|person: &Rc<Person>| person.base.get())
		.setter(|person: &Rc<Person>, value| person.base.set(value));

	static TOTAL: LazyProperty<Person, i64> = LazyProperty::computed(
		"total",
		[Spec::from(Deferred::new("parts", |ctx| {
			let Some(person) = ctx.get_as::<Person>("self") else {
				return Ok(Vec::new());
			};

			let mut nodes = vec![
				VALUE.with(|value| value.node(&person)),
				person.dependents.node().clone(),
			];
			for dependent in person.dependents.iter() {
				nodes.push(TOTAL.with(|total| total.node(&dependent)));
			}
			Ok(nodes)
		}))],
		|person: &Rc<Person>| {
			person.spy.get().notified(person.name);

			let own = VALUE.with(|value| value.read(person)).unwrap_or_default();
			person.dependents.iter().fold(own, |sum, dependent| {
				sum + TOTAL.with(|total| total.read(&dependent)).unwrap_or_default()
			})
		},
	);
}

fn total(person: &Rc<Person>) -> i64 {
	TOTAL.with(|total| total.read(person)).unwrap()
}

#[test]
fn family_totals_recompute_only_what_changed() {
	mock::trace();
	let spy = mock::SharedMock::new();

	let children: Vec<_> = ["child 1", "child 2", "child 3", "child 4", "child 5"]
		.into_iter()
		.zip(1..)
		.map(|(name, base)| Person::new(name, base, [], &spy))
		.collect();
	let mother = Person::new("mother", 12, children.clone(), &spy);
	let father = Person::new("father", 10, [mother.clone()], &spy);

	for name in ["father", "mother", "child 1", "child 2", "child 3", "child 4", "child 5"] {
		spy.expect(name, 1);
	}
	assert_eq!(total(&father), 37);
	assert_eq!(total(&father), 37);
	spy.get().checkpoint();

	for name in ["father", "mother", "child 4"] {
		spy.expect(name, 1);
	}
	VALUE.with(|value| {
		let raised = value.read(&children[3]).unwrap() + 3;
		value.write(&children[3], raised).unwrap();
	});
	assert_eq!(total(&father), 40);
	spy.get().checkpoint();

	for name in ["father", "mother"] {
		spy.expect(name, 1);
	}
	let removed = mother.dependents.remove(4).unwrap();
	assert_eq!(removed.name, "child 5");
	assert_eq!(total(&father), 35);
	assert_eq!(total(&mother), 25);
	spy.get().checkpoint();
}

#[test]
fn write_invalidates_requirers_with_set_cause() {
	let spy = mock::SharedMock::new();
	let person = Person::new("person", 1, [], &spy);

	let requirer = VALUE.with(|value| Requirer::new("requirer", [value.node(&person)]));
	requirer.validate().unwrap();

	let cause = Rc::new(RefCell::new(None));
	requirer.on_next_invalidate().add(Subscriber::new({
		let cause = cause.clone();
		move |event: &Invalidated| *cause.borrow_mut() = Some(event.cause.origin().clone())
	}));

	VALUE.with(|value| value.write(&person, 5)).unwrap();
	assert!(!requirer.is_valid());
	assert_eq!(
		*cause.borrow(),
		Some(Cause::Set {
			property: "value".into()
		})
	);
	assert_eq!(VALUE.with(|value| value.read(&person)), Ok(5));
}

#[test]
fn missing_accessors_are_reported() {
	let spy = mock::SharedMock::new();
	let person = Person::new("person", 1, [], &spy);
	let blank = LazyProperty::<Person, i64>::new("blank");

	assert_eq!(blank.read(&person), Err(Error::NotReadable("blank".to_owned())));
	assert_eq!(
		TOTAL.with(|total| total.write(&person, 3)),
		Err(Error::NotWritable("total".to_owned()))
	);
	assert_eq!(blank.write(&person, 3), Err(Error::NotWritable("blank".to_owned())));
}

#[test]
fn remove_drops_the_cache_and_runs_the_deleter() {
	let deleted = Rc::new(Cell::new(0));
	let property = LazyProperty::<String, usize>::new("length")
		.getter(|owner: &Rc<String>| owner.len())
		.deleter({
			let deleted = deleted.clone();
			move |_: &Rc<String>| deleted.set(deleted.get() + 1)
		});

	let owner = Rc::new(String::from("four"));
	assert_eq!(property.read(&owner), Ok(4));
	assert!(property.is_cached(&owner));

	let requirer = Requirer::new("requirer", [property.node(&owner)]);
	requirer.validate().unwrap();
	let cause = Rc::new(RefCell::new(None));
	requirer.on_next_invalidate().add(Subscriber::new({
		let cause = cause.clone();
		move |event: &Invalidated| *cause.borrow_mut() = Some(event.cause.clone())
	}));

	property.remove(&owner);
	assert_eq!(deleted.get(), 1);
	assert!(!property.is_cached(&owner));
	assert!(!requirer.is_valid());

	let cause = cause.borrow().clone().unwrap();
	assert_eq!(
		cause.origin(),
		&Cause::Deleted {
			property: "length".into()
		}
	);
	assert_eq!(cause.path().len(), 1);

	// Removing again only runs the deleter.
	property.remove(&owner);
	assert_eq!(deleted.get(), 2);

	// A fresh cache is created on the next read.
	assert_eq!(property.read(&owner), Ok(4));
}

#[test]
fn unsatisfied_requirement_fails_the_read() {
	let open = Rc::new(Cell::new(false));
	let gate = Node::gated("gate", {
		let open = open.clone();
		move || open.get()
	});
	let property = LazyProperty::<u32, u32>::computed("doubled", [Spec::from(&gate)], |owner| {
		**owner * 2
	});

	let owner = Rc::new(21);
	assert_eq!(
		property.read(&owner),
		Err(Error::Unsatisfied("doubled".to_owned()))
	);
	assert!(property.get_or_create(&owner).peek().is_none());

	open.set(true);
	assert_eq!(property.read(&owner), Ok(42));
	assert_eq!(property.get_or_create(&owner).peek(), Some(42));
}

#[test]
fn context_mutation_invalidates_the_cache() {
	let recomputed = Rc::new(Cell::new(0));
	let property = LazyProperty::<u8, u8>::new("copy").getter({
		let recomputed = recomputed.clone();
		move |owner: &Rc<u8>| {
			recomputed.set(recomputed.get() + 1);
			**owner
		}
	});

	let owner = Rc::new(3);
	let handle = property.get_or_create(&owner);
	assert_eq!(handle.get(), Ok(3));
	assert_eq!(handle.get(), Ok(3));
	assert_eq!(recomputed.get(), 1);

	handle.context().bind("extra", ());
	assert!(!handle.is_valid());
	assert_eq!(handle.peek(), Some(3));

	assert_eq!(handle.get(), Ok(3));
	assert_eq!(recomputed.get(), 2);
	assert_eq!(handle.context().get_as::<u8>("self"), Some(owner.clone()));
}

#[test]
fn caches_are_per_owner() {
	let property = LazyProperty::<i32, i32>::computed("negated", [], |owner| -**owner);
	let first = Rc::new(1);
	let second = Rc::new(2);

	assert_eq!(property.read(&first), Ok(-1));
	assert_eq!(property.read(&second), Ok(-2));
	assert!(property.get_or_create(&first).node() != property.get_or_create(&second).node());
	assert!(property.get_or_create(&first).node() == &property.node(&first));
}
