use cnttab::{uniform_mapping, Ce, Config, ContractionStore, Handle, Mapping};

fn handle(ce: Ce) -> Handle {
	ce.handle().expect("contraction reference")
}

#[test]
fn clone_is_independent() {
	let mapping = uniform_mapping(Ce::Direct(0x1000));
	let mut parent = ContractionStore::open(&mapping);
	let h = handle(parent.insert_contraction(None, 0x68, Ce::Direct(0x3000)).unwrap());

	let mut child = parent.clone();
	child.change_contraction(h, 0x68, Ce::Direct(0x3001)).unwrap();
	child.insert_contraction(Some(h), 0x48, Ce::Direct(0x3002)).unwrap();
	let fresh = handle(child.add_contraction(None, 0x61, Ce::Direct(1)).unwrap());

	assert_eq!(parent.find_ce(h, 0x68), Some(Ce::Direct(0x3000)));
	assert_eq!(parent.find_ce(h, 0x48), None);
	assert!(parent.entry(fresh).is_none());
	assert_eq!(child.find_ce(h, 0x68), Some(Ce::Direct(0x3001)));
	assert_eq!(child.len(), 2);
}

#[test]
fn clone_shrinks_entries_to_their_length() {
	let mapping = uniform_mapping(Ce::NOT_FOUND);
	let mut parent =
		ContractionStore::open_with(&mapping, Config::new().with_initial_entry_capacity(16));
	let h = handle(parent.add_contraction(None, 0x41, Ce::Direct(1)).unwrap());
	parent.add_contraction(Some(h), 0x42, Ce::Direct(2)).unwrap();

	let mut child = parent.clone();
	assert_eq!(parent.entry(h).unwrap().capacity(), 16);
	assert_eq!(child.entry(h).unwrap().capacity(), 3);
	assert_eq!(child.entry(h).unwrap().ces(), parent.entry(h).unwrap().ces());

	child.add_contraction(Some(h), 0x43, Ce::Direct(3)).unwrap();
	assert_eq!(child.entry(h).unwrap().capacity(), 6);
	assert_eq!(child.capacity(), parent.capacity());
}

#[test]
fn clone_copies_flattened_buffers_and_shares_the_mapping() {
	let mapping = uniform_mapping(Ce::Direct(0x1000));
	let mut parent = ContractionStore::open(&mapping);
	let h = handle(parent.add_contraction(None, 0x0301, Ce::Direct(0x2000)).unwrap());
	parent.attach(0x41, h).unwrap();
	parent.flatten(0, &|_: u16| -> u8 { 230 }).unwrap();

	let child = parent.clone();
	assert!(core::ptr::eq(child.mapping(), parent.mapping()));
	assert_eq!(child.flattened(), parent.flattened());
	assert_ne!(
		child.flattened().unwrap().ces().as_ptr(),
		parent.flattened().unwrap().ces().as_ptr()
	);
	drop(parent);
	assert_eq!(child.flattened().unwrap().len(), 2);
	assert_eq!(Mapping::get(child.mapping(), 0x41), Ce::ContractionRef(0).to_bits());
}

#[test]
fn unflattened_clone_has_no_buffers() {
	let mapping = uniform_mapping(Ce::NOT_FOUND);
	let mut parent = ContractionStore::open(&mapping);
	parent.add_contraction(None, 0x41, Ce::Direct(1)).unwrap();
	assert!(parent.clone().flattened().is_none());
}
