//! Collaborators the store borrows instead of owning.

use crate::ce::Ce;
use alloc::{boxed::Box, vec::Vec};
use core::cell::{Cell, RefCell};

/// The main code point to CE table that a [`ContractionStore`](`crate::ContractionStore`) patches when flattening.
///
/// Its domain is `0..=0xFFFF`, one packed CE per code point.
/// Writes go through `&self` so that a store and its clones can all hold on to the same table.
///
/// Implementations backed by fewer slots should read missing ones as [`Ce::NOT_FOUND`] and ignore writes to them.
pub trait Mapping {
	/// The packed CE currently stored for `code_point`.
	fn get(&self, code_point: u16) -> u32;

	/// Replaces the packed CE for `code_point`.
	fn set(&self, code_point: u16, ce: u32);
}

impl Mapping for [Cell<u32>] {
	fn get(&self, code_point: u16) -> u32 {
		<[_]>::get(self, usize::from(code_point)).map_or(Ce::NOT_FOUND.to_bits(), Cell::get)
	}

	fn set(&self, code_point: u16, ce: u32) {
		if let Some(slot) = <[_]>::get(self, usize::from(code_point)) {
			slot.set(ce)
		}
	}
}

impl Mapping for RefCell<Vec<u32>> {
	fn get(&self, code_point: u16) -> u32 {
		self.borrow()
			.get(usize::from(code_point))
			.copied()
			.unwrap_or(Ce::NOT_FOUND.to_bits())
	}

	fn set(&self, code_point: u16, ce: u32) {
		if let Some(slot) = self.borrow_mut().get_mut(usize::from(code_point)) {
			*slot = ce
		}
	}
}

impl Mapping for RefCell<Box<[u32]>> {
	fn get(&self, code_point: u16) -> u32 {
		self.borrow()
			.get(usize::from(code_point))
			.copied()
			.unwrap_or(Ce::NOT_FOUND.to_bits())
	}

	fn set(&self, code_point: u16, ce: u32) {
		if let Some(slot) = self.borrow_mut().get_mut(usize::from(code_point)) {
			*slot = ce
		}
	}
}

/// Creates a full-domain mapping with every code point set to `ce`.
#[must_use]
pub fn uniform_mapping(ce: Ce) -> RefCell<Vec<u32>> {
	RefCell::new(alloc::vec![ce.to_bits(); 0x1_0000])
}

/// Source of the canonical combining class property, consulted while flattening.
pub trait CombiningClasses {
	/// The canonical combining class of `code_point`.
	fn combining_class(&self, code_point: u16) -> u8;
}

impl<F: Fn(u16) -> u8> CombiningClasses for F {
	fn combining_class(&self, code_point: u16) -> u8 {
		self(code_point)
	}
}
