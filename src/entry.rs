//! One contraction node: a growable list of `(code point, CE)` pairs.

use crate::{ce::Ce, error::Error, Result};
use alloc::vec::Vec;
use core::{cmp::Ordering, iter::FusedIterator};
use tap::Pipe;

/// What unused code point slots hold.
pub(crate) const CP_FILL: u16 = 0x4646;
/// What unused CE slots hold.
pub(crate) const CE_FILL: u32 = 0x4646_4646;

/// A code-point-keyed association list for one contraction node.
///
/// Slot 0 is reserved from creation on. Its CE is what the node resolves to when no listed code point follows
/// (the "empty continuation", [`Ce::NOT_FOUND`] until set), and its code point is only a placeholder:
/// flattening replaces it with the combining class summary.
///
/// [`len`](`ContractionEntry::len`) is the logical length including slot 0,
/// [`capacity`](`ContractionEntry::capacity`) the number of slots that exist.
/// Capacity doubles whenever an insertion finds the entry full.
#[derive(Debug, PartialEq, Eq)]
pub struct ContractionEntry {
	code_points: Vec<u16>,
	ces: Vec<u32>,
	position: usize,
}

impl ContractionEntry {
	/// Creates an entry with room for `capacity` slots, slot 0 already reserved.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`] iff the slots can't be allocated.
	pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
		let capacity = capacity.max(1);
		let mut code_points: Vec<u16> = Vec::new();
		let mut ces: Vec<u32> = Vec::new();
		code_points
			.try_reserve_exact(capacity)
			.and_then(|()| ces.try_reserve_exact(capacity))
			.map_err(|_| out_of_memory(capacity))?;
		code_points.resize(capacity, CP_FILL);
		ces.resize(capacity, CE_FILL);
		code_points[0] = 0;
		ces[0] = Ce::NOT_FOUND.to_bits();

		Ok(Self {
			code_points,
			ces,
			position: 1,
		})
	}

	/// Logical length, counting the reserved slot 0.
	#[must_use]
	#[allow(clippy::len_without_is_empty)] // Never empty.
	pub fn len(&self) -> usize {
		self.position
	}

	/// Number of slots currently allocated.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.code_points.len()
	}

	/// The code points of the logical slots, slot 0 included.
	#[must_use]
	pub fn code_points(&self) -> &[u16] {
		&self.code_points[..self.position]
	}

	/// The packed CEs of the logical slots, slot 0 included.
	#[must_use]
	pub fn ces(&self) -> &[u32] {
		&self.ces[..self.position]
	}

	/// All allocated slots, including unused capacity.
	#[must_use]
	pub fn slots(&self) -> (&[u16], &[u32]) {
		(&self.code_points, &self.ces)
	}

	/// Iterates over the genuine pairs, i.e. everything after slot 0.
	pub fn pairs(&self) -> Pairs<'_> {
		Pairs {
			code_points: self.code_points()[1..].iter(),
			ces: self.ces()[1..].iter(),
		}
	}

	/// The CE of the empty continuation, iff one was set.
	#[must_use]
	pub fn base_ce(&self) -> Option<Ce> {
		Ce::from_bits(self.ces[0]).pipe(|ce| (!ce.is_not_found()).then_some(ce))
	}

	/// Doubles the capacity iff every slot is in use.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`] iff reallocation fails. The entry is left as it was.
	pub fn grow_if_full(&mut self) -> Result<()> {
		let size = self.capacity();
		if self.position < size {
			return Ok(());
		}

		self.code_points
			.try_reserve_exact(size)
			.and_then(|()| self.ces.try_reserve_exact(size))
			.map_err(|_| out_of_memory(size * 2))?;
		self.code_points.resize(size * 2, CP_FILL);
		self.ces.resize(size * 2, CE_FILL);
		tracing::trace!(from = size, to = size * 2, "grew contraction entry");
		Ok(())
	}

	/// Pushes a pair after the last one, without regard for ordering.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`] iff the entry had to grow and couldn't.
	pub fn append(&mut self, code_point: u16, ce: Ce) -> Result<()> {
		self.grow_if_full()?;
		self.code_points[self.position] = code_point;
		self.ces[self.position] = ce.to_bits();
		self.position += 1;
		Ok(())
	}

	/// Inserts a pair before the first one whose code point is greater than or equal to `code_point`.
	///
	/// Pairs added only through this method stay in ascending order.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`] iff the entry had to grow and couldn't.
	pub fn sorted_insert(&mut self, code_point: u16, ce: Ce) -> Result<()> {
		self.grow_if_full()?;

		let end = self.position;
		let offset = (1..end)
			.find(|&i| self.code_points[i] >= code_point)
			.unwrap_or(end);
		self.code_points.copy_within(offset..end, offset + 1);
		self.ces.copy_within(offset..end, offset + 1);

		self.code_points[offset] = code_point;
		self.ces[offset] = ce.to_bits();
		self.position += 1;
		Ok(())
	}

	/// Replaces the pair at `offset`, which may lie anywhere within the capacity.
	///
	/// The logical length doesn't change.
	///
	/// # Errors
	///
	/// [`Error::IndexOutOfBounds`] iff `offset` is not below [`capacity`](`ContractionEntry::capacity`).
	/// Nothing is written in that case.
	pub fn overwrite_at(&mut self, offset: usize, code_point: u16, ce: Ce) -> Result<()> {
		let capacity = self.capacity();
		if offset >= capacity {
			return Err(Error::IndexOutOfBounds { offset, capacity });
		}
		self.code_points[offset] = code_point;
		self.ces[offset] = ce.to_bits();
		Ok(())
	}

	/// Replaces the CE of the last logical slot.
	///
	/// On an entry without pairs, that's slot 0.
	pub fn replace_last_ce(&mut self, ce: Ce) {
		self.ces[self.position - 1] = ce.to_bits();
	}

	/// Replaces the CE of the pair at `slot`, which must be a logical slot.
	pub(crate) fn replace_ce(&mut self, slot: usize, ce: Ce) {
		debug_assert!(slot < self.position);
		self.ces[slot] = ce.to_bits();
	}

	/// Locates `code_point` among the pairs, returning its slot.
	///
	/// This assumes ascending order and gives up at the first greater code point,
	/// so it's only reliable for entries built through [`sorted_insert`](`ContractionEntry::sorted_insert`).
	#[must_use]
	pub fn find(&self, code_point: u16) -> Option<usize> {
		for (slot, &stored) in self.code_points().iter().enumerate().skip(1) {
			match stored.cmp(&code_point) {
				Ordering::Less => (),
				Ordering::Equal => return Some(slot),
				Ordering::Greater => return None,
			}
		}
		None
	}

	/// The CE in logical slot `slot`.
	#[must_use]
	pub fn ce_at(&self, slot: usize) -> Option<Ce> {
		self.ces().get(slot).copied().map(Ce::from_bits)
	}
}

/// Clones only the logical slots, so the copy's capacity equals its length.
impl Clone for ContractionEntry {
	fn clone(&self) -> Self {
		Self {
			code_points: self.code_points().to_vec(),
			ces: self.ces().to_vec(),
			position: self.position,
		}
	}
}

fn out_of_memory(slots: usize) -> Error {
	tracing::warn!(slots, "out of memory for contractions");
	Error::OutOfMemory
}

/// Iterator over the `(code point, CE)` pairs of a [`ContractionEntry`], slot 0 excluded.
#[must_use = "iterators are lazy and do nothing unless consumed"]
#[derive(Debug, Clone)]
pub struct Pairs<'a> {
	code_points: core::slice::Iter<'a, u16>,
	ces: core::slice::Iter<'a, u32>,
}

impl Iterator for Pairs<'_> {
	type Item = (u16, Ce);

	fn next(&mut self) -> Option<Self::Item> {
		Some((*self.code_points.next()?, Ce::from_bits(*self.ces.next()?)))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.code_points.size_hint()
	}
}

impl DoubleEndedIterator for Pairs<'_> {
	fn next_back(&mut self) -> Option<Self::Item> {
		Some((
			*self.code_points.next_back()?,
			Ce::from_bits(*self.ces.next_back()?),
		))
	}
}

impl ExactSizeIterator for Pairs<'_> {}

impl FusedIterator for Pairs<'_> {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::vec;

	fn direct(weight: u32) -> Ce {
		Ce::Direct(weight)
	}

	#[test]
	fn fresh_entry_reserves_slot_zero() {
		let entry = ContractionEntry::with_capacity(4).unwrap();
		assert_eq!(entry.len(), 1);
		assert_eq!(entry.capacity(), 4);
		assert_eq!(entry.ces(), &[Ce::NOT_FOUND.to_bits()]);
		assert_eq!(entry.base_ce(), None);
		assert_eq!(entry.pairs().count(), 0);
	}

	#[test]
	fn doubles_exactly_when_full() {
		let mut entry = ContractionEntry::with_capacity(2).unwrap();
		entry.append(0x300, direct(1)).unwrap();
		assert_eq!(entry.capacity(), 2);
		entry.append(0x301, direct(2)).unwrap();
		assert_eq!(entry.capacity(), 4);
		entry.append(0x302, direct(3)).unwrap();
		entry.append(0x303, direct(4)).unwrap();
		assert_eq!(entry.capacity(), 8);
		assert_eq!(entry.len(), 5);
	}

	#[test]
	fn append_keeps_call_order() {
		let mut entry = ContractionEntry::with_capacity(2).unwrap();
		for cp in [0x302, 0x300, 0x301] {
			entry.append(cp, direct(u32::from(cp))).unwrap();
		}
		assert_eq!(entry.code_points()[1..], [0x302, 0x300, 0x301]);
	}

	#[test]
	fn sorted_insert_orders_and_keeps_duplicates_before() {
		let mut entry = ContractionEntry::with_capacity(2).unwrap();
		entry.sorted_insert(0x302, direct(2)).unwrap();
		entry.sorted_insert(0x300, direct(0)).unwrap();
		entry.sorted_insert(0x301, direct(1)).unwrap();
		entry.sorted_insert(0x301, direct(9)).unwrap();
		assert_eq!(
			entry.pairs().collect::<vec::Vec<_>>(),
			vec![
				(0x300, direct(0)),
				(0x301, direct(9)),
				(0x301, direct(1)),
				(0x302, direct(2)),
			]
		);
	}

	#[test]
	fn find_stops_at_greater_code_point() {
		let mut entry = ContractionEntry::with_capacity(4).unwrap();
		entry.sorted_insert(0x41, direct(1)).unwrap();
		entry.sorted_insert(0x43, direct(3)).unwrap();
		assert_eq!(entry.find(0x41), Some(1));
		assert_eq!(entry.find(0x43), Some(2));
		assert_eq!(entry.find(0x42), None);
		assert_eq!(entry.find(0x44), None);
		assert_eq!(entry.find(0), None);
	}

	#[test]
	fn find_can_miss_appended_pairs() {
		let mut entry = ContractionEntry::with_capacity(4).unwrap();
		entry.append(0x43, direct(3)).unwrap();
		entry.append(0x41, direct(1)).unwrap();
		assert_eq!(entry.find(0x41), None);
	}

	#[test]
	fn overwrite_within_capacity_only() {
		let mut entry = ContractionEntry::with_capacity(4).unwrap();
		entry.overwrite_at(3, 0x41, direct(7)).unwrap();
		assert_eq!(entry.len(), 1);
		assert_eq!(entry.slots().0[3], 0x41);

		let before = entry.clone_slots();
		assert_eq!(
			entry.overwrite_at(4, 0x42, direct(8)),
			Err(Error::IndexOutOfBounds {
				offset: 4,
				capacity: 4
			})
		);
		assert_eq!(entry.clone_slots(), before);
	}

	#[test]
	fn clone_shrinks_to_length() {
		let mut entry = ContractionEntry::with_capacity(8).unwrap();
		entry.append(0x41, direct(1)).unwrap();
		let mut copy = entry.clone();
		assert_eq!(copy.capacity(), 2);
		assert_eq!(copy.code_points(), entry.code_points());
		copy.append(0x42, direct(2)).unwrap();
		assert_eq!(copy.capacity(), 4);
		assert_eq!(entry.len(), 2);
	}

	impl ContractionEntry {
		fn clone_slots(&self) -> (vec::Vec<u16>, vec::Vec<u32>) {
			(self.code_points.clone(), self.ces.clone())
		}
	}
}
