//! Packing a [`ContractionStore`] into its offset-addressed runtime form.

use crate::{
	ce::{is_contraction, Ce, Handle, PAYLOAD_MASK},
	entry::ContractionEntry,
	error::Error,
	mapping::{CombiningClasses, Mapping},
	ContractionStore, Result,
};
use alloc::{boxed::Box, vec::Vec};
use core::cmp::Ordering;
use scopeguard::ScopeGuard;
use tap::{Pipe, TapFallible};

/// Combining class summary stored in place of slot 0's code point.
///
/// Bit 8 is set iff every listed code point has the same combining class,
/// the low 8 bits hold the highest class among them.
/// An entry without pairs summarises to `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombiningSummary(u16);

impl CombiningSummary {
	/// The "all classes equal" flag.
	pub const UNIFORM: u16 = 1 << 8;

	/// Summarises `code_points` (which must not include slot 0).
	#[must_use]
	pub fn of(code_points: &[u16], classes: &(impl ?Sized + CombiningClasses)) -> Self {
		let (min, max) = code_points
			.iter()
			.map(|&code_point| classes.combining_class(code_point))
			.fold((u8::MAX, u8::MIN), |(min, max), class| (min.min(class), max.max(class)));
		let uniform = if min == max { Self::UNIFORM } else { 0 };
		Self(uniform | u16::from(max))
	}

	/// Reinterprets a flattened slot 0 code point.
	#[must_use]
	pub const fn from_bits(bits: u16) -> Self {
		Self(bits)
	}

	/// The packed form.
	#[must_use]
	pub const fn bits(self) -> u16 {
		self.0
	}

	/// Whether all listed code points share one combining class.
	///
	/// If they don't, a comparison has to look ahead past reordered combining marks.
	#[must_use]
	pub const fn is_uniform(self) -> bool {
		self.0 & Self::UNIFORM != 0
	}

	/// The highest combining class among the listed code points.
	#[must_use]
	pub const fn max_class(self) -> u8 {
		(self.0 & 0xFF) as u8
	}
}

/// The immutable runtime form of a contraction table.
///
/// Entries lie back to back in two parallel buffers, in handle order.
/// Every contraction CE, here and in the patched mapping, carries an absolute offset:
/// `main_offset` (passed to [`ContractionStore::flatten`]) plus the entry's start in these buffers.
///
/// Slot 0 of each entry holds its [`CombiningSummary`] as code point and its empty-continuation CE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattened {
	main_offset: u32,
	code_points: Box<[u16]>,
	ces: Box<[u32]>,
	offsets: Box<[u32]>,
}

impl Flattened {
	/// The base the offsets were computed from.
	#[must_use]
	pub fn main_offset(&self) -> u32 {
		self.main_offset
	}

	/// The number of slots across all entries.
	#[must_use]
	pub fn len(&self) -> usize {
		self.code_points.len()
	}

	/// Whether no slots were flattened. Never true for a table produced by a store.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.code_points.is_empty()
	}

	/// All packed code points.
	#[must_use]
	pub fn code_points(&self) -> &[u16] {
		&self.code_points
	}

	/// All packed CEs.
	#[must_use]
	pub fn ces(&self) -> &[u32] {
		&self.ces
	}

	/// Absolute offsets by handle index.
	#[must_use]
	pub fn offsets(&self) -> &[u32] {
		&self.offsets
	}

	/// The absolute offset of `handle`'s entry.
	#[must_use]
	pub fn offset(&self, handle: Handle) -> Option<u32> {
		self.offsets.get(handle.index()).copied()
	}

	/// The slots of `handle`'s entry.
	#[must_use]
	pub fn entry(&self, handle: Handle) -> Option<(&[u16], &[u32])> {
		self.slots(handle.index())
	}

	/// The slots of the entry starting at absolute `offset`, as found in a flattened contraction CE.
	#[must_use]
	pub fn entry_at(&self, offset: u32) -> Option<(&[u16], &[u32])> {
		self.offsets
			.binary_search(&offset)
			.ok()
			.and_then(|index| self.slots(index))
	}

	/// The [`CombiningSummary`] of the entry starting at absolute `offset`.
	#[must_use]
	pub fn summary_at(&self, offset: u32) -> Option<CombiningSummary> {
		let (code_points, _) = self.entry_at(offset)?;
		code_points.first().copied().map(CombiningSummary::from_bits)
	}

	/// The [`CombiningSummary`] of `handle`'s entry.
	#[must_use]
	pub fn summary(&self, handle: Handle) -> Option<CombiningSummary> {
		self.summary_at(self.offset(handle)?)
	}

	/// Looks up `code_point` in `handle`'s entry.
	#[must_use]
	pub fn find_ce(&self, handle: Handle, code_point: u16) -> Option<Ce> {
		self.find_ce_at(self.offset(handle)?, code_point)
	}

	/// Looks up `code_point` in the entry starting at absolute `offset`, scanning in ascending order like the store does.
	#[must_use]
	pub fn find_ce_at(&self, offset: u32, code_point: u16) -> Option<Ce> {
		let (code_points, ces) = self.entry_at(offset)?;
		for (slot, &stored) in code_points.iter().enumerate().skip(1) {
			match stored.cmp(&code_point) {
				Ordering::Less => (),
				Ordering::Equal => return Some(Ce::from_bits(ces[slot])),
				Ordering::Greater => return None,
			}
		}
		None
	}

	fn slots(&self, index: usize) -> Option<(&[u16], &[u32])> {
		let start = self.relative(*self.offsets.get(index)?);
		let end = self
			.offsets
			.get(index + 1)
			.map_or(self.len(), |&next| self.relative(next));
		Some((&self.code_points[start..end], &self.ces[start..end]))
	}

	fn relative(&self, offset: u32) -> usize {
		(offset - self.main_offset) as usize
	}
}

impl<M: ?Sized + Mapping> ContractionStore<'_, M> {
	/// Packs all entries into contiguous buffers placed after `main_offset`,
	/// then rewrites every contraction reference from handle to offset,
	/// both in the packed CEs and in the mapping.
	///
	/// Every code point in slot 0 is replaced with the entry's [`CombiningSummary`], as reported by `classes`.
	///
	/// Returns the number of flattened slots. An empty store is left alone and yields `0`.
	///
	/// The resulting [`Flattened`] table replaces any earlier one.
	///
	/// # Errors
	///
	/// - [`Error::OffsetOverflow`] iff an entry would start past what 24 bits can address.
	/// - [`Error::DanglingReference`] iff an entry or the mapping refers to a handle that was never allocated.
	/// - [`Error::OutOfMemory`] iff the buffers can't be allocated.
	///
	/// Flattening again is fine: mapping slots still holding the offsets written last time are read back as their handles first.
	/// Slots written since then are taken to hold handles.
	///
	/// Neither the store nor the mapping are modified on error.
	pub fn flatten(
		&mut self,
		main_offset: u32,
		classes: &(impl ?Sized + CombiningClasses),
	) -> Result<usize> {
		if self.elements.is_empty() {
			return Ok(0);
		}

		let previous = scopeguard::guard(
			(self.flattened.take(), &mut self.flattened),
			|(previous, slot)| *slot = previous,
		);

		let (offsets, len) = compute_offsets(&self.elements, main_offset)?;
		let relocate = |bits: u32| -> Result<u32> {
			if !is_contraction(bits) {
				return Ok(bits);
			}
			let payload = bits & PAYLOAD_MASK;
			offsets
				.get(payload as usize)
				.map(|&offset| Ce::ContractionRef(offset).to_bits())
				.ok_or(Error::DanglingReference { payload })
		};

		let mut code_points: Vec<u16> = Vec::new();
		let mut ces: Vec<u32> = Vec::new();
		code_points
			.try_reserve_exact(len)
			.and_then(|()| ces.try_reserve_exact(len))
			.map_err(|_| {
				tracing::warn!(len, "out of memory for flattened contractions");
				Error::OutOfMemory
			})?;

		for entry in &self.elements {
			let pairs = &entry.code_points()[1..];
			code_points.push(CombiningSummary::of(pairs, classes).bits());
			code_points.extend_from_slice(pairs);
			for &bits in entry.ces() {
				ces.push(relocate(bits)?);
			}
		}

		let mapping = self.mapping;
		let unflattened = |code_point: u16| unflatten(&self.relocated, code_point, mapping.get(code_point));
		let mut references = 0_usize;
		for code_point in 0..=u16::MAX {
			let bits = unflattened(code_point);
			if is_contraction(bits) {
				relocate(bits)?;
				references += 1;
			}
		}
		let mut relocated = Vec::new();
		relocated
			.try_reserve_exact(references)
			.map_err(|_| Error::OutOfMemory)?;
		for code_point in 0..=u16::MAX {
			let bits = unflattened(code_point);
			if is_contraction(bits) {
				let written = relocate(bits)?;
				relocated.push(Relocation {
					code_point,
					written,
					payload: bits & PAYLOAD_MASK,
				});
			}
		}
		for relocation in &relocated {
			mapping.set(relocation.code_point, relocation.written);
		}

		let flattened = Flattened {
			main_offset,
			code_points: code_points.into_boxed_slice(),
			ces: ces.into_boxed_slice(),
			offsets: offsets.into_boxed_slice(),
		};
		let (_, slot) = ScopeGuard::into_inner(previous);
		*slot = Some(flattened);
		self.relocated = relocated;

		tracing::debug!(
			entries = self.elements.len(),
			len,
			main_offset,
			relocated = self.relocated.len(),
			"flattened contraction table"
		);
		Ok(len)
	}
}

/// A mapping slot rewritten by the last successful flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Relocation {
	pub(crate) code_point: u16,
	written: u32,
	payload: u32,
}

/// Undoes the relocation of `code_point`'s CE `bits`, iff it's still the one that flatten wrote.
fn unflatten(relocated: &[Relocation], code_point: u16, bits: u32) -> u32 {
	match relocated.binary_search_by_key(&code_point, |relocation| relocation.code_point) {
		Ok(index) if relocated[index].written == bits => {
			Ce::ContractionRef(relocated[index].payload).to_bits()
		}
		_ => bits,
	}
}

/// Assigns every entry its absolute start, before anything is rewritten, so that references may point either way.
///
/// Returns the offsets by handle index and the total number of slots.
fn compute_offsets(elements: &[ContractionEntry], main_offset: u32) -> Result<(Vec<u32>, usize)> {
	let mut offsets = Vec::new();
	offsets
		.try_reserve_exact(elements.len())
		.map_err(|_| Error::OutOfMemory)?;

	let mut next = u64::from(main_offset);
	for entry in elements {
		let offset = u32::try_from(next)
			.ok()
			.filter(|&offset| offset <= PAYLOAD_MASK)
			.ok_or(Error::OffsetOverflow { offset: next })
			.tap_err(|error| tracing::warn!(%error, "contraction table too large"))?;
		offsets.push(offset);
		next += entry.len() as u64;
	}

	(next - u64::from(main_offset))
		.pipe(usize::try_from)
		.map_err(|_| Error::OffsetOverflow { offset: next })
		.map(|len| (offsets, len))
}
