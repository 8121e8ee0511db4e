//! The tailoring-time contraction table.

use crate::{
	ce::{Ce, Handle},
	config::Config,
	entry::ContractionEntry,
	error::Error,
	flatten::{Flattened, Relocation},
	mapping::Mapping,
	Result,
};
use alloc::vec::Vec;

/// A tailorable registry of contraction entries, addressed by [`Handle`].
///
/// During tailoring, a single writer adds, inserts, sets and changes pairs.
/// [`flatten`](`ContractionStore::flatten`) then packs every entry into contiguous buffers and relocates all references,
/// including those in the borrowed [`Mapping`], from handles to offsets.
///
/// The mapping is shared rather than owned: [`Clone`] copies only the reference,
/// so a derived tailoring can start from an independent copy of its parent's table.
///
/// # Mutation after flattening
///
/// Entries stay available (and mutable) after flattening, but the [`Flattened`] buffers don't follow later changes
/// and the mapping already holds offsets at that point. Flattening again picks up those changes
/// and moves the mapping's references from the old offsets to the new ones.
pub struct ContractionStore<'m, M: ?Sized + Mapping> {
	pub(crate) mapping: &'m M,
	pub(crate) elements: Vec<ContractionEntry>,
	/// Handle capacity, tracked separately from the [`Vec`]'s so that growth stays a strict doubling.
	capacity: usize,
	config: Config,
	pub(crate) flattened: Option<Flattened>,
	/// Mapping slots rewritten by the last successful flatten, by code point.
	pub(crate) relocated: Vec<Relocation>,
}

impl<'m, M: ?Sized + Mapping> ContractionStore<'m, M> {
	/// Opens an empty store bound to `mapping`, using the default [`Config`].
	#[must_use]
	pub fn open(mapping: &'m M) -> Self {
		Self::open_with(mapping, Config::default())
	}

	/// Opens an empty store bound to `mapping`.
	///
	/// Nothing is allocated until the first entry is.
	#[must_use]
	pub fn open_with(mapping: &'m M, config: Config) -> Self {
		Self {
			mapping,
			elements: Vec::new(),
			capacity: config.initial_handle_capacity(),
			config,
			flattened: None,
			relocated: Vec::new(),
		}
	}

	/// Releases all entries and buffers.
	///
	/// This is the same as dropping the store.
	pub fn close(self) {
		tracing::trace!(entries = self.elements.len(), "closing contraction store");
	}

	/// The mapping this store patches when flattening.
	#[must_use]
	pub fn mapping(&self) -> &'m M {
		self.mapping
	}

	/// The configuration this store was opened with.
	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The number of allocated entries.
	#[must_use]
	pub fn len(&self) -> usize {
		self.elements.len()
	}

	/// Whether no entry was allocated yet.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.elements.is_empty()
	}

	/// How many handles fit before the handle table has to grow again.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// The entry behind `handle`, iff allocated.
	#[must_use]
	pub fn entry(&self, handle: Handle) -> Option<&ContractionEntry> {
		self.elements.get(handle.index())
	}

	/// The runtime form produced by the last successful [`flatten`](`ContractionStore::flatten`), iff any.
	#[must_use]
	pub fn flattened(&self) -> Option<&Flattened> {
		self.flattened.as_ref()
	}

	/// Allocates a fresh entry and returns its handle.
	///
	/// The handle table doubles once it's full.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`] iff the entry or the handle table can't be allocated,
	/// or if all [`Handle::MAX`] handles are in use.
	pub fn allocate(&mut self) -> Result<Handle> {
		let handle = u32::try_from(self.elements.len())
			.ok()
			.and_then(Handle::new)
			.ok_or_else(|| {
				tracing::warn!("contraction handle space exhausted");
				Error::OutOfMemory
			})?;

		if self.elements.capacity() < self.capacity {
			self.elements
				.try_reserve_exact(self.capacity - self.elements.len())
				.map_err(|_| {
					tracing::warn!(capacity = self.capacity, "out of memory for contraction parts");
					Error::OutOfMemory
				})?;
		}
		let entry = ContractionEntry::with_capacity(self.config.initial_entry_capacity())?;
		self.elements.push(entry);

		if self.elements.len() == self.capacity {
			self.capacity *= 2;
			tracing::trace!(capacity = self.capacity, "grew contraction handle table");
		}

		tracing::trace!(?handle, "allocated contraction entry");
		Ok(handle)
	}

	/// Looks up the entry behind `handle`, or allocates one for [`None`].
	///
	/// Returns [`None`] for a handle that was never allocated.
	///
	/// # Errors
	///
	/// Those of [`allocate`](`ContractionStore::allocate`).
	pub fn resolve(
		&mut self,
		handle: Option<Handle>,
	) -> Result<Option<(Handle, &mut ContractionEntry)>> {
		let handle = match handle {
			Some(handle) => handle,
			None => self.allocate()?,
		};
		Ok(self
			.elements
			.get_mut(handle.index())
			.map(|entry| (handle, entry)))
	}

	/// Like [`resolve`](`ContractionStore::resolve`), but also allocates in place of an unknown handle.
	fn resolve_for_write(&mut self, handle: Option<Handle>) -> Result<(Handle, &mut ContractionEntry)> {
		if let Some(handle) = handle.filter(|handle| handle.index() < self.elements.len()) {
			return Ok((handle, &mut self.elements[handle.index()]));
		}
		let handle = self.allocate()?;
		Ok((handle, &mut self.elements[handle.index()]))
	}

	/// Appends `(code_point, ce)` to the entry behind `handle`, allocating it iff necessary.
	///
	/// Returns a [`Ce::ContractionRef`] to the entry that was written.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`].
	pub fn add_contraction(&mut self, handle: Option<Handle>, code_point: u16, ce: Ce) -> Result<Ce> {
		let (handle, entry) = self.resolve_for_write(handle)?;
		entry.append(code_point, ce)?;
		Ok(Ce::contraction(handle))
	}

	/// Inserts `(code_point, ce)` into the entry behind `handle` in code point order, allocating it iff necessary.
	///
	/// Returns a [`Ce::ContractionRef`] to the entry that was written.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`].
	pub fn insert_contraction(
		&mut self,
		handle: Option<Handle>,
		code_point: u16,
		ce: Ce,
	) -> Result<Ce> {
		let (handle, entry) = self.resolve_for_write(handle)?;
		entry.sorted_insert(code_point, ce)?;
		Ok(Ce::contraction(handle))
	}

	/// Overwrites slot `offset` of the entry behind `handle`, allocating it iff necessary.
	///
	/// Returns a [`Ce::ContractionRef`] to the entry that was written.
	///
	/// # Errors
	///
	/// [`Error::IndexOutOfBounds`] iff `offset` is past the entry's capacity, [`Error::OutOfMemory`].
	pub fn set_contraction(
		&mut self,
		handle: Option<Handle>,
		offset: usize,
		code_point: u16,
		ce: Ce,
	) -> Result<Ce> {
		let (handle, entry) = self.resolve_for_write(handle)?;
		entry.overwrite_at(offset, code_point, ce)?;
		Ok(Ce::contraction(handle))
	}

	/// Replaces the CE stored for `code_point` in the entry behind `handle`.
	///
	/// Never allocates. The entry is searched in ascending code point order.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] iff `handle` isn't allocated or doesn't list `code_point`.
	/// Nothing changes in that case.
	pub fn change_contraction(&mut self, handle: Handle, code_point: u16, new_ce: Ce) -> Result<Handle> {
		let entry = self.elements.get_mut(handle.index()).ok_or(Error::NotFound)?;
		let slot = entry.find(code_point).ok_or(Error::NotFound)?;
		entry.replace_ce(slot, new_ce);
		Ok(handle)
	}

	/// Replaces the CE of the pair that was appended last to the entry behind `handle`, allocating it iff necessary.
	///
	/// This patches placeholder weights that could only be computed after the pair was added.
	/// On a fresh entry, the CE of the reserved slot 0 is replaced.
	///
	/// # Errors
	///
	/// [`Error::OutOfMemory`].
	pub fn change_last_ce(&mut self, handle: Option<Handle>, new_ce: Ce) -> Result<Ce> {
		let (handle, entry) = self.resolve_for_write(handle)?;
		entry.replace_last_ce(new_ce);
		Ok(Ce::contraction(handle))
	}

	/// The CE stored for `code_point` in the entry behind `handle`.
	#[must_use]
	pub fn find_ce(&self, handle: Handle, code_point: u16) -> Option<Ce> {
		let entry = self.entry(handle)?;
		entry.find(code_point).and_then(|slot| entry.ce_at(slot))
	}

	/// The slot of `code_point` in the entry behind `handle`.
	#[must_use]
	pub fn find_cp(&self, handle: Handle, code_point: u16) -> Option<usize> {
		self.entry(handle)?.find(code_point)
	}

	/// The CE in logical slot `slot` of the entry behind `handle`.
	#[must_use]
	pub fn ce_at(&self, handle: Handle, slot: usize) -> Option<Ce> {
		self.entry(handle)?.ce_at(slot)
	}

	/// Whether the code points in `sequence`, read up to the first `0`, reach a tailored CE starting at `handle`.
	///
	/// Each code point is looked up in the current entry:
	/// a miss means "not tailored", a direct CE means "tailored", and a contraction reference continues in the referenced entry.
	/// Once the sequence runs out, the last entry decides through its empty-continuation CE in slot 0.
	#[must_use]
	pub fn is_tailored(&self, handle: Handle, sequence: &[u16]) -> bool {
		let mut current = handle;
		for &code_point in sequence.iter().take_while(|&&code_point| code_point != 0) {
			match self.find_ce(current, code_point) {
				None => return false,
				Some(ce) if ce.is_not_found() => return false,
				Some(Ce::Direct(_)) => return true,
				Some(ce @ Ce::ContractionRef(_)) => match ce.handle() {
					Some(next) => current = next,
					None => return false,
				},
			}
		}
		self.ce_at(current, 0).is_some_and(|ce| !ce.is_not_found())
	}

	/// Turns `code_point` into the start of the contraction behind `handle`.
	///
	/// The mapping's previous CE for `code_point` becomes the entry's empty-continuation CE (slot 0),
	/// unless that is already set or the previous CE is itself a contraction.
	/// The mapping then refers to `handle`.
	///
	/// Returns the previous CE.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] iff `handle` isn't allocated. The mapping isn't touched in that case.
	pub fn attach(&mut self, code_point: u16, handle: Handle) -> Result<Ce> {
		let entry = self.elements.get_mut(handle.index()).ok_or(Error::NotFound)?;
		let previous = Ce::from_bits(self.mapping.get(code_point));
		if !previous.is_contraction() && entry.base_ce().is_none() {
			entry.replace_ce(0, previous);
		}
		self.mapping.set(code_point, Ce::contraction(handle).to_bits());
		self.relocated.retain(|relocation| relocation.code_point != code_point);
		Ok(previous)
	}
}

/// Deep-copies all entries (each shrunk to its logical length) and flattened buffers.
///
/// The mapping reference is shared.
impl<M: ?Sized + Mapping> Clone for ContractionStore<'_, M> {
	fn clone(&self) -> Self {
		tracing::debug!(
			entries = self.elements.len(),
			flattened = self.flattened.is_some(),
			"cloning contraction store"
		);
		Self {
			mapping: self.mapping,
			elements: self.elements.iter().map(ContractionEntry::clone).collect(),
			capacity: self.capacity,
			config: self.config,
			flattened: self.flattened.clone(),
			relocated: self.relocated.clone(),
		}
	}
}

impl<M: ?Sized + Mapping> core::fmt::Debug for ContractionStore<'_, M> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("ContractionStore")
			.field("elements", &self.elements)
			.field("capacity", &self.capacity)
			.field("config", &self.config)
			.field("flattened", &self.flattened)
			.finish_non_exhaustive()
	}
}
