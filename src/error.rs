//! Error kinds reported by contraction table operations.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Why a contraction table operation failed.
///
/// Lookup misses are reported through [`Option`] instead, except for
/// [`ContractionStore::change_contraction`](`crate::ContractionStore::change_contraction`),
/// which has nothing else to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
	/// Growing a buffer failed, or the 24-bit handle space is used up.
	///
	/// Fatal to the build in progress. The store can still be dropped safely.
	#[error("out of memory for contractions")]
	OutOfMemory,

	/// An explicit slot write landed at or past the entry's capacity.
	///
	/// Nothing was written.
	#[error("slot {offset} is out of bounds for an entry of capacity {capacity}")]
	IndexOutOfBounds {
		/// The rejected slot.
		offset: usize,
		/// The entry's capacity at the time of the call.
		capacity: usize,
	},

	/// The handle or code point to change doesn't exist.
	#[error("no such contraction")]
	NotFound,

	/// A contraction CE (in an entry or the mapping) names a handle the store never allocated.
	#[error("contraction reference to unallocated handle {payload:#x}")]
	DanglingReference {
		/// The 24-bit payload that didn't name an entry.
		payload: u32,
	},

	/// The flattened table would reach past what a contraction CE can address.
	#[error("flattened offset {offset:#x} does not fit into 24 bits")]
	OffsetOverflow {
		/// The first offset that didn't fit.
		offset: u64,
	},
}
