//! Collation elements and contraction handles.
//!
//! A collation element (CE) is a 32-bit weight.
//! Special CEs carry `0xF` in their top nibble and a tag in the next one,
//! and a contraction CE keeps a 24-bit payload in its low bits:
//! a [`Handle`] while the table is being built, a flattened offset afterwards.
//!
//! ```text
//! 31    28 27    24 23                      0
//! +-------+--------+------------------------+
//! |  0xF  |  0x2   |   handle or offset     |
//! +-------+--------+------------------------+
//! ```

use core::fmt::{self, Debug, Formatter};

/// Top-nibble flag shared by all special CEs.
pub const SPECIAL_FLAG: u32 = 0xF000_0000;
/// Selects the tag of a special CE.
pub const TAG_MASK: u32 = 0x0F00_0000;
/// Position of the tag within a special CE.
pub const TAG_SHIFT: u32 = 24;
/// The tag that marks a contraction CE.
pub const CONTRACTION_TAG: u32 = 2;
/// Selects the handle or offset of a contraction CE.
pub const PAYLOAD_MASK: u32 = 0x00FF_FFFF;
/// Payload value meaning "no entry yet".
///
/// This bit pattern only appears inside packed CEs. The API uses `Option<Handle>` instead.
pub const NEW_ELEMENT: u32 = PAYLOAD_MASK;

/// Identifies one contraction entry within its store.
///
/// Handles are dense, allocated in ascending order and never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
	/// The largest handle a store will ever hand out.
	pub const MAX: Self = Self(NEW_ELEMENT - 1);

	/// Creates a handle from its index, iff it fits and isn't the "new element" sentinel.
	#[must_use]
	pub const fn new(index: u32) -> Option<Self> {
		if index < NEW_ELEMENT {
			Some(Self(index))
		} else {
			None
		}
	}

	/// Reads a handle from the low 24 bits of a packed value.
	///
	/// Returns [`None`] for the "new element" sentinel.
	#[must_use]
	pub const fn from_payload(bits: u32) -> Option<Self> {
		Self::new(bits & PAYLOAD_MASK)
	}

	/// The handle's index into its store.
	#[must_use]
	pub const fn index(self) -> usize {
		self.0 as usize
	}

	/// The handle as 24-bit payload.
	#[must_use]
	pub const fn get(self) -> u32 {
		self.0
	}
}

impl Debug for Handle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Handle({})", self.0)
	}
}

/// A collation element, as either a direct weight or a reference into the contraction table.
///
/// Before flattening, [`Ce::ContractionRef`] carries a handle.
/// After flattening, the same variant carries the entry's offset in the flattened buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ce {
	/// Any CE that isn't a contraction reference, kept bit-for-bit.
	Direct(u32),
	/// A contraction reference with its 24-bit payload.
	ContractionRef(u32),
}

impl Ce {
	/// The reserved "no CE here" value.
	pub const NOT_FOUND: Self = Self::Direct(SPECIAL_FLAG);

	/// A reference to the entry behind `handle`.
	#[must_use]
	pub const fn contraction(handle: Handle) -> Self {
		Self::ContractionRef(handle.get())
	}

	/// Decodes a packed CE.
	#[must_use]
	pub const fn from_bits(bits: u32) -> Self {
		if is_contraction(bits) {
			Self::ContractionRef(bits & PAYLOAD_MASK)
		} else {
			Self::Direct(bits)
		}
	}

	/// Encodes this CE into its packed form.
	///
	/// [`Ce::ContractionRef`] payloads are truncated to 24 bits.
	#[must_use]
	pub const fn to_bits(self) -> u32 {
		match self {
			Self::Direct(bits) => bits,
			Self::ContractionRef(payload) => {
				SPECIAL_FLAG | (CONTRACTION_TAG << TAG_SHIFT) | (payload & PAYLOAD_MASK)
			}
		}
	}

	/// The referenced handle, iff this is a pre-flatten contraction reference.
	#[must_use]
	pub const fn handle(self) -> Option<Handle> {
		match self {
			Self::Direct(_) => None,
			Self::ContractionRef(payload) => Handle::from_payload(payload),
		}
	}

	/// Whether this is a [`Ce::ContractionRef`].
	#[must_use]
	pub const fn is_contraction(self) -> bool {
		matches!(self, Self::ContractionRef(_))
	}

	/// Whether this is the reserved [`Ce::NOT_FOUND`] value.
	#[must_use]
	pub const fn is_not_found(self) -> bool {
		matches!(self, Self::Direct(SPECIAL_FLAG))
	}
}

impl From<u32> for Ce {
	fn from(bits: u32) -> Self {
		Self::from_bits(bits)
	}
}

impl From<Ce> for u32 {
	fn from(ce: Ce) -> Self {
		ce.to_bits()
	}
}

/// Whether `bits` is a special CE tagged as contraction.
#[must_use]
pub const fn is_contraction(bits: u32) -> bool {
	bits & SPECIAL_FLAG == SPECIAL_FLAG && (bits & TAG_MASK) >> TAG_SHIFT == CONTRACTION_TAG
}
