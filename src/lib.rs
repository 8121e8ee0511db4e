//! A tailorable collation contraction table that flattens into a compact, offset-addressed runtime layout.
//!
//! A contraction is a sequence of code points that collates as one unit, like Slovak "ch".
//! While a tailoring is built, each contraction node lives in its own growable [`ContractionEntry`],
//! reachable through a [`Handle`] that contraction CEs ([`Ce::ContractionRef`]) carry in their low 24 bits.
//!
//! Once all rules are applied, [`ContractionStore::flatten`] packs the entries into contiguous buffers
//! and rewrites every handle (in the entries and in the borrowed [`Mapping`]) into an offset.
//! The resulting [`Flattened`] table is plain data and can be shared freely.
//!
//! Tailorings derived from another locale [`Clone`] its store and keep going from there.
//!
//! # Example
//!
//! ```
//! use cnttab::{uniform_mapping, Ce, ContractionStore, Mapping};
//!
//! let mapping = uniform_mapping(Ce::Direct(0x1000));
//! let mut store = ContractionStore::open(&mapping);
//!
//! // "A" followed by U+0301 COMBINING ACUTE ACCENT sorts on its own.
//! let reference = store.add_contraction(None, 0x0301, Ce::Direct(0x2000))?;
//! store.attach(0x0041, reference.handle().unwrap())?;
//!
//! store.flatten(0, &|code_point: u16| -> u8 { if code_point == 0x0301 { 230 } else { 0 } })?;
//! assert_eq!(Mapping::get(&mapping, 0x0041), Ce::ContractionRef(0).to_bits());
//!
//! let table = store.flattened().unwrap();
//! assert_eq!(table.find_ce_at(0, 0x0301), Some(Ce::Direct(0x2000)));
//! # Ok::<(), cnttab::Error>(())
//! ```
#![no_std]
#![doc(html_root_url = "https://docs.rs/cnttab/0.0.1")]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
mod readme {}

extern crate alloc;

mod ce;
mod config;
mod entry;
mod error;
mod flatten;
mod mapping;
mod store;

pub use ce::{
	is_contraction, Ce, Handle, CONTRACTION_TAG, NEW_ELEMENT, PAYLOAD_MASK, SPECIAL_FLAG, TAG_MASK,
	TAG_SHIFT,
};
pub use config::Config;
pub use entry::{ContractionEntry, Pairs};
pub use error::{Error, Result};
pub use flatten::{CombiningSummary, Flattened};
pub use mapping::{uniform_mapping, CombiningClasses, Mapping};
pub use store::ContractionStore;
