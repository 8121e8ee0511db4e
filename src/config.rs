//! Construction-time tuning.

/// Initial capacities of a [`ContractionStore`](`crate::ContractionStore`) and its entries.
///
/// Both grow by doubling from here, so every value is clamped to at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	initial_handle_capacity: usize,
	initial_entry_capacity: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self::new()
	}
}

impl Config {
	/// Slots (or handles) reserved up front when nothing else is configured.
	pub const DEFAULT_CAPACITY: usize = 20;

	/// Creates the default configuration.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			initial_handle_capacity: Self::DEFAULT_CAPACITY,
			initial_entry_capacity: Self::DEFAULT_CAPACITY,
		}
	}

	/// Sets how many handles a fresh store has room for.
	#[must_use]
	pub const fn with_initial_handle_capacity(mut self, capacity: usize) -> Self {
		self.initial_handle_capacity = clamp(capacity);
		self
	}

	/// Sets how many slots (including the reserved slot 0) a fresh entry has room for.
	#[must_use]
	pub const fn with_initial_entry_capacity(mut self, capacity: usize) -> Self {
		self.initial_entry_capacity = clamp(capacity);
		self
	}

	/// How many handles a fresh store has room for.
	#[must_use]
	pub const fn initial_handle_capacity(&self) -> usize {
		self.initial_handle_capacity
	}

	/// How many slots a fresh entry has room for.
	#[must_use]
	pub const fn initial_entry_capacity(&self) -> usize {
		self.initial_entry_capacity
	}
}

const fn clamp(capacity: usize) -> usize {
	if capacity == 0 {
		1
	} else {
		capacity
	}
}
