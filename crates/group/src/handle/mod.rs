//! Integer handle table.
//!
//! Maps small non-negative integers to live entries so that an opaque handle crossing a
//! language boundary can be turned back into the object it names.
//!
//! # Invariants
//!
//! * Live handles are unique; a handle is reused only after its slot is released.
//! * Growth is geometric and never exceeds the configured bound. Hitting the bound is an
//!   ordinary [`GroupError::HandleExhausted`], not a panic.
//! * Releasing a vacant or out-of-range handle is a no-op.
//! * Once closed, the table rejects allocations with [`GroupError::Finalized`].

use std::fmt;

use slab::Slab;

use crate::{GroupError, HANDLE_MAX, INITIAL_HANDLES_MAX, Result};

/// Handle naming a live table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
	pub fn index(self) -> usize {
		self.0 as usize
	}

	/// Value handed across the binding boundary.
	pub fn as_raw(self) -> i32 {
		self.0 as i32
	}

	/// Converts a binding-layer value; negative values name nothing.
	pub fn from_raw(raw: i32) -> Option<Self> {
		u32::try_from(raw).ok().map(Self)
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Slot table with bounded geometric growth.
pub struct HandleTable<T> {
	slots: Slab<T>,
	max: usize,
	closed: bool,
}

impl<T> HandleTable<T> {
	/// Creates a table with `initial` reserved slots and at most `max` live entries.
	///
	/// `max` is clamped to [`HANDLE_MAX`] and the up-front reservation to
	/// [`INITIAL_HANDLES_MAX`].
	pub fn new(initial: usize, max: usize) -> Self {
		let max = max.min(HANDLE_MAX);
		Self {
			slots: Slab::with_capacity(initial.min(max).min(INITIAL_HANDLES_MAX)),
			max,
			closed: false,
		}
	}

	/// Inserts `entry` and returns its handle.
	pub fn allocate(&mut self, entry: T) -> Result<Handle> {
		if self.closed {
			return Err(GroupError::Finalized);
		}
		let len = self.slots.len();
		if len >= self.max {
			return Err(GroupError::HandleExhausted { limit: self.max });
		}
		if len == self.slots.capacity() {
			let grow = len.max(1).min(self.max - len);
			self.slots.reserve_exact(grow);
		}
		let key = self.slots.insert(entry);
		debug_assert!(key < HANDLE_MAX);
		Ok(Handle(key as u32))
	}

	pub fn get(&self, handle: Handle) -> Option<&T> {
		self.slots.get(handle.index())
	}

	pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
		self.slots.get_mut(handle.index())
	}

	/// Clears the slot and returns what it held.
	pub fn release(&mut self, handle: Handle) -> Option<T> {
		self.slots.try_remove(handle.index())
	}

	/// Clears the slot only if its entry satisfies `owns`.
	///
	/// Used by destructors to avoid clearing a slot that has already been reused.
	pub fn release_if(&mut self, handle: Handle, owns: impl FnOnce(&T) -> bool) -> Option<T> {
		match self.slots.get(handle.index()) {
			Some(entry) if owns(entry) => self.slots.try_remove(handle.index()),
			_ => None,
		}
	}

	/// Closes the table and hands back every remaining entry.
	pub fn close(&mut self) -> Vec<T> {
		self.closed = true;
		let entries = self.slots.drain().collect();
		self.slots.shrink_to_fit();
		entries
	}

	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Reserved slots, live or vacant.
	pub fn capacity(&self) -> usize {
		self.slots.capacity()
	}

	pub fn max(&self) -> usize {
		self.max
	}

	/// Live handles in ascending order.
	pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
		self.slots.iter().map(|(key, _)| Handle(key as u32))
	}
}
