use std::sync::OnceLock;

use cohort_proc::{ProcName, ProcRef, ProcRegistry};

use crate::Result;

/// One dense member: its name plus the participant record once populated.
///
/// A slot built from a name alone is a sentinel until [`DenseSlot::populate`] fills it.
/// Populating retains the record for the lifetime of the slot.
#[derive(Debug, Clone)]
pub struct DenseSlot {
	name: ProcName,
	proc: OnceLock<ProcRef>,
}

impl DenseSlot {
	pub fn populated(proc: ProcRef) -> Self {
		Self {
			name: proc.name(),
			proc: OnceLock::from(proc),
		}
	}

	pub fn sentinel(name: ProcName) -> Self {
		Self {
			name,
			proc: OnceLock::new(),
		}
	}

	pub fn name(&self) -> ProcName {
		self.name
	}

	/// The record, only if already populated.
	pub fn get(&self) -> Option<&ProcRef> {
		self.proc.get()
	}

	/// The record, populating the slot through `procs` on first use.
	pub fn populate(&self, procs: &dyn ProcRegistry) -> Result<ProcRef> {
		if let Some(proc) = self.proc.get() {
			return Ok(proc.clone());
		}
		let proc = procs.lookup_or_create(&self.name)?;
		Ok(self.proc.get_or_init(|| proc).clone())
	}
}

/// Explicit member table. The only representation owning participant references.
#[derive(Debug, Default)]
pub struct DenseMembership {
	slots: Box<[DenseSlot]>,
}

impl DenseMembership {
	pub fn from_procs(procs: impl IntoIterator<Item = ProcRef>) -> Result<Self> {
		Self::from_slots(procs.into_iter().map(DenseSlot::populated))
	}

	/// Builds slots for `names`, populating those `procs` already knows.
	pub fn from_names(
		names: impl IntoIterator<Item = ProcName>,
		procs: &dyn ProcRegistry,
	) -> Result<Self> {
		Self::from_slots(names.into_iter().map(|name| match procs.lookup_existing(&name) {
			Some(proc) => DenseSlot::populated(proc),
			None => DenseSlot::sentinel(name),
		}))
	}

	pub fn from_slots(slots: impl IntoIterator<Item = DenseSlot>) -> Result<Self> {
		let slots = slots.into_iter();
		let mut buf = Vec::new();
		buf.try_reserve_exact(slots.size_hint().0)?;
		buf.extend(slots);
		Ok(Self {
			slots: buf.into_boxed_slice(),
		})
	}

	/// Copies the first `count` slots, retaining every populated record.
	pub fn truncated(&self, count: usize) -> Result<Self> {
		let count = count.min(self.slots.len());
		Self::from_slots(self.slots[..count].iter().cloned())
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn slot(&self, rank: usize) -> Option<&DenseSlot> {
		self.slots.get(rank)
	}

	pub fn slots(&self) -> &[DenseSlot] {
		&self.slots
	}

	/// Rank of the member named `name`.
	pub fn position(&self, name: &ProcName) -> Option<usize> {
		self.slots.iter().position(|slot| slot.name == *name)
	}

	/// Number of slots holding a participant reference.
	pub fn populated(&self) -> usize {
		self.slots.iter().filter(|slot| slot.get().is_some()).count()
	}

	/// Drops every participant reference and frees the table.
	///
	/// Returns the number of references released.
	pub(crate) fn release(&mut self) -> usize {
		let released = self.populated();
		self.slots = Box::default();
		released
	}
}
