use std::sync::Arc;

use crate::ProcName;

/// Shared handle to a participant record.
///
/// Cloning retains, dropping releases.
pub type ProcRef = Arc<Proc>;

/// One addressable process in the universe.
#[derive(Debug, PartialEq, Eq)]
pub struct Proc {
	name: ProcName,
	local: bool,
}

impl Proc {
	pub fn new(name: ProcName, local: bool) -> Self {
		Self { name, local }
	}

	pub fn name(&self) -> ProcName {
		self.name
	}

	/// Returns true for the record describing the calling process.
	pub fn is_local(&self) -> bool {
		self.local
	}
}
