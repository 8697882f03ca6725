//! Shared alias for the set of all failed participants.
//!
//! The alias is hot-swapped as failures are discovered. Readers take a retained
//! snapshot with [`FailedProcs::snapshot`] and work on it as if later failures had not
//! happened yet; no lock is involved on the read side. Writers serialize on a mutex,
//! publish the replacement atomically, and drop the previous group only after the mutex
//! is released.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use cohort_proc::ProcRef;
use parking_lot::Mutex;

use crate::registry::{Shared, check_owned};
use crate::{Group, GroupError, GroupRegistry, Result};

pub struct FailedProcs {
	current: ArcSwapOption<Group>,
	writer: Mutex<()>,
	shared: Arc<Shared>,
}

impl FailedProcs {
	pub(crate) fn new(initial: Arc<Group>) -> Self {
		Self {
			shared: initial.shared().clone(),
			current: ArcSwapOption::from(Some(initial)),
			writer: Mutex::new(()),
		}
	}

	/// Retained copy of the current group; `None` once finalized.
	pub fn snapshot(&self) -> Option<Arc<Group>> {
		self.current.load_full()
	}

	/// Adds `failed` to the set and publishes the result.
	///
	/// Participants already present are skipped; the order of first failure is kept.
	/// Returns the published group, which is the current one if nothing was added.
	pub fn record(
		&self,
		registry: &GroupRegistry,
		failed: impl IntoIterator<Item = ProcRef>,
	) -> Result<Arc<Group>> {
		let guard = self.writer.lock();
		let current = self.current.load_full().ok_or(GroupError::Finalized)?;
		if !Arc::ptr_eq(registry.shared(), &self.shared) {
			return Err(GroupError::InvalidArgument(
				"failed participants recorded through another registry".into(),
			));
		}

		let mut procs = current.peers().collect::<Result<Vec<_>>>()?;
		let before = procs.len();
		for proc in failed {
			if !procs.iter().any(|p| p.name() == proc.name()) {
				procs.push(proc);
			}
		}
		if procs.len() == before {
			return Ok(current);
		}

		let next = registry.allocate_dense(procs)?;
		let previous = self.current.swap(Some(next.clone()));
		drop(guard);

		tracing::debug!(
			handle = %next.handle(),
			failed = next.member_count(),
			"failed participants updated"
		);
		drop(previous);
		Ok(next)
	}

	/// Publishes `group` as the new alias and returns the previous one.
	///
	/// `group` must come from the registry owning this alias. Once finalized, nothing is
	/// published.
	pub fn replace(&self, group: Arc<Group>) -> Result<Arc<Group>> {
		check_owned(&self.shared, &group)?;
		let _guard = self.writer.lock();
		if self.current.load().is_none() {
			return Err(GroupError::Finalized);
		}
		self.current
			.swap(Some(group))
			.ok_or(GroupError::Finalized)
	}

	pub(crate) fn clear(&self) {
		let previous = {
			let _guard = self.writer.lock();
			self.current.swap(None)
		};
		drop(previous);
	}
}
