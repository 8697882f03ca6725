use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{JobId, Proc, ProcError, ProcName, ProcRef, Result};

/// Source of participant records for group membership.
///
/// Implementations hand out shared [`ProcRef`]s; reference counting on the returned
/// records must be atomic because groups are built and dropped from many threads.
pub trait ProcRegistry: Send + Sync {
	/// Returns the record for `name` only if it has already been populated.
	fn lookup_existing(&self, name: &ProcName) -> Option<ProcRef>;

	/// Returns the record for `name`, populating it on first use.
	fn lookup_or_create(&self, name: &ProcName) -> Result<ProcRef>;

	/// Name of the calling process.
	fn local_name(&self) -> ProcName;
}

/// In-memory participant table.
///
/// Holds one reference to every populated record until [`ProcTable::remove`] drops it,
/// so a record outlives the groups that include it unless the table lets go too.
pub struct ProcTable {
	local: ProcName,
	jobs: RwLock<FxHashMap<JobId, u32>>,
	procs: RwLock<FxHashMap<ProcName, ProcRef>>,
}

impl ProcTable {
	/// Creates a table whose local process is `local`.
	///
	/// The local job is registered with `local_job_size` ranks.
	pub fn new(local: ProcName, local_job_size: u32) -> Self {
		let mut jobs = FxHashMap::default();
		jobs.insert(local.jobid, local_job_size);
		Self {
			local,
			jobs: RwLock::new(jobs),
			procs: RwLock::new(FxHashMap::default()),
		}
	}

	/// Registers (or resizes) a job so its ranks can be populated lazily.
	pub fn add_job(&self, jobid: JobId, size: u32) {
		self.jobs.write().insert(jobid, size);
	}

	/// Eagerly populates every rank of a registered job, returning them in rank order.
	pub fn populate_job(&self, jobid: JobId) -> Result<Vec<ProcRef>> {
		let size = self
			.jobs
			.read()
			.get(&jobid)
			.copied()
			.ok_or(ProcError::UnknownJob(jobid))?;
		(0..size)
			.map(|vpid| {
				self.lookup_or_create(&ProcName {
					jobid,
					vpid,
				})
			})
			.collect()
	}

	/// Drops the table's own reference to `name`.
	pub fn remove(&self, name: &ProcName) -> Option<ProcRef> {
		self.procs.write().remove(name)
	}

	/// Number of populated records.
	pub fn len(&self) -> usize {
		self.procs.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.procs.read().is_empty()
	}

	fn check_bounds(&self, name: &ProcName) -> Result<()> {
		let jobs = self.jobs.read();
		let size = *jobs.get(&name.jobid).ok_or(ProcError::UnknownJob(name.jobid))?;
		if name.vpid >= size {
			return Err(ProcError::OutOfRange { name: *name, size });
		}
		Ok(())
	}
}

impl ProcRegistry for ProcTable {
	fn lookup_existing(&self, name: &ProcName) -> Option<ProcRef> {
		self.procs.read().get(name).cloned()
	}

	fn lookup_or_create(&self, name: &ProcName) -> Result<ProcRef> {
		if let Some(proc) = self.lookup_existing(name) {
			return Ok(proc);
		}
		self.check_bounds(name)?;

		let local = *name == self.local;
		let mut procs = self.procs.write();
		let proc = procs.entry(*name).or_insert_with(|| {
			tracing::trace!(proc = %name, local, "populating participant record");
			Arc::new(Proc::new(*name, local))
		});
		Ok(proc.clone())
	}

	fn local_name(&self) -> ProcName {
		self.local
	}
}
