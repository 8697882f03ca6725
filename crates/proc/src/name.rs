use std::fmt;

/// Identifier of a launched job (one set of co-scheduled processes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Universe-wide name of a participant: job plus rank within that job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcName {
	pub jobid: JobId,
	pub vpid: u32,
}

impl ProcName {
	pub const fn new(jobid: u32, vpid: u32) -> Self {
		Self {
			jobid: JobId(jobid),
			vpid,
		}
	}
}

impl fmt::Display for ProcName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{},{}]", self.jobid, self.vpid)
	}
}
