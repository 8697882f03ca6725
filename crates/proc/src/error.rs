use crate::{JobId, ProcName};

/// Result alias for participant registry operations.
pub type Result<T, E = ProcError> = std::result::Result<T, E>;

/// Failures while resolving a participant record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcError {
	/// The job has not been registered with the table.
	#[error("unknown job {0}")]
	UnknownJob(JobId),
	/// The rank lies outside the job's size.
	#[error("{name} is outside job of size {size}")]
	OutOfRange { name: ProcName, size: u32 },
}
