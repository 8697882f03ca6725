use std::collections::TryReserveError;

use cohort_instance::InstanceError;
use cohort_proc::ProcError;

/// Result alias for group operations.
pub type Result<T, E = GroupError> = std::result::Result<T, E>;

/// Recoverable group failures.
///
/// Invoking a representation-specific operation on the wrong representation is a
/// contract violation and panics instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
	/// Every handle up to the configured bound is in use.
	#[error("handle table exhausted (limit {limit})")]
	HandleExhausted { limit: usize },
	/// Membership storage could not be reserved.
	#[error("out of memory for group storage")]
	Storage(#[from] TryReserveError),
	/// The group subsystem has been finalized.
	#[error("group subsystem finalized")]
	Finalized,
	#[error("rank {rank} out of range for group of size {size}")]
	RankOutOfRange { rank: usize, size: usize },
	/// Malformed representation payload.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	/// Lazy participant population failed.
	#[error(transparent)]
	Proc(#[from] ProcError),
	#[error(transparent)]
	Instance(#[from] InstanceError),
	#[error("invalid group config: {0}")]
	Config(#[from] toml::de::Error),
}
