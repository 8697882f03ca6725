//! The group object.
//!
//! A [`Group`] is an immutable membership set shared as `Arc<Group>`. It is born through
//! [`crate::GroupRegistry`], which assigns its [`Handle`], and dies when the last `Arc`
//! drops.
//!
//! # Lifecycle
//!
//! Construction: payload validated and built, handle slot allocated, object published.
//! A failure at any step drops what was built so far, which releases any participant
//! references already taken.
//!
//! Destruction runs in [`Drop`]:
//!
//! 1. Dense membership releases its participant references.
//! 2. The parent backlink is released.
//! 3. The handle slot is cleared if it still names this object.
//!
//! Sparse payloads are freed with the rest of the object and never touch participant
//! counts.

use std::fmt;
use std::sync::Arc;

use cohort_proc::{ProcName, ProcRef};

use crate::registry::Shared;
use crate::{GroupError, GroupFlags, Handle, Membership, Representation, Result};

/// Sentinel values the binding layer expects for non-member ranks.
pub const UNDEFINED: i32 = -32766;
pub const PROC_NULL: i32 = -2;

/// The calling process's rank within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfRank {
	Member(usize),
	/// The caller is not a member.
	Undefined,
	/// Rank carried by the NULL group.
	ProcNull,
}

impl SelfRank {
	pub fn rank(self) -> Option<usize> {
		match self {
			Self::Member(rank) => Some(rank),
			Self::Undefined | Self::ProcNull => None,
		}
	}

	pub fn as_raw(self) -> i32 {
		match self {
			Self::Member(rank) => i32::try_from(rank).unwrap_or(UNDEFINED),
			Self::Undefined => UNDEFINED,
			Self::ProcNull => PROC_NULL,
		}
	}

	/// Clamps to `Undefined` when the rank falls at or beyond `cap`.
	pub fn capped(self, cap: usize) -> Self {
		match self {
			Self::Member(rank) if rank >= cap => Self::Undefined,
			other => other,
		}
	}
}

impl From<Option<usize>> for SelfRank {
	fn from(rank: Option<usize>) -> Self {
		rank.map_or(Self::Undefined, Self::Member)
	}
}

/// Everything a group is built from, before it owns a handle.
pub(crate) struct GroupParts {
	pub membership: Membership,
	pub self_rank: SelfRank,
	pub parent: Option<Arc<Group>>,
	pub intrinsic: bool,
}

/// A set of communicating participants.
pub struct Group {
	handle: Handle,
	self_rank: SelfRank,
	flags: GroupFlags,
	membership: Membership,
	parent: Option<Arc<Group>>,
	shared: Arc<Shared>,
}

impl Group {
	pub(crate) fn new(handle: Handle, parts: GroupParts, shared: Arc<Shared>) -> Self {
		let mut flags = parts.membership.representation().flag();
		flags.set(GroupFlags::INTRINSIC, parts.intrinsic);
		debug_assert_eq!((flags & GroupFlags::REPRESENTATION).bits().count_ones(), 1);
		Self {
			handle,
			self_rank: parts.self_rank,
			flags,
			membership: parts.membership,
			parent: parts.parent,
			shared,
		}
	}

	pub fn handle(&self) -> Handle {
		self.handle
	}

	pub fn member_count(&self) -> usize {
		self.membership.len()
	}

	pub fn is_empty(&self) -> bool {
		self.membership.is_empty()
	}

	pub fn self_rank(&self) -> SelfRank {
		self.self_rank
	}

	pub fn flags(&self) -> GroupFlags {
		self.flags
	}

	pub fn representation(&self) -> Representation {
		self.membership.representation()
	}

	pub fn membership(&self) -> &Membership {
		&self.membership
	}

	pub fn is_dense(&self) -> bool {
		self.flags.contains(GroupFlags::DENSE)
	}

	pub fn is_intrinsic(&self) -> bool {
		self.flags.contains(GroupFlags::INTRINSIC)
	}

	pub(crate) fn shared(&self) -> &Arc<Shared> {
		&self.shared
	}

	/// Group whose rank space a sparse membership is defined over.
	pub fn parent(&self) -> Option<&Arc<Group>> {
		self.parent.as_ref()
	}

	#[track_caller]
	fn sparse_parent(&self) -> &Group {
		match self.parent.as_deref() {
			Some(parent) => parent,
			None => panic!(
				"{:?} group {} has no parent backlink",
				self.representation(),
				self.handle
			),
		}
	}

	fn check_rank(&self, rank: usize) -> Result<()> {
		let size = self.member_count();
		if rank >= size {
			return Err(GroupError::RankOutOfRange { rank, size });
		}
		Ok(())
	}

	/// Participant at `rank`, populating it through the participant registry if needed.
	pub fn peer(&self, rank: usize) -> Result<ProcRef> {
		self.check_rank(rank)?;
		match &self.membership {
			Membership::Dense(dense) => match dense.slot(rank) {
				Some(slot) => slot.populate(&*self.shared.procs),
				None => Err(GroupError::RankOutOfRange {
					rank,
					size: dense.len(),
				}),
			},
			sparse => {
				let parent_rank = sparse.parent_rank(rank).ok_or(GroupError::RankOutOfRange {
					rank,
					size: sparse.len(),
				})?;
				self.sparse_parent().peer(parent_rank)
			}
		}
	}

	/// Participant at `rank` only if its record is already populated.
	pub fn peer_existing(&self, rank: usize) -> Option<ProcRef> {
		match &self.membership {
			Membership::Dense(dense) => dense.slot(rank)?.get().cloned(),
			sparse => {
				let parent_rank = sparse.parent_rank(rank)?;
				self.sparse_parent().peer_existing(parent_rank)
			}
		}
	}

	/// Name of the participant at `rank`, without populating anything.
	pub fn proc_name(&self, rank: usize) -> Option<ProcName> {
		match &self.membership {
			Membership::Dense(dense) => dense.slot(rank).map(|slot| slot.name()),
			sparse => {
				let parent_rank = sparse.parent_rank(rank)?;
				self.sparse_parent().proc_name(parent_rank)
			}
		}
	}

	/// Rank of the participant named `name`.
	pub fn rank_of(&self, name: &ProcName) -> Option<usize> {
		match &self.membership {
			Membership::Dense(dense) => dense.position(name),
			sparse => {
				let parent_rank = self.sparse_parent().rank_of(name)?;
				sparse.local_rank(parent_rank)
			}
		}
	}

	/// Every member in rank order.
	pub fn peers(&self) -> impl Iterator<Item = Result<ProcRef>> + '_ {
		(0..self.member_count()).map(move |rank| self.peer(rank))
	}
}

impl fmt::Debug for Group {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Group")
			.field("handle", &self.handle)
			.field("representation", &self.representation())
			.field("members", &self.member_count())
			.field("self_rank", &self.self_rank)
			.field("flags", &self.flags)
			.field("parent", &self.parent.as_ref().map(|p| p.handle))
			.finish()
	}
}

impl Drop for Group {
	fn drop(&mut self) {
		let released = self
			.membership
			.as_dense_mut()
			.map_or(0, |dense| dense.release());

		drop(self.parent.take());

		let cleared = if self.is_intrinsic() {
			false
		} else {
			let me: *const Group = &*self;
			self.shared
				.table
				.lock()
				.release_if(self.handle, |slot| std::ptr::eq(slot.as_ptr(), me))
				.is_some()
		};

		tracing::trace!(handle = %self.handle, released, cleared, "group destructed");
	}
}
