//! Membership representations.
//!
//! A group's membership is exactly one [`Membership`] variant. The variant decides how a
//! local rank turns into a participant:
//!
//! | Variant | Payload | `rank -> participant` |
//! |---|---|---|
//! | [`DenseMembership`] | one slot per member | direct index |
//! | [`StridedMembership`] | `(offset, stride, count)` | parent rank `offset + rank * stride` |
//! | [`BitmapMembership`] | bit per parent rank | position of the `rank`-th set bit |
//! | [`SporadicMembership`] | ascending parent ranks | `list[rank]` |
//!
//! Only dense membership stores [`cohort_proc::ProcRef`]s and therefore owns participant
//! references. The three sparse variants store parent ranks and borrow participants
//! through the parent group, so building or dropping them never touches participant
//! counts.

mod bitmap;
mod dense;
mod sporadic;
mod strided;

pub use bitmap::{BITS_PER_WORD, BitmapMembership};
pub use dense::{DenseMembership, DenseSlot};
pub use sporadic::SporadicMembership;
pub use strided::StridedMembership;

use crate::GroupFlags;

/// Representation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
	Dense,
	Strided,
	Bitmap,
	Sporadic,
}

impl Representation {
	/// Flag bit mirroring this tag.
	pub fn flag(self) -> GroupFlags {
		match self {
			Self::Dense => GroupFlags::DENSE,
			Self::Strided => GroupFlags::STRIDED,
			Self::Bitmap => GroupFlags::BITMAP,
			Self::Sporadic => GroupFlags::SPORADIC,
		}
	}

	pub fn is_sparse(self) -> bool {
		self != Self::Dense
	}
}

/// Rank mapping shared by the representations defined over a parent group.
pub trait SparseMembership {
	/// Number of members.
	fn len(&self) -> usize;

	/// Parent rank of local `rank`, or `None` when out of range.
	fn parent_rank(&self, rank: usize) -> Option<usize>;

	/// Local rank of `parent_rank`, or `None` when the parent rank is not a member.
	fn local_rank(&self, parent_rank: usize) -> Option<usize>;

	/// Largest parent rank referenced, used to validate against the parent's size.
	fn max_parent_rank(&self) -> Option<usize>;
}

/// Membership payload of a group.
#[derive(Debug)]
pub enum Membership {
	Dense(DenseMembership),
	Strided(StridedMembership),
	Bitmap(BitmapMembership),
	Sporadic(SporadicMembership),
}

impl Membership {
	pub fn representation(&self) -> Representation {
		match self {
			Self::Dense(_) => Representation::Dense,
			Self::Strided(_) => Representation::Strided,
			Self::Bitmap(_) => Representation::Bitmap,
			Self::Sporadic(_) => Representation::Sporadic,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::Dense(d) => d.len(),
			Self::Strided(s) => s.len(),
			Self::Bitmap(b) => b.len(),
			Self::Sporadic(s) => s.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn as_dense(&self) -> Option<&DenseMembership> {
		match self {
			Self::Dense(d) => Some(d),
			_ => None,
		}
	}

	pub(crate) fn as_dense_mut(&mut self) -> Option<&mut DenseMembership> {
		match self {
			Self::Dense(d) => Some(d),
			_ => None,
		}
	}

	/// Returns the dense payload.
	///
	/// # Panics
	///
	/// Panics if the membership is sparse; callers must check the tag first.
	#[track_caller]
	pub fn expect_dense(&self) -> &DenseMembership {
		match self {
			Self::Dense(d) => d,
			other => panic!(
				"representation mismatch: expected Dense, found {:?}",
				other.representation()
			),
		}
	}

	/// Parent rank of local `rank` for sparse membership.
	///
	/// Dense membership has no parent rank space and always yields `None`.
	pub fn parent_rank(&self, rank: usize) -> Option<usize> {
		match self {
			Self::Dense(_) => None,
			Self::Strided(s) => s.parent_rank(rank),
			Self::Bitmap(b) => b.parent_rank(rank),
			Self::Sporadic(s) => s.parent_rank(rank),
		}
	}

	/// Local rank of `parent_rank` for sparse membership; `None` for dense.
	pub fn local_rank(&self, parent_rank: usize) -> Option<usize> {
		match self {
			Self::Dense(_) => None,
			Self::Strided(s) => s.local_rank(parent_rank),
			Self::Bitmap(b) => b.local_rank(parent_rank),
			Self::Sporadic(s) => s.local_rank(parent_rank),
		}
	}

	pub(crate) fn max_parent_rank(&self) -> Option<usize> {
		match self {
			Self::Dense(_) => None,
			Self::Strided(s) => s.max_parent_rank(),
			Self::Bitmap(b) => b.max_parent_rank(),
			Self::Sporadic(s) => s.max_parent_rank(),
		}
	}
}
