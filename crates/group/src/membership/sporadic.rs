use super::SparseMembership;
use crate::{GroupError, Result};

/// Explicit ascending list of parent ranks.
///
/// Suits small irregular subsets of a much larger parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SporadicMembership {
	ranks: Box<[usize]>,
}

impl SporadicMembership {
	/// `ranks` must be strictly ascending.
	pub fn new(ranks: Vec<usize>) -> Result<Self> {
		if let Some(w) = ranks.windows(2).find(|w| w[0] >= w[1]) {
			return Err(GroupError::InvalidArgument(format!(
				"sporadic ranks must be strictly ascending, found {} then {}",
				w[0], w[1]
			)));
		}
		Ok(Self {
			ranks: ranks.into_boxed_slice(),
		})
	}

	pub fn ranks(&self) -> &[usize] {
		&self.ranks
	}
}

impl SparseMembership for SporadicMembership {
	fn len(&self) -> usize {
		self.ranks.len()
	}

	fn parent_rank(&self, rank: usize) -> Option<usize> {
		self.ranks.get(rank).copied()
	}

	fn local_rank(&self, parent_rank: usize) -> Option<usize> {
		self.ranks.binary_search(&parent_rank).ok()
	}

	fn max_parent_rank(&self) -> Option<usize> {
		self.ranks.last().copied()
	}
}
