use super::SparseMembership;
use crate::{GroupError, Result};

/// Arithmetic progression over the parent's ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StridedMembership {
	offset: usize,
	stride: usize,
	count: usize,
}

impl StridedMembership {
	/// Members are parent ranks `offset, offset + stride, ...`, `count` of them.
	pub fn new(offset: usize, stride: usize, count: usize) -> Result<Self> {
		if stride == 0 && count > 1 {
			return Err(GroupError::InvalidArgument(
				"strided membership needs a non-zero stride".into(),
			));
		}
		let span = (count.saturating_sub(1))
			.checked_mul(stride)
			.and_then(|span| span.checked_add(offset));
		if span.is_none() {
			return Err(GroupError::InvalidArgument(format!(
				"strided membership overflows: offset {offset}, stride {stride}, count {count}"
			)));
		}
		Ok(Self {
			offset,
			stride,
			count,
		})
	}

	pub fn offset(&self) -> usize {
		self.offset
	}

	pub fn stride(&self) -> usize {
		self.stride
	}

	/// Parent rank of the last member.
	pub fn last_element(&self) -> Option<usize> {
		self.count
			.checked_sub(1)
			.map(|last| self.offset + last * self.stride)
	}
}

impl SparseMembership for StridedMembership {
	fn len(&self) -> usize {
		self.count
	}

	fn parent_rank(&self, rank: usize) -> Option<usize> {
		(rank < self.count).then(|| self.offset + rank * self.stride)
	}

	fn local_rank(&self, parent_rank: usize) -> Option<usize> {
		let delta = parent_rank.checked_sub(self.offset)?;
		let rank = match self.stride {
			0 => (delta == 0).then_some(0)?,
			stride if delta % stride == 0 => delta / stride,
			_ => return None,
		};
		(rank < self.count).then_some(rank)
	}

	fn max_parent_rank(&self) -> Option<usize> {
		self.last_element()
	}
}
