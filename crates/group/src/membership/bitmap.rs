use super::SparseMembership;
use crate::{GroupError, Result};

/// Bits per bitmap word.
pub const BITS_PER_WORD: usize = u64::BITS as usize;

/// Packed bit vector over the parent's ranks; bit `i` set means parent rank `i` is a
/// member.
///
/// Resolving local rank `r` searches for the `r`-th set bit. Whole words are skipped by
/// popcount, so the scan is linear in the word count rather than the member count. No
/// prefix-count index is kept; density is preferred over rank-lookup speed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapMembership {
	words: Box<[u64]>,
	parent_size: usize,
	count: usize,
}

impl BitmapMembership {
	/// Builds a bitmap over `parent_size` ranks with the given members set.
	pub fn from_ranks(parent_size: usize, ranks: impl IntoIterator<Item = usize>) -> Result<Self> {
		let mut words = Vec::new();
		words.try_reserve_exact(parent_size.div_ceil(BITS_PER_WORD))?;
		words.resize(parent_size.div_ceil(BITS_PER_WORD), 0u64);
		for rank in ranks {
			if rank >= parent_size {
				return Err(GroupError::InvalidArgument(format!(
					"bitmap member {rank} outside parent of size {parent_size}"
				)));
			}
			words[rank / BITS_PER_WORD] |= 1u64 << (rank % BITS_PER_WORD);
		}
		Self::from_words(parent_size, words)
	}

	/// Adopts packed words; bits at or beyond `parent_size` must be clear.
	pub fn from_words(parent_size: usize, words: Vec<u64>) -> Result<Self> {
		let expected = parent_size.div_ceil(BITS_PER_WORD);
		if words.len() != expected {
			return Err(GroupError::InvalidArgument(format!(
				"bitmap over {parent_size} ranks needs {expected} words, got {}",
				words.len()
			)));
		}
		let tail = parent_size % BITS_PER_WORD;
		if tail != 0 && words[expected - 1] >> tail != 0 {
			return Err(GroupError::InvalidArgument(format!(
				"bitmap sets bits beyond parent size {parent_size}"
			)));
		}
		let count = words.iter().map(|w| w.count_ones() as usize).sum();
		Ok(Self {
			words: words.into_boxed_slice(),
			parent_size,
			count,
		})
	}

	pub fn words(&self) -> &[u64] {
		&self.words
	}

	pub fn parent_size(&self) -> usize {
		self.parent_size
	}

	pub fn contains(&self, parent_rank: usize) -> bool {
		parent_rank < self.parent_size
			&& self.words[parent_rank / BITS_PER_WORD] & (1u64 << (parent_rank % BITS_PER_WORD)) != 0
	}
}

impl SparseMembership for BitmapMembership {
	fn len(&self) -> usize {
		self.count
	}

	fn parent_rank(&self, rank: usize) -> Option<usize> {
		let mut remaining = rank;
		for (idx, &word) in self.words.iter().enumerate() {
			let ones = word.count_ones() as usize;
			if remaining >= ones {
				remaining -= ones;
				continue;
			}
			let mut word = word;
			for _ in 0..remaining {
				word &= word - 1;
			}
			return Some(idx * BITS_PER_WORD + word.trailing_zeros() as usize);
		}
		None
	}

	fn local_rank(&self, parent_rank: usize) -> Option<usize> {
		if !self.contains(parent_rank) {
			return None;
		}
		let word = parent_rank / BITS_PER_WORD;
		let below: usize = self.words[..word]
			.iter()
			.map(|w| w.count_ones() as usize)
			.sum();
		let mask = (1u64 << (parent_rank % BITS_PER_WORD)) - 1;
		Some(below + (self.words[word] & mask).count_ones() as usize)
	}

	fn max_parent_rank(&self) -> Option<usize> {
		self.words
			.iter()
			.enumerate()
			.rev()
			.find(|(_, w)| **w != 0)
			.map(|(idx, w)| idx * BITS_PER_WORD + (BITS_PER_WORD - 1 - w.leading_zeros() as usize))
	}
}
