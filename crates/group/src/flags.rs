bitflags::bitflags! {
	/// Group flag bits.
	///
	/// Exactly one representation bit is set and it always mirrors the membership tag.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct GroupFlags: u32 {
		/// Predefined singleton, not returned to the handle pool.
		const INTRINSIC = 0x01;
		const DENSE = 0x02;
		const SPORADIC = 0x04;
		const STRIDED = 0x08;
		const BITMAP = 0x10;

		const REPRESENTATION = Self::DENSE.bits()
			| Self::SPORADIC.bits()
			| Self::STRIDED.bits()
			| Self::BITMAP.bits();
	}
}
