//! Process-group registry and membership engine.
//!
//! # Purpose
//!
//! Tracks groups of communicating participants, gives each a stable integer
//! [`Handle`], and encodes membership in one of four representations chosen per use
//! case. Participant records are shared by reference counting; only dense groups own
//! references.
//!
//! # Mental model
//!
//! * [`GroupRegistry`] is the process-scoped owner: handle table, the `NULL` and `EMPTY`
//!   singletons, the optional failed-participants alias.
//! * A [`Group`] is immutable once published. Derived groups are always new objects.
//! * Sparse groups (strided, bitmap, sporadic) hold an `Arc` to their parent and resolve
//!   ranks through it.
//! * [`GroupRegistry::flatten`] turns anything into a dense group for O(1) rank access.
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`GroupRegistry`] | Construction, lookup, init/finalize. |
//! | [`Group`] | Membership set plus self rank, flags, parent backlink. |
//! | [`Membership`] | Tagged representation payload. |
//! | [`HandleTable`] | Bounded integer-handle slot table. |
//! | [`FailedProcs`] | Hot-swapped alias for all failed participants. |
//!
//! # Invariants
//!
//! * Exactly one representation per group; [`GroupFlags`] mirrors it.
//! * Participant references attributable to groups equal the populated dense slots of
//!   live groups. Sparse groups never retain or release participants.
//! * `self_rank` is a valid rank or a sentinel.
//! * The singletons live from init to finalize, have no members, and keep their handles.

mod config;
mod error;
mod failed;
mod flags;
mod group;
mod handle;
mod membership;
mod registry;

pub use config::{GroupConfig, HANDLE_MAX, INITIAL_HANDLES_MAX};
pub use error::{GroupError, Result};
pub use failed::FailedProcs;
pub use flags::GroupFlags;
pub use group::{Group, PROC_NULL, SelfRank, UNDEFINED};
pub use handle::{Handle, HandleTable};
pub use membership::{
	BITS_PER_WORD, BitmapMembership, DenseMembership, DenseSlot, Membership, Representation,
	SparseMembership, SporadicMembership, StridedMembership,
};
pub use registry::GroupRegistry;
