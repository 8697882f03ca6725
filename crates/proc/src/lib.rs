//! Participant identities and the registry that owns them.
//!
//! A participant ([`Proc`]) is one addressable process in the universe. Records are
//! shared through [`ProcRef`] (an `Arc<Proc>`): every holder retains by cloning and
//! releases by dropping, so the count is atomic and visible through
//! [`std::sync::Arc::strong_count`].
//!
//! Group code never builds a [`Proc`] itself. It asks a [`ProcRegistry`] for records by
//! [`ProcName`], either requiring the record to exist already
//! ([`ProcRegistry::lookup_existing`]) or allowing lazy population
//! ([`ProcRegistry::lookup_or_create`]).

mod error;
mod name;
mod proc;
mod table;

pub use error::{ProcError, Result};
pub use name::{JobId, ProcName};
pub use proc::{Proc, ProcRef};
pub use table::{ProcRegistry, ProcTable};
