//! Process-scoped group registry.
//!
//! # Purpose
//!
//! Owns the handle table, the `NULL` and `EMPTY` singletons and (when configured for
//! fault tolerance) the failed-participants alias. Every group is built here.
//!
//! # Lifecycle
//!
//! 1. [`GroupRegistry::init`] builds the table, constructs `NULL` (handle 0) and `EMPTY`
//!    (handle 1) directly, and appends [`GroupRegistry::finalize`] to the instance's
//!    shutdown sequence.
//! 2. Steady state: `allocate_*` and [`GroupRegistry::flatten`] publish new groups,
//!    [`GroupRegistry::lookup`] maps handles back to groups.
//! 3. [`GroupRegistry::finalize`] drops the singletons, clears the failed alias, and
//!    closes the table. Later allocations fail with [`GroupError::Finalized`].
//!
//! # Concurrency
//!
//! The handle table is behind a mutex that is never held while a group drops, since a
//! dropping group takes the same lock to clear its slot. The table stores `Weak`
//! references: a group whose last `Arc` is gone can no longer be looked up, even if its
//! destructor has not reached the table yet.

use std::sync::{Arc, Weak};

use cohort_instance::Instance;
use cohort_proc::{ProcName, ProcRef, ProcRegistry};
use parking_lot::Mutex;

use crate::group::GroupParts;
use crate::{
	BitmapMembership, DenseMembership, FailedProcs, Group, GroupConfig, GroupError, Handle,
	HandleTable, Membership, Result, SelfRank, SporadicMembership, StridedMembership,
};

/// State shared between the registry and every group it built.
pub(crate) struct Shared {
	pub(crate) table: Mutex<HandleTable<Weak<Group>>>,
	pub(crate) procs: Arc<dyn ProcRegistry>,
}

struct Intrinsics {
	null: Arc<Group>,
	empty: Arc<Group>,
}

/// Registry and lifecycle manager for groups.
pub struct GroupRegistry {
	shared: Arc<Shared>,
	config: GroupConfig,
	intrinsics: Mutex<Option<Intrinsics>>,
	failed: Option<FailedProcs>,
}

impl GroupRegistry {
	/// Initializes the group subsystem and hooks its finalize into `instance`.
	pub fn init(
		config: GroupConfig,
		procs: Arc<dyn ProcRegistry>,
		instance: &Instance,
	) -> Result<Arc<Self>> {
		let registry = Arc::new(Self::new(config, procs)?);
		let hook = registry.clone();
		instance.append_finalize("group", move || {
			hook.finalize();
			Ok(())
		})?;
		Ok(registry)
	}

	/// Builds a registry without attaching it to an instance.
	pub fn new(config: GroupConfig, procs: Arc<dyn ProcRegistry>) -> Result<Self> {
		config.validate()?;
		let shared = Arc::new(Shared {
			table: Mutex::new(HandleTable::new(config.initial_handles, config.max_handles)),
			procs,
		});

		let null = construct(&shared, intrinsic_parts(SelfRank::ProcNull))?;
		let empty = construct(&shared, intrinsic_parts(SelfRank::Undefined))?;
		let failed = if config.fault_tolerant {
			let initial = construct(
				&shared,
				GroupParts {
					membership: Membership::Dense(DenseMembership::default()),
					self_rank: SelfRank::Undefined,
					parent: None,
					intrinsic: false,
				},
			)?;
			Some(FailedProcs::new(initial))
		} else {
			None
		};

		tracing::debug!(
			initial_handles = config.initial_handles,
			max_handles = config.max_handles,
			fault_tolerant = config.fault_tolerant,
			"group subsystem initialized"
		);
		Ok(Self {
			shared,
			config,
			intrinsics: Mutex::new(Some(Intrinsics { null, empty })),
			failed,
		})
	}

	pub fn config(&self) -> &GroupConfig {
		&self.config
	}

	pub(crate) fn shared(&self) -> &Arc<Shared> {
		&self.shared
	}

	pub fn procs(&self) -> &Arc<dyn ProcRegistry> {
		&self.shared.procs
	}

	/// The `EMPTY` singleton.
	pub fn empty(&self) -> Result<Arc<Group>> {
		self.intrinsics
			.lock()
			.as_ref()
			.map(|i| i.empty.clone())
			.ok_or(GroupError::Finalized)
	}

	/// The `NULL` singleton.
	pub fn null(&self) -> Result<Arc<Group>> {
		self.intrinsics
			.lock()
			.as_ref()
			.map(|i| i.null.clone())
			.ok_or(GroupError::Finalized)
	}

	/// Shared failed-participants alias, present in fault-tolerant configurations.
	pub fn failed_procs(&self) -> Option<&FailedProcs> {
		self.failed.as_ref()
	}

	/// Group registered under `handle`, if it is still alive.
	pub fn lookup(&self, handle: Handle) -> Option<Arc<Group>> {
		self.shared.table.lock().get(handle).and_then(Weak::upgrade)
	}

	/// [`GroupRegistry::lookup`] for a raw binding-layer handle.
	pub fn lookup_raw(&self, raw: i32) -> Option<Arc<Group>> {
		Handle::from_raw(raw).and_then(|handle| self.lookup(handle))
	}

	/// Number of occupied handle slots, singletons included.
	pub fn live_handles(&self) -> usize {
		self.shared.table.lock().len()
	}

	/// Dense group over already-resolved participants.
	///
	/// The self rank is the position of the local participant, if present.
	pub fn allocate_dense(&self, procs: impl IntoIterator<Item = ProcRef>) -> Result<Arc<Group>> {
		self.publish_dense(DenseMembership::from_procs(procs)?)
	}

	/// Dense group over participant names. Records the participant registry already
	/// holds are retained now; the rest are populated on first [`Group::peer`].
	pub fn allocate_dense_from_names(
		&self,
		names: impl IntoIterator<Item = ProcName>,
	) -> Result<Arc<Group>> {
		self.publish_dense(DenseMembership::from_names(names, &*self.shared.procs)?)
	}

	/// Strided group over `parent`'s ranks.
	pub fn allocate_strided(
		&self,
		parent: &Arc<Group>,
		strided: StridedMembership,
	) -> Result<Arc<Group>> {
		self.publish_sparse(parent, Membership::Strided(strided))
	}

	/// Bitmap group over `parent`'s ranks. The bitmap must span exactly the parent.
	pub fn allocate_bitmap(
		&self,
		parent: &Arc<Group>,
		bitmap: BitmapMembership,
	) -> Result<Arc<Group>> {
		if bitmap.parent_size() != parent.member_count() {
			return Err(GroupError::InvalidArgument(format!(
				"bitmap spans {} ranks but parent {} has {}",
				bitmap.parent_size(),
				parent.handle(),
				parent.member_count()
			)));
		}
		self.publish_sparse(parent, Membership::Bitmap(bitmap))
	}

	/// Sporadic group over `parent`'s ranks.
	pub fn allocate_sporadic(
		&self,
		parent: &Arc<Group>,
		sporadic: SporadicMembership,
	) -> Result<Arc<Group>> {
		self.publish_sparse(parent, Membership::Sporadic(sporadic))
	}

	/// Materializes the first `min(max_procs, member_count)` members of `group` into a
	/// new dense group.
	///
	/// Dense sources are copied slot by slot; sparse sources are resolved rank by rank.
	/// The self rank is kept when it falls below `max_procs`, otherwise it becomes
	/// [`SelfRank::Undefined`].
	pub fn flatten(&self, group: &Group, max_procs: usize) -> Result<Arc<Group>> {
		self.check_owned(group)?;
		let count = group.member_count().min(max_procs);
		let dense = match group.membership() {
			Membership::Dense(dense) => dense.truncated(count)?,
			_ => {
				let mut procs = Vec::new();
				procs.try_reserve_exact(count)?;
				for rank in 0..count {
					procs.push(group.peer(rank)?);
				}
				DenseMembership::from_procs(procs)?
			}
		};
		construct(
			&self.shared,
			GroupParts {
				membership: Membership::Dense(dense),
				self_rank: group.self_rank().capped(max_procs),
				parent: None,
				intrinsic: false,
			},
		)
	}

	/// Tears the subsystem down.
	///
	/// Calling this twice is a caller error; the second call only logs a warning.
	pub fn finalize(&self) {
		let Some(intrinsics) = self.intrinsics.lock().take() else {
			tracing::warn!("group subsystem finalized twice");
			return;
		};
		drop(intrinsics);

		if let Some(failed) = &self.failed {
			failed.clear();
		}

		let remaining = self.shared.table.lock().close();
		let leaked = remaining.iter().filter(|g| g.strong_count() > 0).count();
		drop(remaining);
		tracing::debug!(leaked, "group subsystem finalized");
	}

	fn check_owned(&self, group: &Group) -> Result<()> {
		check_owned(&self.shared, group)
	}

	fn publish_dense(&self, dense: DenseMembership) -> Result<Arc<Group>> {
		let local = self.shared.procs.local_name();
		let self_rank = SelfRank::from(dense.position(&local));
		construct(
			&self.shared,
			GroupParts {
				membership: Membership::Dense(dense),
				self_rank,
				parent: None,
				intrinsic: false,
			},
		)
	}

	fn publish_sparse(&self, parent: &Arc<Group>, membership: Membership) -> Result<Arc<Group>> {
		self.check_owned(parent)?;
		if let Some(max) = membership.max_parent_rank()
			&& max >= parent.member_count()
		{
			return Err(GroupError::InvalidArgument(format!(
				"{:?} member {max} outside parent {} of size {}",
				membership.representation(),
				parent.handle(),
				parent.member_count()
			)));
		}

		let self_rank = parent
			.self_rank()
			.rank()
			.and_then(|parent_rank| membership.local_rank(parent_rank));
		construct(
			&self.shared,
			GroupParts {
				membership,
				self_rank: SelfRank::from(self_rank),
				parent: Some(parent.clone()),
				intrinsic: false,
			},
		)
	}
}

/// Rejects groups built by a different registry.
pub(crate) fn check_owned(shared: &Arc<Shared>, group: &Group) -> Result<()> {
	if !Arc::ptr_eq(group.shared(), shared) {
		return Err(GroupError::InvalidArgument(format!(
			"group {} belongs to another registry",
			group.handle()
		)));
	}
	Ok(())
}

fn intrinsic_parts(self_rank: SelfRank) -> GroupParts {
	GroupParts {
		membership: Membership::Dense(DenseMembership::default()),
		self_rank,
		parent: None,
		intrinsic: true,
	}
}

/// Registers `parts` under a fresh handle.
///
/// `parts` outlives the table guard on every exit path, so a parent released on failure
/// can take the lock to clear its own slot.
fn construct(shared: &Arc<Shared>, parts: GroupParts) -> Result<Arc<Group>> {
	let mut table = shared.table.lock();
	let handle = table.allocate(Weak::new())?;
	let group = Arc::new(Group::new(handle, parts, shared.clone()));
	if let Some(slot) = table.get_mut(handle) {
		*slot = Arc::downgrade(&group);
	}
	drop(table);

	tracing::trace!(
		handle = %handle,
		representation = ?group.representation(),
		members = group.member_count(),
		self_rank = ?group.self_rank(),
		"group constructed"
	);
	Ok(group)
}

#[cfg(test)]
mod tests;
