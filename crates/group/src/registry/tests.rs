use std::sync::Arc;

use cohort_instance::Instance;
use cohort_proc::{JobId, ProcName, ProcRef, ProcTable};
use pretty_assertions::assert_eq;

use super::*;
use crate::{GroupFlags, Representation};

fn setup(me: u32, size: u32, config: GroupConfig) -> (GroupRegistry, Vec<ProcRef>) {
	let table = Arc::new(ProcTable::new(ProcName::new(1, me), size));
	let procs = table.populate_job(JobId(1)).unwrap();
	(GroupRegistry::new(config, table).unwrap(), procs)
}

fn names(group: &Group) -> Vec<ProcName> {
	(0..group.member_count())
		.map(|r| group.proc_name(r).unwrap())
		.collect()
}

#[test]
fn singletons_exist_after_init() {
	let (registry, _) = setup(0, 4, GroupConfig::default());
	let null = registry.null().unwrap();
	let empty = registry.empty().unwrap();

	assert_eq!(null.handle().as_raw(), 0);
	assert_eq!(empty.handle().as_raw(), 1);
	for group in [&null, &empty] {
		assert_eq!(group.member_count(), 0);
		assert_eq!(group.flags(), GroupFlags::DENSE | GroupFlags::INTRINSIC);
	}
	assert_eq!(null.self_rank(), SelfRank::ProcNull);
	assert_eq!(empty.self_rank(), SelfRank::Undefined);
	assert!(Arc::ptr_eq(&registry.lookup_raw(1).unwrap(), &empty));
	assert!(registry.failed_procs().is_none());
}

#[test]
fn singletons_survive_until_finalize() {
	let (registry, procs) = setup(0, 4, GroupConfig::default());
	for _ in 0..10 {
		let g = registry.allocate_dense(procs.iter().cloned()).unwrap();
		drop(g);
	}
	assert_eq!(registry.empty().unwrap().handle().as_raw(), 1);
	assert_eq!(registry.live_handles(), 2);

	registry.finalize();
	assert!(matches!(registry.empty(), Err(GroupError::Finalized)));
	assert!(matches!(registry.null(), Err(GroupError::Finalized)));
	assert_eq!(registry.live_handles(), 0);
}

#[test]
fn lookup_of_unknown_handles_is_none() {
	let (registry, _) = setup(0, 2, GroupConfig::default());
	assert!(registry.lookup_raw(-1).is_none());
	assert!(registry.lookup_raw(i32::MAX).is_none());
	assert!(registry.lookup_raw(2).is_none());
}

#[test]
fn end_to_end_dense_then_flatten() {
	let (registry, procs) = setup(2, 4, GroupConfig::default());
	let group = registry.allocate_dense(procs.iter().cloned()).unwrap();
	assert_eq!(group.self_rank(), SelfRank::Member(2));
	assert!(Arc::ptr_eq(&group.peer(1).unwrap(), &procs[1]));

	let flat = registry.flatten(&group, 2).unwrap();
	assert_eq!(flat.member_count(), 2);
	assert!(Arc::ptr_eq(&flat.peer(0).unwrap(), &procs[0]));
	assert!(Arc::ptr_eq(&flat.peer(1).unwrap(), &procs[1]));
	assert_eq!(flat.self_rank(), SelfRank::Undefined);
	assert_ne!(flat.handle(), group.handle());
}

#[test]
fn flatten_sparse_matches_source() {
	let (registry, procs) = setup(5, 8, GroupConfig::default());
	let world = registry.allocate_dense(procs.iter().cloned()).unwrap();
	let odds = registry
		.allocate_strided(&world, StridedMembership::new(1, 2, 4).unwrap())
		.unwrap();
	assert_eq!(odds.self_rank(), SelfRank::Member(2));

	let flat = registry.flatten(&odds, usize::MAX).unwrap();
	assert_eq!(flat.representation(), Representation::Dense);
	assert!(flat.parent().is_none());
	assert_eq!(flat.self_rank(), odds.self_rank());
	assert_eq!(names(&flat), names(&odds));
	for rank in 0..odds.member_count() {
		assert!(Arc::ptr_eq(&flat.peer(rank).unwrap(), &odds.peer(rank).unwrap()));
	}
}

#[test]
fn flatten_cap_truncates_and_clears_self_rank() {
	let (registry, procs) = setup(5, 8, GroupConfig::default());
	let world = registry.allocate_dense(procs.iter().cloned()).unwrap();
	let bitmap = registry
		.allocate_bitmap(&world, BitmapMembership::from_ranks(8, [0, 2, 5, 6]).unwrap())
		.unwrap();
	assert_eq!(bitmap.self_rank(), SelfRank::Member(2));

	let flat = registry.flatten(&bitmap, 2).unwrap();
	assert_eq!(flat.member_count(), 2);
	assert_eq!(flat.self_rank(), SelfRank::Undefined);
	assert_eq!(names(&flat), vec![ProcName::new(1, 0), ProcName::new(1, 2)]);

	let flat = registry.flatten(&bitmap, 3).unwrap();
	assert_eq!(flat.self_rank(), SelfRank::Member(2));
}

#[test]
fn flatten_retains_and_releases() {
	let (registry, procs) = setup(0, 4, GroupConfig::default());
	let world = registry.allocate_dense(procs.iter().cloned()).unwrap();
	let sporadic = registry
		.allocate_sporadic(&world, SporadicMembership::new(vec![1, 3]).unwrap())
		.unwrap();
	let before: Vec<_> = procs.iter().map(Arc::strong_count).collect();

	let flat = registry.flatten(&sporadic, 10).unwrap();
	assert_eq!(Arc::strong_count(&procs[1]), before[1] + 1);
	assert_eq!(Arc::strong_count(&procs[3]), before[3] + 1);
	assert_eq!(Arc::strong_count(&procs[0]), before[0]);

	drop(flat);
	let after: Vec<_> = procs.iter().map(Arc::strong_count).collect();
	assert_eq!(after, before);
}

#[test]
fn flatten_of_empty_group() {
	let (registry, _) = setup(0, 1, GroupConfig::default());
	let empty = registry.empty().unwrap();
	let flat = registry.flatten(&empty, 5).unwrap();
	assert_eq!(flat.member_count(), 0);
	assert!(!flat.is_intrinsic());
	assert_eq!(flat.self_rank(), SelfRank::Undefined);
}

#[test]
fn exhausted_table_unwinds_construction() {
	let config = GroupConfig {
		initial_handles: 2,
		max_handles: 3,
		fault_tolerant: false,
	};
	let (registry, procs) = setup(0, 4, config);
	let before: Vec<_> = procs.iter().map(Arc::strong_count).collect();

	let world = registry.allocate_dense(procs.iter().cloned()).unwrap();
	let err = registry.allocate_dense(procs.iter().cloned()).unwrap_err();
	assert!(matches!(err, GroupError::HandleExhausted { limit: 3 }));

	let world_refs = Arc::strong_count(&world);
	let err = registry
		.allocate_strided(&world, StridedMembership::new(0, 1, 2).unwrap())
		.unwrap_err();
	assert!(matches!(err, GroupError::HandleExhausted { .. }));
	assert_eq!(Arc::strong_count(&world), world_refs);

	drop(world);
	let after: Vec<_> = procs.iter().map(Arc::strong_count).collect();
	assert_eq!(after, before);
	assert!(registry.allocate_dense(procs.iter().cloned()).is_ok());
}

#[test]
fn sparse_members_must_fit_parent() {
	let (registry, procs) = setup(0, 4, GroupConfig::default());
	let world = registry.allocate_dense(procs.iter().cloned()).unwrap();

	assert!(matches!(
		registry.allocate_strided(&world, StridedMembership::new(1, 2, 2).unwrap()),
		Ok(_)
	));
	assert!(matches!(
		registry.allocate_strided(&world, StridedMembership::new(1, 2, 3).unwrap()),
		Err(GroupError::InvalidArgument(_))
	));
	assert!(matches!(
		registry.allocate_sporadic(&world, SporadicMembership::new(vec![4]).unwrap()),
		Err(GroupError::InvalidArgument(_))
	));
	assert!(matches!(
		registry.allocate_bitmap(&world, BitmapMembership::from_ranks(5, [0]).unwrap()),
		Err(GroupError::InvalidArgument(_))
	));
}

#[test]
fn parent_from_another_registry_is_rejected() {
	let (a, procs) = setup(0, 2, GroupConfig::default());
	let (b, _) = setup(0, 2, GroupConfig::default());
	let world = a.allocate_dense(procs.iter().cloned()).unwrap();
	assert!(matches!(
		b.allocate_sporadic(&world, SporadicMembership::new(vec![0]).unwrap()),
		Err(GroupError::InvalidArgument(_))
	));
}

#[test]
fn allocation_after_finalize_fails() {
	let (registry, procs) = setup(0, 2, GroupConfig::default());
	let survivor = registry.allocate_dense(procs.iter().cloned()).unwrap();
	registry.finalize();

	assert!(matches!(
		registry.allocate_dense(procs.iter().cloned()),
		Err(GroupError::Finalized)
	));
	assert!(registry.lookup(survivor.handle()).is_none());
	assert_eq!(survivor.member_count(), 2);
	drop(survivor);

	// A second finalize is tolerated.
	registry.finalize();
}

#[test]
fn init_hooks_finalize_into_instance() {
	let table = Arc::new(ProcTable::new(ProcName::new(1, 0), 1));
	let instance = Instance::new();
	let registry = GroupRegistry::init(GroupConfig::default(), table, &instance).unwrap();
	assert_eq!(instance.pending(), 1);
	assert!(registry.empty().is_ok());

	instance.finalize().unwrap();
	assert!(matches!(registry.empty(), Err(GroupError::Finalized)));
}

#[test]
fn init_on_finalized_instance_fails() {
	let table = Arc::new(ProcTable::new(ProcName::new(1, 0), 1));
	let instance = Instance::new();
	instance.finalize().unwrap();
	assert!(matches!(
		GroupRegistry::init(GroupConfig::default(), table, &instance),
		Err(GroupError::Instance(_))
	));
}

#[test]
fn fault_tolerant_registry_tracks_failures() {
	let config = GroupConfig {
		fault_tolerant: true,
		..GroupConfig::default()
	};
	let (registry, procs) = setup(0, 4, config);
	let failed = registry.failed_procs().unwrap();

	let initial = failed.snapshot().unwrap();
	assert_eq!(initial.member_count(), 0);

	let first = failed.record(&registry, [procs[3].clone()]).unwrap();
	assert_eq!(names(&first), vec![ProcName::new(1, 3)]);

	let second = failed
		.record(&registry, [procs[1].clone(), procs[3].clone()])
		.unwrap();
	assert_eq!(names(&second), vec![ProcName::new(1, 3), ProcName::new(1, 1)]);

	let unchanged = failed.record(&registry, [procs[1].clone()]).unwrap();
	assert!(Arc::ptr_eq(&unchanged, &second));

	// The old snapshot stays usable after the swap.
	assert_eq!(initial.member_count(), 0);
	assert_eq!(first.member_count(), 1);

	registry.finalize();
	assert!(failed.snapshot().is_none());
	assert!(matches!(
		failed.record(&registry, [procs[0].clone()]),
		Err(GroupError::Finalized)
	));
}

#[test]
fn flatten_rejects_group_from_another_registry() {
	let (a, procs) = setup(0, 2, GroupConfig::default());
	let (b, _) = setup(0, 2, GroupConfig::default());
	let world = a.allocate_dense(procs.iter().cloned()).unwrap();
	let before = b.live_handles();
	assert!(matches!(
		b.flatten(&world, usize::MAX),
		Err(GroupError::InvalidArgument(_))
	));
	assert_eq!(b.live_handles(), before);
}

#[test]
fn failed_alias_replace_hands_back_previous() {
	let config = GroupConfig {
		fault_tolerant: true,
		..GroupConfig::default()
	};
	let (registry, procs) = setup(0, 4, config.clone());
	let failed = registry.failed_procs().unwrap();
	let baseline: Vec<usize> = procs.iter().map(Arc::strong_count).collect();

	let first = registry.allocate_dense([procs[2].clone()]).unwrap();
	let initial = failed.replace(first.clone()).unwrap();
	assert_eq!(initial.member_count(), 0);
	assert!(Arc::ptr_eq(&failed.snapshot().unwrap(), &first));

	let second = registry
		.allocate_dense([procs[2].clone(), procs[0].clone()])
		.unwrap();
	let previous = failed.replace(second).unwrap();
	assert!(Arc::ptr_eq(&previous, &first));
	let handle = first.handle();
	drop((first, previous));
	assert!(registry.lookup(handle).is_none());
	assert_eq!(Arc::strong_count(&procs[2]), baseline[2] + 1);

	let (other, other_procs) = setup(0, 4, config);
	let foreign = other.allocate_dense(other_procs.iter().cloned()).unwrap();
	assert!(matches!(
		failed.replace(foreign),
		Err(GroupError::InvalidArgument(_))
	));
	assert_eq!(failed.snapshot().unwrap().member_count(), 2);

	let spare = registry.allocate_dense([procs[1].clone()]).unwrap();
	registry.finalize();
	assert!(failed.snapshot().is_none());
	assert!(matches!(failed.replace(spare), Err(GroupError::Finalized)));
	assert!(failed.snapshot().is_none());
	assert_eq!(
		procs.iter().map(Arc::strong_count).collect::<Vec<_>>(),
		baseline
	);
}
