//! Lock wants are reference counted per peer and seen by the others as a
//! lock held by the owner.
use proptest::prelude::*;

use troupe_peer::{LockError, LockStatus};
use troupe_shared::{ActorFields, OwnRequestReason, PersistedRecord, Transform};
use troupe_test::TestCluster;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn lock_holds_until_the_last_unwant(wants in 1u32..12) {
        let mut cluster = TestCluster::new(1);
        let name = cluster.world_mut(0).create_actor(Transform::default());
        let world = cluster.world_mut(0);

        for _ in 0..wants {
            world.want_lock(&name).unwrap();
        }
        for _ in 1..wants {
            world.unwant_lock(&name).unwrap();
        }
        prop_assert_eq!(world.lock_want_count(&name), 1);

        world.unwant_lock(&name).unwrap();
        prop_assert_eq!(world.lock_want_count(&name), 0);
    }
}

#[test]
fn unmatched_unwant_is_an_error() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    let world = cluster.world_mut(0);

    world.want_lock(&name).unwrap();
    world.unwant_lock(&name).unwrap();
    assert_eq!(
        world.unwant_lock(&name),
        Err(LockError::UnmatchedUnwant {
            actor: name.clone()
        })
    );
    assert_eq!(world.lock_want_count(&name), 0);

    assert!(matches!(
        world.want_lock("nobody"),
        Err(LockError::UnknownActor { .. })
    ));
}

#[test]
fn other_peers_see_the_lock() {
    init_logging();
    let mut cluster = TestCluster::new(3);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);
    assert_eq!(cluster.world(1).lock_status(&name), LockStatus::Unlocked);

    cluster.world_mut(0).want_lock(&name).unwrap();
    cluster.world_mut(0).want_lock(&name).unwrap();
    cluster.settle(2);
    let owner = cluster.peer_id(0);
    assert_eq!(cluster.world(1).lock_status(&name), LockStatus::LockedBy(owner));
    assert_eq!(cluster.world(2).lock_status(&name), LockStatus::LockedBy(owner));
    // the owner never sees its own lock
    assert_eq!(cluster.world(0).lock_status(&name), LockStatus::Unlocked);

    cluster.world_mut(0).unwant_lock(&name).unwrap();
    cluster.settle(2);
    assert!(cluster.world(1).is_locked_by_another(&name));

    cluster.world_mut(0).unwant_lock(&name).unwrap();
    cluster.settle(2);
    assert_eq!(cluster.world(1).lock_status(&name), LockStatus::Unlocked);
    assert_eq!(cluster.world(2).lock_status(&name), LockStatus::Unlocked);
}

#[test]
fn owner_refuses_transfers_while_wanted() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    // the request leaves before peer 1 learns about the lock
    cluster.world_mut(0).want_lock(&name).unwrap();
    cluster
        .world_mut(1)
        .request_ownership(&name, OwnRequestReason::Default);
    cluster.settle(3);
    assert!(cluster.world(0).is_locally_owned(&name));

    cluster.world_mut(0).unwant_lock(&name).unwrap();
    cluster.settle(2);
    cluster
        .world_mut(1)
        .request_ownership(&name, OwnRequestReason::Default);
    cluster.settle(3);
    assert!(cluster.world(1).is_locally_owned(&name));
}

#[test]
fn gained_actor_reports_an_existing_want() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    cluster.world_mut(1).want_lock(&name).unwrap();
    cluster
        .world_mut(1)
        .request_ownership(&name, OwnRequestReason::Default);
    cluster.settle(4);

    assert!(cluster.world(1).is_locally_owned(&name));
    assert_eq!(
        cluster.world(0).lock_status(&name),
        LockStatus::LockedBy(cluster.peer_id(1))
    );
}

#[test]
fn clones_inherit_the_lock_of_their_clone_parent() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let parent = cluster.world_mut(0).create_actor(Transform::default());
    cluster.world_mut(0).want_lock(&parent).unwrap();

    let mut fields = ActorFields::default();
    fields.clone_parent = parent.clone();
    let copy = cluster
        .world_mut(1)
        .create_actor_from_record(PersistedRecord::new("copy", fields.clone(), Vec::new(), String::new()))
        .unwrap();
    fields.was_cloned_by_script = true;
    let scripted = cluster
        .world_mut(1)
        .create_actor_from_record(PersistedRecord::new("scripted", fields, Vec::new(), String::new()))
        .unwrap();
    cluster.settle(2);

    assert_eq!(
        cluster.world(1).lock_status(&copy),
        LockStatus::LockedBy(cluster.peer_id(0))
    );
    assert!(!cluster.world_mut(1).destroy_actor(&copy));
    assert_eq!(cluster.world(1).lock_status(&scripted), LockStatus::Unlocked);
    assert!(cluster.world_mut(1).destroy_actor(&scripted));
}
