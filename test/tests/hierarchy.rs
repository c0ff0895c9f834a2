//! Transform parenting refuses self-parenting and cycles and leaves the
//! hierarchy as it was.
use proptest::prelude::*;

use troupe_peer::{EngineConfig, World, WorldEvent};
use troupe_shared::{field, FieldHook, Transform, Value};
use troupe_test::TestCluster;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parent_of(world: &World, name: &str) -> String {
    world.actor(name).unwrap().fields().transform_parent.clone()
}

/// Builds `count` actors, each parented under the previous one
fn chain(cluster: &mut TestCluster, count: usize) -> Vec<String> {
    let world = cluster.world_mut(0);
    let names: Vec<String> = (0..count)
        .map(|_| world.create_actor(Transform::default()))
        .collect();
    for pair in names.windows(2) {
        assert!(world.set_transform_parent(&pair[1], &pair[0]));
    }
    names
}

#[test]
fn self_parenting_is_rejected() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let name = cluster.world_mut(0).create_actor(Transform::default());

    assert!(!cluster.world_mut(0).set_transform_parent(&name, &name));
    assert_eq!(parent_of(cluster.world(0), &name), "");
}

#[test]
fn reparenting_under_a_descendant_is_rejected() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let names = chain(&mut cluster, 3);
    let world = cluster.world_mut(0);
    world.take_events();

    assert!(!world.set_transform_parent(&names[0], &names[2]));
    assert_eq!(parent_of(world, &names[0]), "");
    assert_eq!(parent_of(world, &names[2]), names[1]);
    assert!(world.take_events().is_empty());
}

#[test]
fn detaching_and_reattaching_emit_reparent_events() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let names = chain(&mut cluster, 2);
    let world = cluster.world_mut(0);
    world.take_events();

    assert!(world.set_transform_parent(&names[1], ""));
    assert_eq!(parent_of(world, &names[1]), "");
    assert!(world.set_transform_parent(&names[0], &names[1]));
    assert_eq!(
        world.take_events(),
        vec![
            WorldEvent::DerivedStateChanged {
                name: names[1].clone(),
                hook: FieldHook::Reparent,
            },
            WorldEvent::DerivedStateChanged {
                name: names[0].clone(),
                hook: FieldHook::Reparent,
            },
        ]
    );
}

#[test]
fn spawn_parents_are_checked_too() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let world = cluster.world_mut(0);
    let parent = world.create_actor(Transform::default());
    let child = world.create_actor(Transform::default());

    world
        .set_field(&child, field::SPAWN_TRANSFORM_PARENT, Value::Str(parent.clone()))
        .unwrap();
    assert!(world
        .set_field(&parent, field::SPAWN_TRANSFORM_PARENT, Value::Str(child.clone()))
        .is_err());
    assert_eq!(world.actor(&parent).unwrap().fields().spawn_transform_parent, "");
}

#[test]
fn chains_deeper_than_the_bound_are_rejected() {
    init_logging();
    let mut config = EngineConfig::default();
    config.max_hierarchy_depth = 4;
    let mut cluster = TestCluster::with_config(1, config);
    let world = cluster.world_mut(0);
    let names: Vec<String> = (0..6)
        .map(|_| world.create_actor(Transform::default()))
        .collect();

    let mut accepted = 1;
    for pair in names.windows(2) {
        if !world.set_transform_parent(&pair[1], &pair[0]) {
            break;
        }
        accepted += 1;
    }
    assert!(accepted < names.len());
    assert_eq!(parent_of(world, names.last().unwrap()), "");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn no_reparent_creates_a_cycle(length in 2usize..10, pick in any::<prop::sample::Index>()) {
        let mut cluster = TestCluster::new(1);
        let names = chain(&mut cluster, length);
        let descendant = &names[1 + pick.index(length - 1)];
        let world = cluster.world_mut(0);

        prop_assert!(!world.set_transform_parent(&names[0], descendant));
        prop_assert_eq!(parent_of(world, &names[0]), "");
        for pair in names.windows(2) {
            prop_assert_eq!(parent_of(world, &pair[1]), pair[0].clone());
        }
    }
}
