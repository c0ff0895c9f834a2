//! Destroys requested during a tick are applied after the script has seen
//! that tick's messages and touches.
use troupe_peer::{TickResponse, WorldEvent};
use troupe_shared::{ActorFields, PersistedRecord, Transform};
use troupe_test::{TestCluster, TICK};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn touch_is_delivered_before_a_remote_destroy_request() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    assert!(cluster.world_mut(0).queue_touch_event(&name, None, true));
    assert!(cluster.world_mut(1).destroy_actor(&name));
    cluster.peer_mut(1).tick(TICK).unwrap();

    let owner = cluster.peer_mut(0);
    owner.world.queue_single_step();
    owner.tick(TICK).unwrap();

    let request = owner.script.last_request().unwrap();
    assert_eq!(request.actor_names, vec![name.clone()]);
    assert_eq!(request.queued_touch_events.len(), 1);
    assert_eq!(request.queued_touch_events[0].receiver, 0);
    assert!(request.queued_touch_events[0].is_enter);
    assert!(owner.world.actor(&name).is_none());
    assert!(owner
        .world
        .take_events()
        .contains(&WorldEvent::ActorDestroyed { name: name.clone() }));

    cluster.settle(2);
    assert!(cluster.world(1).actor(&name).is_none());
}

#[test]
fn replica_stays_visible_for_the_tick_its_destroy_arrives() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    assert!(cluster.world_mut(0).destroy_actor(&name));
    assert!(cluster.world(0).actor(&name).is_none());
    cluster.peer_mut(0).tick(TICK).unwrap();

    let replica = cluster.peer_mut(1);
    replica.world.queue_single_step();
    replica.tick(TICK).unwrap();

    assert_eq!(
        replica.script.last_request().unwrap().actor_names,
        vec![name.clone()]
    );
    assert!(replica.world.actor(&name).is_none());
}

#[test]
fn script_destroys_apply_after_the_response() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let doomed = cluster.world_mut(0).create_actor(Transform::default());
    let survivor = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    let owner = cluster.peer_mut(0);
    owner.script.push_response(TickResponse {
        destroy_requests: vec![0],
        ..TickResponse::default()
    });
    owner.world.queue_single_step();
    owner.tick(TICK).unwrap();

    assert!(owner.world.actor(&doomed).is_none());
    assert!(owner.world.actor(&survivor).is_some());
    cluster.settle(2);
    assert!(cluster.world(1).actor(&doomed).is_none());
    assert!(cluster.world(1).actor(&survivor).is_some());
}

#[test]
fn destroyed_names_are_not_reused() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let record = PersistedRecord::new("crate", ActorFields::default(), Vec::new(), String::new());
    let name = cluster
        .world_mut(0)
        .create_actor_from_record(record.clone())
        .unwrap();
    assert!(cluster.world_mut(0).destroy_actor(&name));

    assert!(cluster.world_mut(0).create_actor_from_record(record).is_err());
    assert!(!cluster.world_mut(0).destroy_actor(&name));
}

#[test]
fn actors_locked_by_another_cannot_be_destroyed() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.world_mut(0).want_lock(&name).unwrap();
    cluster.settle(2);

    assert!(!cluster.world_mut(1).destroy_actor(&name));
    cluster.settle(2);
    assert!(cluster.world(0).actor(&name).is_some());
}
