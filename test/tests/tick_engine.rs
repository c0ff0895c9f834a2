//! The script tick: one boundary call per step, writes staged until the call
//! succeeds, and the response applied afterwards.
use std::{cell::RefCell, rc::Rc};

use troupe_peer::{
    EngineError, ScriptError, SlotTorque, SlotVelocity, SpawnRequest, TickOutcome, TickPhase,
    TickRequest, TickResponse, WorldEvent,
};
use troupe_shared::{field, ActorMessage, FieldError, FieldHook, Quat, SlotIndex, Transform, Value, Vec3};
use troupe_test::{ScriptedBoundary, TestCluster, TICK};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn snapshot_names(request: &TickRequest) -> Vec<&str> {
    request
        .snapshot
        .iter()
        .map(|state| state.name.as_str())
        .collect()
}

#[test]
fn script_failure_halts_without_applying_anything() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.tick_all();

    let peer = cluster.peer_mut(0);
    peer.script = ScriptedBoundary::with_handler(|_, fields| {
        fields.set_float(0, field::MASS, 9.0);
        Err(ScriptError::RuntimeFailed {
            reason: "brain threw".to_string(),
        })
    });
    peer.world.queue_single_step();

    match peer.tick(TICK) {
        Err(EngineError::ScriptBoundary { tick, source }) => {
            assert_eq!(tick, 0);
            assert_eq!(
                source,
                ScriptError::RuntimeFailed {
                    reason: "brain threw".to_string()
                }
            );
        }
        other => panic!("expected a script failure, got {:?}", other),
    }
    assert!(peer.world.is_halted());
    assert_eq!(peer.world.phase(), TickPhase::Idle);
    assert_eq!(peer.world.tick_count(), 0);
    assert_eq!(peer.world.actor(&name).unwrap().fields().mass, 1.0);

    peer.world.queue_single_step();
    assert_eq!(peer.tick(TICK), Err(EngineError::Halted));
    assert_eq!(peer.script.requests().len(), 1);
}

#[test]
fn stopped_world_steps_only_when_asked() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let peer = cluster.peer_mut(0);

    assert_eq!(peer.tick(TICK), Ok(TickOutcome::Paused));
    peer.world.queue_single_step();
    assert!(peer.world.is_single_step_queued());
    assert_eq!(peer.tick(TICK), Ok(TickOutcome::Stepped));
    assert!(!peer.world.is_single_step_queued());
    assert_eq!(peer.tick(TICK), Ok(TickOutcome::Paused));

    assert_eq!(peer.world.tick_count(), 1);
    assert_eq!(peer.world.clock(), TICK * 3);
}

#[test]
fn running_world_steps_every_tick() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    cluster.world_mut(0).set_running(true);
    cluster.settle(3);

    let peer = cluster.peer_mut(0);
    assert_eq!(peer.world.tick_count(), 3);
    let ticks: Vec<u64> = peer.script.requests().iter().map(|request| request.tick).collect();
    assert_eq!(ticks, vec![0, 1, 2]);
    assert!(peer
        .script
        .requests()
        .iter()
        .all(|request| (request.delta_seconds - 0.05).abs() < 1e-6));
}

#[test]
fn codec_reports_bad_accesses() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    cluster.world_mut(0).create_actor(Transform::default());

    let errors = Rc::new(RefCell::new(Vec::new()));
    let seen = errors.clone();
    let peer = cluster.peer_mut(0);
    peer.script.set_handler(move |_, fields| {
        let mut seen = seen.borrow_mut();
        let own_name = fields.actor_name(0).unwrap_or_default().to_string();
        seen.extend(fields.try_set_float(5, field::MASS, 2.0).err());
        seen.extend(fields.try_set_float(0, field::DESCRIPTION, 2.0).err());
        seen.extend(fields.try_set_string(0, field::TRANSFORM_PARENT, &own_name).err());
        seen.extend(fields.try_get_bool(0, 999).err());
        assert_eq!(fields.get_float(5, field::MASS), 0.0);
        assert_eq!(fields.get_quat(7, field::ROTATION), Quat::IDENTITY);
        assert_eq!(fields.staged_len(), 0);
        Ok(TickResponse::default())
    });
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    let errors = errors.borrow();
    assert_eq!(errors.len(), 4);
    assert_eq!(
        errors[0],
        FieldError::SlotOutOfRange {
            slot: 5,
            slot_count: 1
        }
    );
    assert!(matches!(errors[1], FieldError::KindMismatch { .. }));
    assert!(matches!(errors[2], FieldError::ReparentRejected { .. }));
    assert_eq!(errors[3], FieldError::UnknownField { field_id: 999 });
}

#[test]
fn staged_writes_are_read_back_and_applied_after_the_call() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    let peer = cluster.peer_mut(0);
    peer.script.set_handler(|_, fields| {
        assert_eq!(fields.get_float(0, field::MASS), 1.0);
        fields.set_float(0, field::MASS, 3.0);
        fields.set_float(0, field::MASS, 4.0);
        assert_eq!(fields.get_float(0, field::MASS), 4.0);
        fields.set_string(0, field::DESCRIPTION, "heavy");
        assert_eq!(fields.get_string(0, field::DESCRIPTION), "heavy");
        assert_eq!(fields.get_field(0, field::MASS), Value::Float(4.0));
        // writing the current value stages nothing
        fields.set_bool(0, field::IS_SOLID, true);
        assert_eq!(fields.staged_len(), 3);
        Ok(TickResponse::default())
    });
    peer.world.take_events();
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    let fields = peer.world.actor(&name).unwrap().fields();
    assert_eq!(fields.mass, 4.0);
    assert_eq!(fields.description, "heavy");
    assert!(peer.world.take_events().contains(&WorldEvent::DerivedStateChanged {
        name: name.clone(),
        hook: FieldHook::Physics,
    }));

    cluster.settle(2);
    assert_eq!(cluster.world(1).actor(&name).unwrap().fields().mass, 4.0);
    assert!(cluster.world_mut(1).take_events().contains(&WorldEvent::DerivedStateChanged {
        name,
        hook: FieldHook::Physics,
    }));
}

#[test]
fn replicas_are_read_only() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    let errors = Rc::new(RefCell::new(Vec::new()));
    let seen = errors.clone();
    let peer = cluster.peer_mut(1);
    peer.script.set_handler(move |_, fields| {
        seen.borrow_mut()
            .extend(fields.try_set_float(0, field::MASS, 5.0).err());
        assert_eq!(fields.get_float(0, field::MASS), 1.0);
        Ok(TickResponse::default())
    });
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    assert!(matches!(
        errors.borrow()[0],
        FieldError::NotLocallyOwned { .. }
    ));
    assert!(matches!(
        cluster.world_mut(1).set_field(&name, field::MASS, Value::Float(5.0)),
        Err(FieldError::NotLocallyOwned { .. })
    ));
    assert!(matches!(
        cluster.world_mut(1).set_field("ghost", field::MASS, Value::Float(5.0)),
        Err(FieldError::UnknownActor { .. })
    ));
}

#[test]
fn snapshot_carries_players_and_resynced_actors() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let player = cluster.world_mut(0).create_actor(Transform::default());
    let stage = cluster.world_mut(0).create_actor(Transform::default());
    let prop = cluster.world_mut(0).create_actor(Transform::default());
    cluster
        .world_mut(0)
        .set_field(&player, field::IS_PLAYER_CONTROLLABLE, Value::Bool(true))
        .unwrap();

    let peer = cluster.peer_mut(0);
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();
    let request = peer.script.last_request().unwrap();
    assert_eq!(request.actor_names, vec![player.clone(), stage.clone(), prop.clone()]);
    assert_eq!(snapshot_names(request), vec![player.as_str(), stage.as_str(), prop.as_str()]);

    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();
    let request = peer.script.last_request().unwrap();
    assert_eq!(snapshot_names(request), vec![player.as_str()]);
    assert!(request.snapshot[0].is_player_controllable);
    assert!(request.snapshot[0].is_locally_owned);

    peer.world
        .set_field(&stage, field::PREFER_OFFSTAGE, Value::Bool(true))
        .unwrap();
    assert!(peer.world.set_transform_parent(&prop, &stage));
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();
    let request = peer.script.last_request().unwrap();
    assert_eq!(
        snapshot_names(request),
        vec![player.as_str(), stage.as_str(), prop.as_str()]
    );
    assert!(!request.snapshot[0].is_offstage);
    assert!(request.snapshot[1].is_offstage);
    // offstage follows the root of the transform hierarchy
    assert!(request.snapshot[2].is_offstage);
}

#[test]
fn physics_requests_only_touch_owned_actors() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let mine = cluster.world_mut(0).create_actor(Transform::default());
    cluster.world_mut(1).create_actor(Transform::default());
    cluster.settle(2);

    let peer = cluster.peer_mut(0);
    peer.script.set_handler(|request, _| {
        let slots = 0..SlotIndex::try_from(request.actor_names.len()).unwrap_or_default();
        Ok(TickResponse {
            velocity_changes: slots
                .clone()
                .map(|slot| SlotVelocity {
                    slot,
                    delta: Vec3::new(0.0, 1.0, 0.0),
                })
                .collect(),
            torque_requests: slots
                .map(|slot| SlotTorque {
                    slot,
                    torque: Vec3::new(0.0, 0.0, 2.0),
                })
                .chain(Some(SlotTorque {
                    slot: 40,
                    torque: Vec3::ONE,
                }))
                .collect(),
            ..TickResponse::default()
        })
    });
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    assert_eq!(peer.physics.velocities, vec![(mine.clone(), Vec3::new(0.0, 1.0, 0.0))]);
    assert_eq!(peer.physics.torques, vec![(mine, Vec3::new(0.0, 0.0, 2.0))]);
}

#[test]
fn spawned_actors_and_clones_replicate() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let original = cluster.world_mut(0).create_actor(Transform::default());
    cluster
        .world_mut(0)
        .set_tags(&original, vec!["enemy".to_string()])
        .unwrap();
    cluster
        .world_mut(0)
        .set_field(&original, field::BRAIN_NAME, Value::Str("patrol".to_string()))
        .unwrap();
    cluster.settle(2);

    let peer = cluster.peer_mut(0);
    let at = Vec3::new(4.0, 0.0, -2.0);
    peer.script.push_response(TickResponse {
        spawn_requests: vec![
            SpawnRequest {
                clone_of: Some(original.clone()),
                position: at,
                rotation: Quat::IDENTITY,
            },
            SpawnRequest {
                clone_of: None,
                position: Vec3::ONE,
                rotation: Quat::IDENTITY,
            },
            SpawnRequest {
                clone_of: Some("ghost".to_string()),
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
            },
        ],
        ..TickResponse::default()
    });
    peer.world.take_events();
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    let spawned: Vec<String> = peer
        .world
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            WorldEvent::ActorSpawned {
                name,
                is_replica: false,
            } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 2);
    assert_eq!(peer.world.actors().count(), 3);

    let clone = peer.world.actor(&spawned[0]).unwrap();
    assert_eq!(clone.fields().clone_parent, original);
    assert!(clone.fields().was_cloned_by_script);
    assert_eq!(clone.fields().brain_name, "patrol");
    assert_eq!(clone.fields().position, at);
    assert_eq!(clone.fields().spawn_position, at);
    assert_eq!(clone.tags().to_vec(), vec!["enemy".to_string()]);
    assert_eq!(peer.world.actor(&spawned[1]).unwrap().fields().position, Vec3::ONE);

    cluster.settle(2);
    let replica = cluster.world(1).actor(&spawned[0]).unwrap();
    assert_eq!(replica.fields().clone_parent, original);
    assert_eq!(replica.fields().position, at);
    assert!(cluster.world(1).actor(&spawned[1]).is_some());
}

#[test]
fn host_messages_reach_the_host() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    let greeting = ActorMessage::to_actor(&name, "Greet", "{\"text\":\"hi\"}");
    let peer = cluster.peer_mut(0);
    peer.script.push_response(TickResponse {
        outbound_messages_to_host: vec![
            greeting.clone(),
            ActorMessage::to_actor("ghost", "Greet", "{}"),
            ActorMessage::broadcast("ResetTriggeredByHandler", "{}"),
            ActorMessage::broadcast("NoSuchHandler", "{}"),
        ],
        ..TickResponse::default()
    });
    peer.world.take_events();
    peer.world.queue_single_step();
    peer.tick(TICK).unwrap();

    let events = peer.world.take_events();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, WorldEvent::HostMessage(_)))
            .collect::<Vec<_>>(),
        vec![&WorldEvent::HostMessage(greeting)]
    );
    assert!(events.contains(&WorldEvent::GameReset));

    cluster.settle(2);
    assert!(cluster.world_mut(1).take_events().contains(&WorldEvent::GameReset));
}

#[test]
fn received_memory_is_handed_to_the_script_once() {
    init_logging();
    let mut cluster = TestCluster::new(2);
    let name = cluster.world_mut(0).create_actor(Transform::default());
    cluster.settle(2);

    let owner = cluster.peer_mut(0);
    owner.script.set_memory(&name, "{\"hp\":3}");
    owner.script.push_response(TickResponse {
        memory_dirty_actor_ids: vec![0],
        ..TickResponse::default()
    });
    owner.world.queue_single_step();
    owner.tick(TICK).unwrap();
    assert_eq!(owner.world.memory_sync_stats().syncs_sent, 1);

    let replica = cluster.peer_mut(1);
    replica.world.queue_single_step();
    replica.tick(TICK).unwrap();
    let request = replica.script.last_request().unwrap();
    let state = request
        .snapshot
        .iter()
        .find(|state| state.name == name)
        .unwrap();
    assert_eq!(state.memory_json.as_deref(), Some("{\"hp\":3}"));
    assert!(!state.is_locally_owned);

    replica.world.queue_single_step();
    replica.tick(TICK).unwrap();
    assert!(replica.script.last_request().unwrap().snapshot.is_empty());
}
