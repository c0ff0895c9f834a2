//! Saving and loading scenes through save files, including records written
//! by older versions.
use troupe_peer::OwnershipStatus;
use troupe_shared::{
    field, ActorFields, PersistedRecord, SceneFile, Transform, Value, Vec3, CURRENT_VERSION,
};
use troupe_test::TestCluster;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn record(name: &str, position: Vec3) -> PersistedRecord {
    let mut fields = ActorFields::default();
    fields.position = position;
    fields.spawn_position = position;
    PersistedRecord::new(name, fields, Vec::new(), String::new())
}

#[test]
fn scene_round_trips_through_a_file() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let world = cluster.world_mut(0);
    let lamp = world.create_actor(Transform::default());
    world
        .set_field(&lamp, field::DESCRIPTION, Value::Str("warm light".to_string()))
        .unwrap();
    world.set_tags(&lamp, vec!["light".to_string()]).unwrap();
    let table = world.create_actor(Transform::default());
    assert!(world.set_transform_parent(&lamp, &table));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    world.save_scene_to_path(&path).unwrap();

    let mut fresh = TestCluster::new(2);
    assert_eq!(fresh.world_mut(0).load_scene_from_path(&path).unwrap(), 2);
    let loaded = fresh.world(0).actor(&lamp).unwrap();
    assert_eq!(loaded.fields().description, "warm light");
    assert_eq!(loaded.fields().transform_parent, table);
    assert_eq!(loaded.tags().to_vec(), vec!["light".to_string()]);
    assert_eq!(fresh.world(0).ownership(&lamp), Some(OwnershipStatus::Local));

    fresh.settle(2);
    assert_eq!(
        fresh.world(1).actor(&lamp).unwrap().fields().description,
        "warm light"
    );
}

#[test]
fn saved_scene_is_stamped_with_the_current_version() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    cluster.world_mut(0).create_actor(Transform::default());
    let scene = cluster.world(0).save_scene();

    assert_eq!(scene.version, CURRENT_VERSION);
    assert!(scene.actors.iter().all(|actor| actor.version == CURRENT_VERSION));
}

#[test]
fn unnamed_and_duplicate_records_are_skipped() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let scene = SceneFile::new(vec![
        record("rock", Vec3::ONE),
        record("", Vec3::ZERO),
        record("rock", Vec3::new(5.0, 5.0, 5.0)),
        record("tree", Vec3::ZERO),
    ]);

    assert_eq!(cluster.world_mut(0).load_scene(&scene), 2);
    assert_eq!(cluster.world(0).actors().count(), 2);
    assert_eq!(
        cluster.world(0).actor("rock").unwrap().fields().position,
        Vec3::ONE
    );
}

#[test]
fn unversioned_records_run_every_upgrade() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let mut old = record("statue", Vec3::new(3.0, 0.0, 1.0));
    old.version = 0;
    old.fields.spawn_position = Vec3::ZERO;
    old.fields.is_solid = false;
    old.fields.use_concave_collider = false;
    let scene = SceneFile::new(vec![old]);
    assert_eq!(scene.version, CURRENT_VERSION);

    assert_eq!(cluster.world_mut(0).load_scene(&scene), 1);
    let fields = cluster.world(0).actor("statue").unwrap().fields();
    assert!(fields.is_solid);
    assert!(fields.use_concave_collider);
    assert_eq!(fields.spawn_position, Vec3::new(3.0, 0.0, 1.0));
}

#[test]
fn parent_cycles_in_a_scene_are_broken() {
    init_logging();
    let mut a = record("a", Vec3::ZERO);
    a.fields.transform_parent = "b".to_string();
    a.fields.spawn_transform_parent = "b".to_string();
    let mut b = record("b", Vec3::ZERO);
    b.fields.transform_parent = "a".to_string();
    b.fields.spawn_transform_parent = "a".to_string();
    let mut c = record("c", Vec3::ZERO);
    c.fields.transform_parent = "c".to_string();
    let scene = SceneFile::new(vec![a, b, c]);

    let mut cluster = TestCluster::new(2);
    assert_eq!(cluster.world_mut(0).load_scene(&scene), 3);
    cluster.settle(2);

    for index in 0..2 {
        let world = cluster.world(index);
        let a = world.actor("a").unwrap().fields();
        let b = world.actor("b").unwrap().fields();
        assert_eq!(a.transform_parent, "b");
        assert_eq!(b.transform_parent, "");
        assert_eq!(a.spawn_transform_parent, "b");
        assert_eq!(b.spawn_transform_parent, "");
        assert_eq!(world.actor("c").unwrap().fields().transform_parent, "");
    }
}

#[test]
fn non_finite_values_never_reach_the_save_file() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let world = cluster.world_mut(0);
    let ball = world.create_actor(Transform::default());
    assert!(world.set_field(&ball, field::MASS, Value::Float(f32::NAN)).is_err());
    assert!(world
        .set_field(
            &ball,
            field::VELOCITY,
            Value::Vec3(Vec3::new(f32::INFINITY, 0.0, 0.0))
        )
        .is_err());
    world.set_field(&ball, field::MASS, Value::Float(4.0)).unwrap();

    let json = world.save_scene().to_json().unwrap();
    let scene = SceneFile::from_json(&json).unwrap();
    assert_eq!(scene.actors[0].fields.mass, 4.0);
    assert_eq!(scene.actors[0].fields.velocity, Vec3::ZERO);
}

#[test]
fn version_one_json_takes_spawn_from_position() {
    init_logging();
    let json = r#"{
        "version": 1,
        "actors": [
            {
                "version": 1,
                "name": "barrel",
                "position": { "x": 1.0, "y": 2.0, "z": 3.0 },
                "spawnPosition": { "x": 9.0, "y": 9.0, "z": 9.0 }
            }
        ]
    }"#;
    let scene = SceneFile::from_json(json).unwrap();
    let mut cluster = TestCluster::new(1);
    assert_eq!(cluster.world_mut(0).load_scene(&scene), 1);

    let fields = cluster.world(0).actor("barrel").unwrap().fields();
    assert_eq!(fields.spawn_position, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn missing_spawn_keys_default_to_the_current_transform() {
    init_logging();
    let json = r#"{
        "version": 2,
        "actors": [
            {
                "version": 2,
                "name": "crate",
                "position": { "x": -4.0, "y": 0.5, "z": 2.0 },
                "rotation": { "x": 0.0, "y": 1.0, "z": 0.0, "w": 0.0 }
            }
        ]
    }"#;
    let scene = SceneFile::from_json(json).unwrap();
    let mut cluster = TestCluster::new(1);
    assert_eq!(cluster.world_mut(0).load_scene(&scene), 1);

    let fields = cluster.world(0).actor("crate").unwrap().fields();
    assert_eq!(fields.spawn_position, Vec3::new(-4.0, 0.5, 2.0));
    assert_eq!(fields.spawn_rotation, fields.rotation);
}

#[test]
fn reading_a_missing_file_fails() {
    init_logging();
    let mut cluster = TestCluster::new(1);
    let dir = tempfile::tempdir().unwrap();
    assert!(cluster
        .world_mut(0)
        .load_scene_from_path(&dir.path().join("absent.json"))
        .is_err());
}
