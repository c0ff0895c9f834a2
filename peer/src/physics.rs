use troupe_shared::Vec3;

/// The physics engine, as far as scripts can push it around
pub trait PhysicsSink {
    fn add_velocity(&mut self, actor: &str, delta: Vec3);

    fn add_torque(&mut self, actor: &str, torque: Vec3);
}

/// Discards every request. For headless peers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPhysics;

impl PhysicsSink for NullPhysics {
    fn add_velocity(&mut self, _actor: &str, _delta: Vec3) {}

    fn add_torque(&mut self, _actor: &str, _torque: Vec3) {}
}
