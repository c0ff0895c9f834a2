use troupe_peer::PhysicsSink;
use troupe_shared::Vec3;

/// Remembers every push the script asked for
#[derive(Debug, Default)]
pub struct RecordingPhysics {
    pub velocities: Vec<(String, Vec3)>,
    pub torques: Vec<(String, Vec3)>,
}

impl RecordingPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.velocities.clear();
        self.torques.clear();
    }
}

impl PhysicsSink for RecordingPhysics {
    fn add_velocity(&mut self, actor: &str, delta: Vec3) {
        self.velocities.push((actor.to_string(), delta));
    }

    fn add_torque(&mut self, actor: &str, torque: Vec3) {
        self.torques.push((actor.to_string(), torque));
    }
}
