mod cluster;
mod recording_physics;
mod scripted_boundary;

pub use cluster::{TestCluster, TestPeer, TICK};
pub use recording_physics::RecordingPhysics;
pub use scripted_boundary::{ScriptedBoundary, TickHandler};
