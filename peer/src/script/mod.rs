mod boundary;
mod tick_io;

pub use boundary::ScriptBoundary;
pub use tick_io::{
    ActorRuntimeState, SlotTorque, SlotVelocity, SpawnRequest, TickRequest, TickResponse,
    TouchEvent,
};
