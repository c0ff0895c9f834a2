use std::time::Duration;

use troupe_peer::{EngineConfig, EngineError, TickOutcome, World};
use troupe_shared::PeerId;

use crate::{
    helpers::{RecordingPhysics, ScriptedBoundary},
    local_hub::LocalHub,
};

/// Default step used by [`TestCluster::tick_all`]
pub const TICK: Duration = Duration::from_millis(50);

/// One world plus its script and physics fixtures
pub struct TestPeer {
    pub world: World,
    pub script: ScriptedBoundary,
    pub physics: RecordingPhysics,
}

impl TestPeer {
    pub fn tick(&mut self, dt: Duration) -> Result<TickOutcome, EngineError> {
        self.world.tick(dt, &mut self.script, &mut self.physics)
    }

    pub fn peer_id(&self) -> PeerId {
        self.world.local_peer()
    }
}

/// Several initialized peers on one [`LocalHub`]. Peer `i` has id `i + 1`.
pub struct TestCluster {
    pub hub: LocalHub,
    pub peers: Vec<TestPeer>,
    config: EngineConfig,
}

impl TestCluster {
    pub fn new(count: usize) -> Self {
        Self::with_config(count, EngineConfig::default())
    }

    pub fn with_config(count: usize, config: EngineConfig) -> Self {
        let mut cluster = Self {
            hub: LocalHub::new(),
            peers: Vec::new(),
            config,
        };
        for _ in 0..count {
            cluster.add_peer();
        }
        cluster
    }

    /// Connects one more initialized peer and returns its index
    pub fn add_peer(&mut self) -> usize {
        let index = self.peers.len();
        let id = u16::try_from(index + 1).unwrap_or(u16::MAX);
        let transport = self.hub.connect(PeerId::new(id));
        let mut world = World::new(self.config.clone(), Box::new(transport));
        world.mark_initialized();
        self.peers.push(TestPeer {
            world,
            script: ScriptedBoundary::new(),
            physics: RecordingPhysics::new(),
        });
        index
    }

    pub fn world(&self, index: usize) -> &World {
        &self.peers[index].world
    }

    pub fn world_mut(&mut self, index: usize) -> &mut World {
        &mut self.peers[index].world
    }

    pub fn peer_mut(&mut self, index: usize) -> &mut TestPeer {
        &mut self.peers[index]
    }

    pub fn peer_id(&self, index: usize) -> PeerId {
        self.peers[index].peer_id()
    }

    /// Ticks every peer once, in index order, by [`TICK`]
    pub fn tick_all(&mut self) {
        self.tick_all_by(TICK);
    }

    pub fn tick_all_by(&mut self, dt: Duration) {
        for (index, peer) in self.peers.iter_mut().enumerate() {
            if let Err(error) = peer.tick(dt) {
                panic!("peer {} failed to tick: {}", index, error);
            }
        }
    }

    /// Ticks every peer `rounds` times
    pub fn settle(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.tick_all();
        }
    }
}
