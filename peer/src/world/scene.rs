use std::path::Path;

use log::{info, warn};

use troupe_shared::{PersistError, SceneFile};

use crate::world::World;

impl World {
    /// Saves every actor, replicas included, in creation order
    pub fn save_scene(&self) -> SceneFile {
        SceneFile::new(self.registry.iter().map(|actor| actor.save()).collect())
    }

    /// Creates a locally owned actor for each record and announces it.
    /// Records without a name or with a name already in use are skipped.
    /// Records without a version stamp count as version 0 and go through
    /// every upgrade rule. Parent links that would close a cycle are dropped.
    /// Returns how many actors were created.
    pub fn load_scene(&mut self, scene: &SceneFile) -> usize {
        let mut created = 0;
        for record in &scene.actors {
            if record.name.is_empty() {
                warn!("Skipping scene record without a name");
                continue;
            }
            if self.registry.get_by_name(&record.name).is_some() {
                warn!("Skipping scene record {}: name already in use", record.name);
                continue;
            }

            match self.create_actor_from_record(record.clone()) {
                Ok(_) => created += 1,
                Err(error) => warn!("Skipping scene record: {}", error),
            }
        }
        info!("Loaded {} of {} scene actors", created, scene.actors.len());
        created
    }

    pub fn save_scene_to_path(&self, path: &Path) -> Result<(), PersistError> {
        self.save_scene().write_to_path(path)
    }

    pub fn load_scene_from_path(&mut self, path: &Path) -> Result<usize, PersistError> {
        let scene = SceneFile::read_from_path(path)?;
        Ok(self.load_scene(&scene))
    }
}
