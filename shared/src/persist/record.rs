use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use troupe_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    actor::ActorFields,
    persist::{
        error::PersistError,
        upgrade::{upgrade, CURRENT_VERSION},
    },
};

/// Snapshot of everything needed to recreate an actor: identity, tags,
/// the script memory blob and every typed field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub memory_json: String,
    #[serde(flatten)]
    pub fields: ActorFields,
}

impl PersistedRecord {
    /// Creates a record stamped with the current version
    pub fn new(name: &str, fields: ActorFields, tags: Vec<String>, memory_json: String) -> Self {
        Self {
            version: CURRENT_VERSION,
            name: name.to_string(),
            tags,
            memory_json,
            fields,
        }
    }

    /// Applies every upgrade rule newer than this record's version
    pub fn upgraded(self) -> Self {
        upgrade(self)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses the structured form. A record without `spawnPosition` or
    /// `spawnRotation` spawns where it stands.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        fill_spawn_defaults(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        let mut reader = BitReader::new(bytes);
        Ok(Self::de(&mut reader)?)
    }
}

/// Copies `position`/`rotation` into missing spawn keys of one record object
fn fill_spawn_defaults(record: &mut serde_json::Value) {
    let Some(record) = record.as_object_mut() else {
        return;
    };
    for (spawn_key, key) in [("spawnPosition", "position"), ("spawnRotation", "rotation")] {
        if record.contains_key(spawn_key) {
            continue;
        }
        if let Some(value) = record.get(key).cloned() {
            record.insert(spawn_key.to_string(), value);
        }
    }
}

impl Serde for PersistedRecord {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<4>::new(self.version).ser(writer);
        self.name.ser(writer);
        self.tags.ser(writer);
        self.memory_json.ser(writer);
        self.fields.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let version = UnsignedVariableInteger::<4>::de(reader)?.get();
        let version = u32::try_from(version).map_err(|_| SerdeErr::IntegerOverflow)?;
        Ok(Self {
            version,
            name: Serde::de(reader)?,
            tags: Serde::de(reader)?,
            memory_json: Serde::de(reader)?,
            fields: Serde::de(reader)?,
        })
    }
}

/// Ordered list of actor records, as written to a save file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub actors: Vec<PersistedRecord>,
}

impl SceneFile {
    pub fn new(actors: Vec<PersistedRecord>) -> Self {
        Self {
            version: CURRENT_VERSION,
            actors,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(actors) = value.get_mut("actors").and_then(|actors| actors.as_array_mut()) {
            actors.iter_mut().for_each(fill_spawn_defaults);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), PersistError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn read_from_path(path: &Path) -> Result<Self, PersistError> {
        let json = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
