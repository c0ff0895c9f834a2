use serde::{Deserialize, Serialize};
use troupe_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::types::ReplicationHandle;

/// A script-level message. An empty target means a broadcast to every actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorMessage {
    pub name: String,
    #[serde(default)]
    pub target_actor: Option<String>,
    #[serde(default)]
    pub args_json: String,
    #[serde(default)]
    pub from_remote: bool,
}

impl ActorMessage {
    pub fn broadcast(name: &str, args_json: &str) -> Self {
        Self {
            name: name.to_string(),
            target_actor: None,
            args_json: args_json.to_string(),
            from_remote: false,
        }
    }

    pub fn to_actor(target: &str, name: &str, args_json: &str) -> Self {
        Self {
            name: name.to_string(),
            target_actor: Some(target.to_string()),
            args_json: args_json.to_string(),
            from_remote: false,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.target_actor.as_deref().map_or(true, str::is_empty)
    }
}

/// Wire form of an [`ActorMessage`]: the target travels as a replication
/// handle because names are resolved on the receiving side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMessage {
    pub target: Option<ReplicationHandle>,
    pub name: String,
    pub args_json: String,
}

impl Serde for RemoteMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.target.ser(writer);
        self.name.ser(writer);
        self.args_json.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            target: Serde::de(reader)?,
            name: Serde::de(reader)?,
            args_json: Serde::de(reader)?,
        })
    }
}
