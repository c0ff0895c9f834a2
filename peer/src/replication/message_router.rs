use std::collections::BTreeMap;

use log::warn;

use troupe_shared::{ActorMessage, PeerId, RemoteMessage, ReplicationHandle};

/// Where a message addressed to one actor has to go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRoute {
    /// The target is owned here
    Local,
    /// The target is owned by `owner`
    Remote {
        owner: PeerId,
        handle: ReplicationHandle,
    },
    /// The target does not exist (anymore)
    Missing,
}

/// Every message bound for one destination during one tick. A `None`
/// destination is a broadcast to every other peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageGroup {
    pub destination: Option<PeerId>,
    pub messages: Vec<RemoteMessage>,
}

/// Splits a tick's outbound messages into those whose target is owned here,
/// returned for local delivery, and one group per remote destination.
/// Groups come out sorted by destination with the broadcast group first;
/// messages keep their relative order inside a group.
pub fn group_by_destination<F>(
    messages: Vec<ActorMessage>,
    route: F,
) -> (Vec<ActorMessage>, Vec<MessageGroup>)
where
    F: Fn(&str) -> MessageRoute,
{
    let mut local = Vec::new();
    let mut groups: BTreeMap<Option<PeerId>, Vec<RemoteMessage>> = BTreeMap::new();

    for message in messages {
        let target = match message.target_actor.as_deref() {
            Some(target) if !target.is_empty() => target,
            _ => {
                groups.entry(None).or_default().push(RemoteMessage {
                    target: None,
                    name: message.name,
                    args_json: message.args_json,
                });
                continue;
            }
        };

        match route(target) {
            MessageRoute::Local => local.push(message),
            MessageRoute::Remote { owner, handle } => {
                groups.entry(Some(owner)).or_default().push(RemoteMessage {
                    target: Some(handle),
                    name: message.name,
                    args_json: message.args_json,
                });
            }
            MessageRoute::Missing => {
                warn!(
                    "Dropping message {} for actor {}, which does not exist",
                    message.name, target
                );
            }
        }
    }

    let groups = groups
        .into_iter()
        .map(|(destination, messages)| MessageGroup {
            destination,
            messages,
        })
        .collect();
    (local, groups)
}
