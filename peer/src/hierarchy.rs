use std::fmt;

use troupe_shared::{field, FieldHook, FieldId};

/// The two parent relations an actor can have
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentLink {
    Transform,
    Spawn,
}

impl ParentLink {
    pub fn field(&self) -> FieldId {
        match self {
            ParentLink::Transform => field::TRANSFORM_PARENT,
            ParentLink::Spawn => field::SPAWN_TRANSFORM_PARENT,
        }
    }

    pub fn from_hook(hook: FieldHook) -> Option<Self> {
        match hook {
            FieldHook::Reparent => Some(ParentLink::Transform),
            FieldHook::SpawnReparent => Some(ParentLink::Spawn),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HierarchyViolation {
    SelfParent,
    Cycle,
    TooDeep,
}

impl HierarchyViolation {
    pub fn reason(&self) -> &'static str {
        match self {
            HierarchyViolation::SelfParent => "an actor cannot parent itself",
            HierarchyViolation::Cycle => "the new parent descends from the actor",
            HierarchyViolation::TooDeep => "the parent chain exceeds the maximum depth",
        }
    }
}

impl fmt::Display for HierarchyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Walks the ancestors `child` would have under `new_parent`.
///
/// `parent_of` maps an actor name to its parent name, `Some("")` for a root
/// and `None` for an unknown actor, which also ends the chain. An empty
/// `new_parent` detaches and always passes.
pub fn check_reparent<'a, F>(
    child: &str,
    new_parent: &str,
    max_depth: usize,
    parent_of: F,
) -> Result<(), HierarchyViolation>
where
    F: Fn(&str) -> Option<&'a str>,
{
    if new_parent.is_empty() {
        return Ok(());
    }
    if new_parent == child {
        return Err(HierarchyViolation::SelfParent);
    }

    let mut depth = 1;
    let mut current = parent_of(new_parent);
    while let Some(name) = current {
        if name.is_empty() {
            break;
        }
        if name == child {
            return Err(HierarchyViolation::Cycle);
        }
        depth += 1;
        if depth > max_depth {
            return Err(HierarchyViolation::TooDeep);
        }
        current = parent_of(name);
    }
    Ok(())
}

/// Follows `parent_of` up from `name` and returns the topmost ancestor, or
/// `None` when the chain is longer than `max_depth`.
pub fn root_of<'a, F>(name: &'a str, max_depth: usize, parent_of: F) -> Option<&'a str>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut current = name;
    for _ in 0..=max_depth {
        match parent_of(current) {
            Some(parent) if !parent.is_empty() => current = parent,
            _ => return Some(current),
        }
    }
    None
}
