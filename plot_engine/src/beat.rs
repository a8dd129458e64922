use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use mystery_world::EntityId;

use crate::catalog::THIS;

/// One applied rule instance in the story history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBeat {
    /// Position in the history, starting at 0.
    pub index: usize,
    pub rule_id: String,
    /// Every bound role, including `This` and constructed roles.
    pub bindings: BTreeMap<String, EntityId>,
    /// 0 for a top-level beat, parent depth + 1 for a response.
    pub depth: usize,
    /// Index of the beat this one responded to.
    pub response_to: Option<usize>,
}

impl StoryBeat {
    /// The event entity created for this occurrence.
    pub fn this(&self) -> Option<EntityId> {
        self.role(THIS)
    }

    pub fn role(&self, name: &str) -> Option<EntityId> {
        self.bindings.get(name).copied()
    }

    pub fn involves(&self, entity: EntityId) -> bool {
        self.bindings.values().any(|id| *id == entity)
    }

    pub fn is_response(&self) -> bool {
        self.response_to.is_some()
    }
}

impl std::fmt::Display for StoryBeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roles: Vec<_> = self.bindings.iter().map(|(role, id)| format!("{}={}", role, id)).collect();
        write!(f, "[{}] ${}({})", self.index, self.rule_id, roles.join(", "))
    }
}
