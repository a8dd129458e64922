//! Entity definitions for the mystery world.

mod registry;

pub use registry::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::WorldError;

/// Unique identifier for all entities in the world.
///
/// Ids are handed out sequentially by the [`EntityRegistry`], so two runs that
/// create the same entities in the same order agree on every id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Position of this entity in the registry.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Types of entities in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Character,
    Location,
    Prop,
    /// A reified rule occurrence ("This").
    Event,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Character,
        EntityType::Location,
        EntityType::Prop,
        EntityType::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "Character",
            EntityType::Location => "Location",
            EntityType::Prop => "Prop",
            EntityType::Event => "Event",
        }
    }
}

impl FromStr for EntityType {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Character" => Ok(EntityType::Character),
            "Location" => Ok(EntityType::Location),
            "Prop" => Ok(EntityType::Prop),
            // Older rule files call reified occurrences actions.
            "Event" | "Action" => Ok(EntityType::Event),
            other => Err(WorldError::UnknownEntityType(other.to_string())),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed entity.
///
/// Entities are never deleted; anything that changes about them (being alive,
/// being somewhere) is a fact in the [`FactStore`](crate::FactStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub entity_type: EntityType,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id,
            name: name.into(),
            entity_type,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.entity_type)
    }
}
