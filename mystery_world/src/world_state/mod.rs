//! World state management - the registry and fact store owned by a simulation.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, EntityRegistry, EntityType};
use crate::error::WorldError;
use crate::facts::{Fact, FactStore};

/// The complete state of the world at any point in a simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldState {
    /// All entities that exist (never shrinks).
    pub entities: EntityRegistry,

    /// Everything that is currently true.
    pub facts: FactStore,
}

impl WorldState {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named entity.
    pub fn add_entity(&mut self, name: impl Into<String>, entity_type: EntityType) -> Result<EntityId, WorldError> {
        self.entities.add(name, entity_type)
    }

    /// Add a character.
    pub fn add_character(&mut self, name: impl Into<String>) -> Result<EntityId, WorldError> {
        self.add_entity(name, EntityType::Character)
    }

    /// Add a location.
    pub fn add_location(&mut self, name: impl Into<String>) -> Result<EntityId, WorldError> {
        self.add_entity(name, EntityType::Location)
    }

    /// Add a prop.
    pub fn add_prop(&mut self, name: impl Into<String>) -> Result<EntityId, WorldError> {
        self.add_entity(name, EntityType::Prop)
    }

    /// Assert a starting fact. Every argument must be a known entity.
    pub fn state(&mut self, label: &str, args: &[EntityId]) -> Result<(), WorldError> {
        for id in args {
            self.entities.require(*id)?;
        }
        let fact = Fact::new(label, args.to_vec());
        if !fact.is_well_formed() {
            return Err(WorldError::MalformedFact(fact.to_string()));
        }
        self.facts.assert(fact);
        Ok(())
    }

    /// Whether `label` holds for `args`.
    pub fn holds(&self, label: &str, args: &[EntityId]) -> bool {
        self.facts.holds_parts(label, args)
    }

    /// Entities `x` for which the one-slot fact `label` holds, in id order.
    pub fn entities_with(&self, label: &str) -> Vec<EntityId> {
        let mut found: Vec<_> = self.facts.matching(label, &[None]).map(|args| args[0]).collect();
        found.sort();
        found
    }

    /// Every true fact rendered with entity names, sorted.
    pub fn describe_facts(&self) -> Vec<String> {
        let mut lines: Vec<_> = self.facts.iter().map(|f| f.render(&self.entities)).collect();
        lines.sort();
        lines
    }
}
