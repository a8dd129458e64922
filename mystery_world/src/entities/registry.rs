//! Entity registry - every entity that exists, indexed by type and name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Entity, EntityId, EntityType};
use crate::error::WorldError;

/// Holds all entities for the lifetime of a simulation.
///
/// Entities are stored densely by id; the type index keeps ids in creation
/// order so candidate enumeration is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    entities: Vec<Entity>,

    /// Index: type -> ids of that type, in creation order.
    by_type: HashMap<EntityType, Vec<EntityId>>,

    /// Index: name -> id.
    by_name: HashMap<String, EntityId>,
}

impl EntityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity with an exact name.
    pub fn add(&mut self, name: impl Into<String>, entity_type: EntityType) -> Result<EntityId, WorldError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(WorldError::DuplicateName(name));
        }
        let id = self.next_id();
        self.insert(Entity::new(id, name, entity_type));
        Ok(id)
    }

    /// Create a new entity, deriving a unique name from `name` (or from the type
    /// when no name is given).
    pub fn create(&mut self, entity_type: EntityType, name: Option<&str>) -> EntityId {
        let mut draft = EntityDraft::new(self);
        let id = draft.create(entity_type, name);
        let created = draft.into_entities();
        self.commit(created);
        id
    }

    /// Insert entities staged by an [`EntityDraft`] over this registry.
    pub fn commit(&mut self, entities: Vec<Entity>) {
        for entity in entities {
            debug_assert_eq!(entity.id, self.next_id());
            self.insert(entity);
        }
    }

    fn insert(&mut self, entity: Entity) {
        self.by_type.entry(entity.entity_type).or_default().push(entity.id);
        self.by_name.insert(entity.name.clone(), entity.id);
        self.entities.push(entity);
    }

    /// The id the next created entity will receive.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.entities.len() as u32)
    }

    /// Get an entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Get an entity by id, or an error naming the missing id.
    pub fn require(&self, id: EntityId) -> Result<&Entity, WorldError> {
        self.get(id).ok_or(WorldError::UnknownEntity(id))
    }

    /// Name of an entity, if it exists.
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.get(id).map(|e| e.name.as_str())
    }

    /// Type of an entity, if it exists.
    pub fn entity_type(&self, id: EntityId) -> Option<EntityType> {
        self.get(id).map(|e| e.entity_type)
    }

    /// Look up an entity by exact name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// All entities of a type, in creation order.
    pub fn of_type(&self, entity_type: EntityType) -> &[EntityId] {
        self.by_type.get(&entity_type).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Iterate over every entity.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Entities staged for creation over a registry that is not mutated until the
/// draft is committed.
///
/// Rule application stages its event and constructed entities here so that a
/// failed application leaves the registry untouched.
#[derive(Debug)]
pub struct EntityDraft<'a> {
    registry: &'a EntityRegistry,
    pending: Vec<Entity>,
}

impl<'a> EntityDraft<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        Self {
            registry,
            pending: Vec::new(),
        }
    }

    /// Stage a new entity. Name clashes get a ` (n)` suffix.
    pub fn create(&mut self, entity_type: EntityType, name: Option<&str>) -> EntityId {
        let id = EntityId((self.registry.len() + self.pending.len()) as u32);
        let base = match name {
            Some(name) => name.to_string(),
            None => format!("{} {}", entity_type, id.0),
        };
        let name = self.unique_name(&base);
        self.pending.push(Entity::new(id, name, entity_type));
        id
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |candidate: &str| {
            self.registry.find_by_name(candidate).is_some() || self.pending.iter().any(|e| e.name == candidate)
        };
        let mut candidate = base.to_string();
        let mut suffix = 0;
        while taken(&candidate) {
            suffix += 1;
            candidate = format!("{} ({})", base, suffix);
        }
        candidate
    }

    /// Name of a committed or staged entity.
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.registry
            .name(id)
            .or_else(|| self.pending.iter().find(|e| e.id == id).map(|e| e.name.as_str()))
    }

    /// The registry this draft will be committed to.
    pub fn registry(&self) -> &EntityRegistry {
        self.registry
    }

    /// Consume the draft, yielding the staged entities in id order.
    pub fn into_entities(self) -> Vec<Entity> {
        self.pending
    }
}
