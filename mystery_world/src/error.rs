//! Errors raised by the world model.

use thiserror::Error;

use crate::entities::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),

    #[error("an entity named `{0}` already exists")]
    DuplicateName(String),

    #[error("fact {0} does not match the arity of its label")]
    MalformedFact(String),

    #[error("unknown entity type `{0}` (expected Character, Location, Prop or Event)")]
    UnknownEntityType(String),
}
