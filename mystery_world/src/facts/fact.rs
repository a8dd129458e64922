//! Fact definitions - ground predicate instances over entities.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, EntityRegistry};

/// Placeholder marking an entity slot inside a predicate label.
pub const SLOT: &str = "_";

/// A ground fact: a predicate label plus the entities filling its slots.
///
/// Literal words (including literal phrases such as "a promotion") live in the
/// label; every entity reference becomes a `_` slot. `(Alice is upset at Bob)`
/// is the label `_ is upset at _` with arguments `[Alice, Bob]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub label: String,
    pub args: Vec<EntityId>,
}

impl Fact {
    /// Create a fact from a label and its slot fillers.
    pub fn new(label: impl Into<String>, args: impl Into<Vec<EntityId>>) -> Self {
        Self {
            label: label.into(),
            args: args.into(),
        }
    }

    /// A fact with no entity slots, e.g. `case is closed`.
    pub fn flag(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    /// Number of `_` slots in a label.
    pub fn arity_of(label: &str) -> usize {
        label.split_whitespace().filter(|w| *w == SLOT).count()
    }

    /// Whether the argument count matches the label's slots.
    pub fn is_well_formed(&self) -> bool {
        Self::arity_of(&self.label) == self.args.len()
    }

    /// Whether this fact mentions the given entity.
    pub fn involves(&self, entity: EntityId) -> bool {
        self.args.contains(&entity)
    }

    /// Render the fact with entity names substituted into its slots.
    pub fn render(&self, registry: &EntityRegistry) -> String {
        let mut args = self.args.iter();
        self.label
            .split_whitespace()
            .map(|word| {
                if word == SLOT {
                    args.next()
                        .map(|id| registry.name(*id).map(str::to_string).unwrap_or_else(|| id.to_string()))
                        .unwrap_or_else(|| SLOT.to_string())
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}", self.label)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")
    }
}
