//! Fact patterns - queries with free variables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Fact, FactStore};
use crate::entities::EntityId;

/// One argument position of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternArg {
    /// Must be exactly this entity.
    Entity(EntityId),
    /// Binds a named variable; repeated names must agree.
    Var(String),
    /// Matches anything without binding.
    Any,
}

/// Variable assignment produced by a query.
pub type Binding = BTreeMap<String, EntityId>;

/// A fact with some positions left free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPattern {
    pub label: String,
    pub args: Vec<PatternArg>,
}

impl FactPattern {
    pub fn new(label: impl Into<String>, args: Vec<PatternArg>) -> Self {
        Self {
            label: label.into(),
            args,
        }
    }

    /// Match a single fact, returning the variable binding on success.
    pub fn unify(&self, fact: &Fact) -> Option<Binding> {
        if fact.label != self.label || fact.args.len() != self.args.len() {
            return None;
        }
        let mut binding = Binding::new();
        for (arg, value) in self.args.iter().zip(&fact.args) {
            match arg {
                PatternArg::Entity(id) if id != value => return None,
                PatternArg::Var(name) => match binding.get(name) {
                    Some(existing) if existing != value => return None,
                    Some(_) => {}
                    None => {
                        binding.insert(name.clone(), *value);
                    }
                },
                _ => {}
            }
        }
        Some(binding)
    }

    fn fixed_positions(&self) -> Vec<Option<EntityId>> {
        self.args
            .iter()
            .map(|arg| match arg {
                PatternArg::Entity(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl FactStore {
    /// Every distinct binding of the pattern's variables to a true fact.
    pub fn query(&self, pattern: &FactPattern) -> BTreeSet<Binding> {
        let fixed = pattern.fixed_positions();
        self.matching(&pattern.label, &fixed)
            .filter_map(|args| pattern.unify(&Fact::new(pattern.label.clone(), args.to_vec())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(who: u32, place: u32) -> Fact {
        Fact::new("_ is at _", vec![EntityId(who), EntityId(place)])
    }

    #[test]
    fn test_query_binds_variables() {
        let store = FactStore::with_facts([at(0, 10), at(1, 10), at(2, 11)]);

        let pattern = FactPattern::new(
            "_ is at _",
            vec![PatternArg::Var("Who".into()), PatternArg::Entity(EntityId(10))],
        );
        let results = store.query(&pattern);
        let who: Vec<_> = results.iter().map(|b| b["Who"]).collect();
        assert_eq!(who, vec![EntityId(0), EntityId(1)]);
    }

    #[test]
    fn test_query_repeated_variable_must_agree() {
        let store = FactStore::with_facts([
            Fact::new("_ likes _", vec![EntityId(0), EntityId(0)]),
            Fact::new("_ likes _", vec![EntityId(0), EntityId(1)]),
        ]);

        let pattern = FactPattern::new(
            "_ likes _",
            vec![PatternArg::Var("X".into()), PatternArg::Var("X".into())],
        );
        let results = store.query(&pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results.iter().next().unwrap()["X"], EntityId(0));
    }

    #[test]
    fn test_query_wildcard_and_no_match() {
        let store = FactStore::with_facts([at(0, 10), at(0, 11)]);

        let anywhere = FactPattern::new("_ is at _", vec![PatternArg::Entity(EntityId(0)), PatternArg::Any]);
        // Both facts unify to the same empty binding.
        assert_eq!(store.query(&anywhere).len(), 1);

        let nobody = FactPattern::new("_ is at _", vec![PatternArg::Entity(EntityId(5)), PatternArg::Any]);
        assert!(store.query(&nobody).is_empty());
    }
}
