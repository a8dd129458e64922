//! Fact store - the closed-world, transactional truth table of the world.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::Fact;
use crate::entities::EntityId;
use crate::error::WorldError;

/// A single mutation inside a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactOp {
    Assert(Fact),
    Retract(Fact),
}

/// An ordered batch of asserts and retracts applied atomically.
///
/// Later operations win over earlier ones on the same fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    ops: Vec<FactOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert(&mut self, fact: Fact) {
        self.ops.push(FactOp::Assert(fact));
    }

    pub fn retract(&mut self, fact: Fact) {
        self.ops.push(FactOp::Retract(fact));
    }

    pub fn ops(&self) -> &[FactOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// What a commit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitSummary {
    /// Store version after the commit.
    pub version: u64,
    /// Facts that became true.
    pub asserted: usize,
    /// Facts that stopped being true.
    pub retracted: usize,
}

/// Closed-world fact store.
///
/// Facts are grouped by predicate label, which doubles as the index used by
/// grounding to enumerate the argument tuples of one predicate. Any fact that
/// has not been asserted is false.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactStore {
    /// Index: label -> argument tuples currently true.
    by_label: HashMap<String, HashSet<Vec<EntityId>>>,

    /// Total number of true facts.
    count: usize,

    /// Incremented once per successful commit.
    version: u64,
}

impl FactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from initial facts.
    pub fn with_facts(facts: impl IntoIterator<Item = Fact>) -> Self {
        let mut store = Self::new();
        for fact in facts {
            store.assert(fact);
        }
        store
    }

    /// Make a fact true. Returns whether it was previously false.
    pub fn assert(&mut self, fact: Fact) -> bool {
        let inserted = self.by_label.entry(fact.label).or_default().insert(fact.args);
        if inserted {
            self.count += 1;
        }
        inserted
    }

    /// Make a fact false. Retracting a fact that is not true is a no-op.
    pub fn retract(&mut self, fact: &Fact) -> bool {
        let removed = match self.by_label.get_mut(&fact.label) {
            Some(tuples) => tuples.remove(&fact.args),
            None => false,
        };
        if removed {
            self.count -= 1;
            if self.by_label.get(&fact.label).is_some_and(|t| t.is_empty()) {
                self.by_label.remove(&fact.label);
            }
        }
        removed
    }

    /// Whether a fact is true. Unknown facts are false.
    pub fn holds(&self, fact: &Fact) -> bool {
        self.holds_parts(&fact.label, &fact.args)
    }

    /// [`holds`](Self::holds) without building a [`Fact`].
    pub fn holds_parts(&self, label: &str, args: &[EntityId]) -> bool {
        self.by_label.get(label).is_some_and(|tuples| tuples.contains(args))
    }

    /// Argument tuples of `label` agreeing with every `Some` position of `pattern`.
    ///
    /// Tuples of a different length than `pattern` are skipped.
    pub fn matching<'a>(
        &'a self,
        label: &str,
        pattern: &'a [Option<EntityId>],
    ) -> impl Iterator<Item = &'a [EntityId]> + 'a {
        self.by_label
            .get(label)
            .into_iter()
            .flat_map(|tuples| tuples.iter())
            .filter(move |args| {
                args.len() == pattern.len()
                    && pattern
                        .iter()
                        .zip(args.iter())
                        .all(|(want, have)| want.map_or(true, |w| w == *have))
            })
            .map(|args| args.as_slice())
    }

    /// Apply a transaction atomically.
    ///
    /// Every fact is checked for well-formedness before anything changes; a
    /// malformed fact rejects the whole transaction.
    pub fn commit(&mut self, transaction: Transaction) -> Result<CommitSummary, WorldError> {
        for op in transaction.ops() {
            let (FactOp::Assert(fact) | FactOp::Retract(fact)) = op;
            if !fact.is_well_formed() {
                return Err(WorldError::MalformedFact(fact.to_string()));
            }
        }

        let mut summary = CommitSummary::default();
        for op in transaction.ops {
            match op {
                FactOp::Assert(fact) => {
                    if self.assert(fact) {
                        summary.asserted += 1;
                    }
                }
                FactOp::Retract(fact) => {
                    if self.retract(&fact) {
                        summary.retracted += 1;
                    }
                }
            }
        }
        self.version += 1;
        summary.version = self.version;
        Ok(summary)
    }

    /// Iterate over every true fact (unordered).
    pub fn iter(&self) -> impl Iterator<Item = Fact> + '_ {
        self.by_label
            .iter()
            .flat_map(|(label, tuples)| tuples.iter().map(move |args| Fact::new(label.clone(), args.clone())))
    }

    /// Every true fact, sorted.
    pub fn sorted(&self) -> Vec<Fact> {
        let mut facts: Vec<_> = self.iter().collect();
        facts.sort();
        facts
    }

    /// Every true fact mentioning an entity, sorted.
    pub fn facts_about(&self, entity: EntityId) -> Vec<Fact> {
        let mut facts: Vec<_> = self.iter().filter(|f| f.involves(entity)).collect();
        facts.sort();
        facts
    }

    /// Number of true facts.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of commits applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }
}
