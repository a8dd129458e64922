//! Grounding engine - enumerates role assignments that satisfy a rule's preconditions.
//!
//! A backtracking search binds the required roles in declaration order, then
//! the optional ones, so an optional role is only left vacant for a complete
//! set of required bindings. Each clause is checked as soon as every role it
//! mentions has been decided, and a positive single-literal clause narrows the
//! next role's candidates through the fact store's label index.

mod eval;

pub(crate) use eval::{clause_truth, Resolved};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use mystery_world::{EntityId, WorldState};

use crate::catalog::{RoleKind, Rule, Term};
use eval::{precondition_holds, Slot};

/// One satisfying assignment of a rule's roles.
///
/// Slots are indexed like the rule's roles. Universal and constructed roles,
/// and optional roles left unbound, hold `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grounding {
    slots: Vec<Option<EntityId>>,
}

impl Grounding {
    pub fn get(&self, role: usize) -> Option<EntityId> {
        self.slots.get(role).copied().flatten()
    }

    pub fn slots(&self) -> &[Option<EntityId>] {
        &self.slots
    }

    /// `(role index, entity)` for every bound role.
    pub fn bound(&self) -> impl Iterator<Item = (usize, EntityId)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.map(|id| (i, id)))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.slots.contains(&Some(entity))
    }

    fn from_slots(slots: &[Slot]) -> Self {
        Self {
            slots: slots
                .iter()
                .map(|s| match s {
                    Slot::Bound(id) => Some(*id),
                    Slot::Open | Slot::Vacant => None,
                })
                .collect(),
        }
    }
}

/// Read-only grounding over one world snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Grounder<'w> {
    world: &'w WorldState,
}

impl<'w> Grounder<'w> {
    pub fn new(world: &'w WorldState) -> Self {
        Self { world }
    }

    /// Every distinct grounding of `rule`.
    pub fn ground(&self, rule: &Rule) -> BTreeSet<Grounding> {
        self.ground_pinned(rule, &[])
    }

    /// Every distinct grounding of `rule` with some roles fixed in advance.
    ///
    /// Pins on roles that grounding does not bind, on unknown entities, on
    /// entities of the wrong type, or repeating an entity, yield no groundings.
    pub fn ground_pinned(&self, rule: &Rule, pins: &[(usize, EntityId)]) -> BTreeSet<Grounding> {
        let mut slots = vec![Slot::Open; rule.roles.len()];
        for &(role, entity) in pins {
            let valid = rule.roles.get(role).is_some_and(|spec| {
                spec.is_bindable() && self.world.entities.entity_type(entity) == Some(spec.entity_type)
            });
            if !valid || slots.contains(&Slot::Bound(entity)) || slots[role] != Slot::Open {
                return BTreeSet::new();
            }
            slots[role] = Slot::Bound(entity);
        }

        let mut search = Search::new(self.world, rule, &slots);
        search.descend(0, &mut slots);
        search.results
    }

    /// Whether every precondition of `rule` holds for `grounding`.
    pub fn satisfies(&self, rule: &Rule, grounding: &Grounding) -> bool {
        let slots: Vec<Slot> = rule
            .roles
            .iter()
            .enumerate()
            .map(|(i, spec)| match grounding.get(i) {
                Some(id) => Slot::Bound(id),
                None if spec.is_bindable() => Slot::Vacant,
                None => Slot::Open,
            })
            .collect();
        rule.preconditions
            .iter()
            .all(|clause| precondition_holds(self.world, rule, clause, &slots))
    }
}

struct Search<'g> {
    world: &'g WorldState,
    rule: &'g Rule,
    /// Roles still to decide: required ones, then optional ones.
    order: Vec<usize>,
    /// Clause indices to check once `k` roles of `order` are decided.
    checks: Vec<Vec<usize>>,
    results: BTreeSet<Grounding>,
}

impl<'g> Search<'g> {
    fn new(world: &'g WorldState, rule: &'g Rule, slots: &[Slot]) -> Self {
        let (mut order, optional): (Vec<usize>, Vec<usize>) = rule
            .bindable_roles()
            .filter(|&r| slots[r] == Slot::Open)
            .partition(|&r| !rule.roles[r].is_optional());
        order.extend(optional);
        let mut checks = vec![Vec::new(); order.len() + 1];
        for (index, clause) in rule.preconditions.iter().enumerate() {
            let mut ready = 0;
            for role in clause.roles() {
                if let Some(position) = order.iter().position(|&r| r == role) {
                    ready = ready.max(position + 1);
                }
                // The domain shrinks as roles get bound, so wait for all of them.
                if matches!(rule.roles[role].kind, RoleKind::Universal { include_bound: false }) {
                    ready = order.len();
                }
            }
            checks[ready].push(index);
        }
        Self {
            world,
            rule,
            order,
            checks,
            results: BTreeSet::new(),
        }
    }

    /// Returns whether any grounding was found below this point.
    fn descend(&mut self, step: usize, slots: &mut Vec<Slot>) -> bool {
        let rule = self.rule;
        let current: &[Slot] = slots;
        let satisfied = self.checks[step]
            .iter()
            .all(|&c| precondition_holds(self.world, rule, &rule.preconditions[c], current));
        if !satisfied {
            return false;
        }

        if step == self.order.len() {
            let grounding = Grounding::from_slots(slots);
            if rule.debug {
                tracing::trace!(rule = %rule.id, grounding = ?grounding.slots(), "candidate grounding");
            }
            self.results.insert(grounding);
            return true;
        }

        let role = self.order[step];
        let mut found = false;
        for candidate in self.candidates(role, step, slots) {
            slots[role] = Slot::Bound(candidate);
            found |= self.descend(step + 1, slots);
        }
        if !found && rule.roles[role].is_optional() {
            slots[role] = Slot::Vacant;
            found = self.descend(step + 1, slots);
        }
        slots[role] = Slot::Open;
        found
    }

    /// Unused entities of the role's type, narrowed by the label index when possible.
    fn candidates(&self, role: usize, step: usize, slots: &[Slot]) -> Vec<EntityId> {
        let entity_type = self.rule.roles[role].entity_type;
        let free = |id: &EntityId| !slots.contains(&Slot::Bound(*id));

        match self.checks[step + 1].iter().find_map(|&c| self.indexed(c, role, slots)) {
            Some(narrowed) => narrowed
                .into_iter()
                .filter(|id| self.world.entities.entity_type(*id) == Some(entity_type))
                .filter(free)
                .collect(),
            None => self
                .world
                .entities
                .of_type(entity_type)
                .iter()
                .copied()
                .filter(free)
                .collect(),
        }
    }

    /// Entities that can fill `role` in a positive single-literal clause, given the other bound roles.
    fn indexed(&self, clause: usize, role: usize, slots: &[Slot]) -> Option<Vec<EntityId>> {
        let literal = self.rule.preconditions[clause].single()?;
        if literal.negated {
            return None;
        }
        let mut pattern = Vec::with_capacity(literal.terms.len());
        let mut position = None;
        for (i, term) in literal.terms.iter().enumerate() {
            match term {
                Term::Role(r) if *r == role => {
                    position.get_or_insert(i);
                    pattern.push(None);
                }
                Term::Role(r) => match slots[*r] {
                    Slot::Bound(id) => pattern.push(Some(id)),
                    Slot::Open | Slot::Vacant => return None,
                },
                Term::Any => pattern.push(None),
                Term::This => return None,
            }
        }
        let position = position?;
        let mut found: Vec<EntityId> = self
            .world
            .facts
            .matching(&literal.label, &pattern)
            .map(|args| args[position])
            .collect();
        found.sort();
        found.dedup();
        Some(found)
    }
}
