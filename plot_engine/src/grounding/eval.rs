//! Truth of literals and clauses under a (possibly partial) role assignment.

use mystery_world::{EntityId, FactStore, WorldState};

use crate::catalog::{Clause, Literal, RoleKind, Rule, Term};

/// Search state of one role during grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Open,
    Bound(EntityId),
    Vacant,
}

/// What a term stands for when a literal is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    Entity(EntityId),
    /// An optional role left unbound.
    Vacant,
    /// The occurrence that has not been created yet.
    Fresh,
    /// A `*` wildcard, satisfied by any entity.
    Any,
}

/// Truth of one literal, or `None` when it mentions an unbound optional role.
///
/// With a wildcard the positive literal asks whether any matching fact exists.
pub(crate) fn literal_truth(store: &FactStore, literal: &Literal, resolve: &impl Fn(Term) -> Resolved) -> Option<bool> {
    let resolved: Vec<_> = literal.terms.iter().map(|t| resolve(*t)).collect();
    if resolved.contains(&Resolved::Vacant) {
        return None;
    }
    if resolved.contains(&Resolved::Fresh) {
        return Some(literal.negated);
    }
    let pattern: Vec<Option<EntityId>> = resolved
        .iter()
        .map(|r| match r {
            Resolved::Entity(id) => Some(*id),
            _ => None,
        })
        .collect();
    let holds = if resolved.contains(&Resolved::Any) {
        store.matching(&literal.label, &pattern).next().is_some()
    } else {
        let args: Vec<EntityId> = pattern.into_iter().flatten().collect();
        store.holds_parts(&literal.label, &args)
    };
    Some(holds != literal.negated)
}

/// A clause holds when any alternative that could be evaluated is true.
///
/// Alternatives about unbound optional roles are skipped; a clause whose every
/// alternative was skipped holds.
pub(crate) fn clause_truth(store: &FactStore, clause: &Clause, resolve: &impl Fn(Term) -> Resolved) -> bool {
    let mut evaluated = false;
    for literal in &clause.alternatives {
        match literal_truth(store, literal, resolve) {
            Some(true) => return true,
            Some(false) => evaluated = true,
            None => {}
        }
    }
    !evaluated
}

/// Check a precondition clause, quantifying over its universal roles.
pub(crate) fn precondition_holds(world: &WorldState, rule: &Rule, clause: &Clause, slots: &[Slot]) -> bool {
    let bound: Vec<EntityId> = slots
        .iter()
        .filter_map(|s| match s {
            Slot::Bound(id) => Some(*id),
            _ => None,
        })
        .collect();

    let domains: Vec<(usize, Vec<EntityId>)> = clause
        .roles()
        .into_iter()
        .filter_map(|r| match rule.roles[r].kind {
            RoleKind::Universal { include_bound } => {
                let domain = world
                    .entities
                    .of_type(rule.roles[r].entity_type)
                    .iter()
                    .copied()
                    .filter(|id| include_bound || !bound.contains(id))
                    .collect();
                Some((r, domain))
            }
            _ => None,
        })
        .collect();

    let mut check = |universal: &[(usize, EntityId)]| {
        let resolve = |term: Term| match term {
            Term::This => Resolved::Fresh,
            Term::Any => Resolved::Any,
            Term::Role(r) => match universal.iter().find(|(u, _)| *u == r) {
                Some((_, id)) => Resolved::Entity(*id),
                None => match slots[r] {
                    Slot::Bound(id) => Resolved::Entity(id),
                    Slot::Open | Slot::Vacant => Resolved::Vacant,
                },
            },
        };
        clause_truth(&world.facts, clause, &resolve)
    };
    for_all(&domains, &mut Vec::new(), &mut check)
}

/// Whether `check` holds for every combination drawn from `domains`.
fn for_all(
    domains: &[(usize, Vec<EntityId>)],
    assigned: &mut Vec<(usize, EntityId)>,
    check: &mut impl FnMut(&[(usize, EntityId)]) -> bool,
) -> bool {
    match domains.split_first() {
        None => check(assigned),
        Some(((role, domain), rest)) => domain.iter().all(|&id| {
            assigned.push((*role, id));
            let holds = for_all(rest, assigned, check);
            assigned.pop();
            holds
        }),
    }
}
