//! Effect application - turns a grounding into one committed story beat.

use std::collections::BTreeMap;

use mystery_world::{EntityDraft, EntityId, EntityType, Fact, Transaction, WorldState};

use crate::beat::StoryBeat;
use crate::catalog::{ConstructionExpr, Effect, ExprPart, RoleKind, Rule, Term, THIS};
use crate::error::EngineError;
use crate::grounding::{clause_truth, Grounding, Resolved};

/// Apply `rule` under `grounding` as a single transaction.
///
/// The occurrence event and any constructed entities are staged first, then
/// every effect is evaluated against the store as it was before this call.
/// On error nothing has changed.
pub fn apply(
    world: &mut WorldState,
    rule: &Rule,
    grounding: &Grounding,
    index: usize,
    depth: usize,
    response_to: Option<usize>,
) -> Result<StoryBeat, EngineError> {
    let (transaction, entities, bindings) = {
        let mut draft = EntityDraft::new(&world.entities);
        let this = draft.create(EntityType::Event, Some(&format!("{} #{}", rule.id, index)));

        let mut bound: Vec<Option<EntityId>> = (0..rule.roles.len()).map(|i| grounding.get(i)).collect();
        for (i, role) in rule.roles.iter().enumerate() {
            if let RoleKind::Constructed(expr) = &role.kind {
                let name = construct_name(rule, &role.name, expr, &bound, this, &draft)?;
                bound[i] = Some(draft.create(role.entity_type, Some(&name)));
            }
        }

        let resolve = |term: Term| match term {
            Term::This => Resolved::Entity(this),
            Term::Any => Resolved::Any,
            Term::Role(i) => bound[i].map_or(Resolved::Vacant, Resolved::Entity),
        };

        let mut transaction = Transaction::new();
        for effect in &rule.effects {
            let literal = match effect {
                Effect::Fact(literal) => Some(literal),
                Effect::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    if clause_truth(&world.facts, condition, &resolve) {
                        then.as_ref()
                    } else {
                        otherwise.as_ref()
                    }
                }
            };
            let Some(literal) = literal else {
                continue;
            };
            // Effects about an unbound optional role do nothing.
            let Some(args) = literal
                .terms
                .iter()
                .map(|t| match resolve(*t) {
                    Resolved::Entity(id) => Some(id),
                    Resolved::Vacant | Resolved::Fresh | Resolved::Any => None,
                })
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let fact = Fact::new(literal.label.clone(), args);
            if literal.negated {
                transaction.retract(fact);
            } else {
                transaction.assert(fact);
            }
        }

        let mut bindings: BTreeMap<String, EntityId> = rule
            .roles
            .iter()
            .zip(&bound)
            .filter_map(|(role, id)| id.map(|id| (role.name.clone(), id)))
            .collect();
        bindings.insert(THIS.to_string(), this);

        (transaction, draft.into_entities(), bindings)
    };

    world.facts.commit(transaction)?;
    world.entities.commit(entities);

    tracing::debug!(rule = %rule.id, index, depth, "applied beat");
    Ok(StoryBeat {
        index,
        rule_id: rule.id.clone(),
        bindings,
        depth,
        response_to,
    })
}

fn construct_name(
    rule: &Rule,
    role: &str,
    expr: &ConstructionExpr,
    bound: &[Option<EntityId>],
    this: EntityId,
    draft: &EntityDraft<'_>,
) -> Result<String, EngineError> {
    let mut name = String::new();
    for part in &expr.parts {
        match part {
            ExprPart::Text(text) => name.push_str(text),
            ExprPart::Name(term) => {
                let id = match term {
                    Term::This => Some(this),
                    Term::Role(i) => bound[*i],
                    Term::Any => None,
                };
                let entity_name = id.and_then(|id| draft.name(id)).ok_or_else(|| EngineError::UnresolvedRole {
                    rule: rule.id.clone(),
                    role: role.to_string(),
                    missing: match term {
                        Term::This => THIS.to_string(),
                        Term::Role(i) => rule.roles[*i].name.clone(),
                        Term::Any => "*".to_string(),
                    },
                })?;
                name.push_str(entity_name);
            }
        }
    }
    Ok(name)
}
