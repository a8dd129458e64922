//! Rule templates - roles, clauses, effects and responses as plain data.

use mystery_world::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role name bound to the reified occurrence of a rule.
pub const THIS: &str = "This";

/// How a role gets its entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoleKind {
    /// Must bind exactly one entity.
    Required,
    /// Binds one entity when some candidate leads to a grounding, else stays unbound.
    Optional,
    /// Never bound; clauses mentioning it must hold for every entity of the type.
    Universal {
        /// Whether entities already bound to other roles are quantified over too.
        include_bound: bool,
    },
    /// Built from an expression when effects are applied.
    Constructed(ConstructionExpr),
}

/// A named, typed slot on a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    pub entity_type: EntityType,
    pub kind: RoleKind,
}

impl RoleSpec {
    /// Whether grounding binds this role (required or optional).
    pub fn is_bindable(&self) -> bool {
        matches!(self.kind, RoleKind::Required | RoleKind::Optional)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, RoleKind::Optional)
    }

    pub fn is_universal(&self) -> bool {
        matches!(self.kind, RoleKind::Universal { .. })
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.kind, RoleKind::Constructed(_))
    }
}

impl std::fmt::Display for RoleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            RoleKind::Required => write!(f, "{}:{}", self.name, self.entity_type),
            RoleKind::Optional => write!(f, "?{}:{}", self.name, self.entity_type),
            RoleKind::Universal { .. } => write!(f, "*{}:{}", self.name, self.entity_type),
            RoleKind::Constructed(expr) => write!(f, "+{}={}:{}", self.name, expr.source, self.entity_type),
        }
    }
}

/// A reference inside a literal or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Index into the rule's roles.
    Role(usize),
    /// The occurrence being created.
    This,
    /// `*` in a condition: some entity, any entity.
    Any,
}

/// A single predicate over terms, possibly negated.
///
/// In preconditions `negated` means "must be false"; in effects it means retract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    /// Predicate label, with `_` for each term.
    pub label: String,
    pub terms: Vec<Term>,
    pub negated: bool,
}

impl Literal {
    /// Role indices mentioned by this literal.
    pub fn roles(&self) -> impl Iterator<Item = usize> + '_ {
        self.terms.iter().filter_map(|t| match t {
            Term::Role(i) => Some(*i),
            Term::This | Term::Any => None,
        })
    }

    pub fn mentions_this(&self) -> bool {
        self.terms.contains(&Term::This)
    }
}

/// A precondition: one literal, or a disjunction of alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub alternatives: Vec<Literal>,
    /// Source text (after placeholder expansion).
    pub source: String,
}

impl Clause {
    /// Every role mentioned by any alternative.
    pub fn roles(&self) -> BTreeSet<usize> {
        self.alternatives.iter().flat_map(|l| l.roles()).collect()
    }

    /// The only literal of a non-disjunctive clause.
    pub fn single(&self) -> Option<&Literal> {
        match self.alternatives.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// One line of a rule's effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Assert (or retract, when negated) a fact.
    Fact(Literal),
    /// `(then) if (condition) else (otherwise)`; either branch may be empty.
    Conditional {
        condition: Clause,
        then: Option<Literal>,
        otherwise: Option<Literal>,
    },
}

impl Effect {
    /// Every literal this effect may apply.
    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        let (first, second) = match self {
            Effect::Fact(literal) => (Some(literal), None),
            Effect::Conditional { then, otherwise, .. } => (then.as_ref(), otherwise.as_ref()),
        };
        first.into_iter().chain(second)
    }
}

/// Piece of a construction expression such as `{Victim}'s body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprPart {
    Text(String),
    Name(Term),
}

/// Recipe for naming a constructed entity from other bound entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionExpr {
    pub parts: Vec<ExprPart>,
    pub source: String,
}

/// `Rule(Target=Source, ...)`: a follow-up branch with pinned roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub rule_id: String,
    /// `(role on the called rule, role on the calling rule)`.
    pub pins: Vec<(String, String)>,
    pub line: usize,
}

impl std::fmt::Display for ResponseSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pins: Vec<_> = self.pins.iter().map(|(t, s)| format!("{}={}", t, s)).collect();
        write!(f, "{}({})", self.rule_id, pins.join(", "))
    }
}

/// A parsed, validated rule template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// Title template with `{Role}` placeholders, opaque to the engine.
    pub title: String,
    /// Per-grounding firing probability in (0, 1].
    pub probability: f64,
    /// Only fires as a response to another rule.
    pub response_only: bool,
    /// Trace candidate groundings for this rule.
    pub debug: bool,
    pub roles: Vec<RoleSpec>,
    pub preconditions: Vec<Clause>,
    pub effects: Vec<Effect>,
    pub responses: Vec<ResponseSpec>,
    /// Line of the `$` header.
    pub line: usize,
}

impl Rule {
    /// Index of a declared role.
    pub fn role_index(&self, name: &str) -> Option<usize> {
        self.roles.iter().position(|r| r.name == name)
    }

    pub fn role(&self, name: &str) -> Option<&RoleSpec> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Indices of required and optional roles, in declaration order.
    pub fn bindable_roles(&self) -> impl Iterator<Item = usize> + '_ {
        self.roles
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_bindable())
            .map(|(i, _)| i)
    }

    /// Whether some precondition requires the zero-slot fact `label` to be false.
    pub fn requires_absent(&self, label: &str) -> bool {
        self.preconditions.iter().any(|clause| {
            clause
                .single()
                .is_some_and(|l| l.negated && l.terms.is_empty() && l.label == label)
        })
    }

    /// Whether the rule fires on every grounding, skipping the probability gate.
    pub fn is_certain(&self) -> bool {
        self.probability >= 1.0
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.id)
    }
}
