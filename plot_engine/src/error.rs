//! Error types for catalog loading, rule application and configuration.

use mystery_world::WorldError;
use thiserror::Error;

/// A fatal problem found while loading a rule catalog.
///
/// Every variant names the offending rule (when one has been opened) and the
/// 1-based line of the rules text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("could not read rules from {path}: {message}")]
    Io { path: String, message: String },

    #[error("{}line {line}: {message}", rule_prefix(.rule))]
    Syntax {
        rule: Option<String>,
        line: usize,
        message: String,
    },

    #[error("rule `${rule}` (line {line}): undeclared role `{role}`")]
    UndeclaredRole { rule: String, line: usize, role: String },

    #[error("rule `${rule}` (line {line}): `This` is reserved for the occurrence itself and cannot be declared as a role")]
    ReservedRole { rule: String, line: usize },

    #[error("rule `${rule}` (line {line}): role `{role}` is declared more than once")]
    DuplicateRole { rule: String, line: usize, role: String },

    #[error("rule `${rule}` (line {line}): unknown entity type `{type_name}`")]
    UnknownType {
        rule: String,
        line: usize,
        type_name: String,
    },

    #[error("rule `${rule}` (line {line}): constructed role `{role}` does not exist until effects and cannot appear in preconditions")]
    ConstructedInPrecondition { rule: String, line: usize, role: String },

    #[error("rule `${rule}` (line {line}): universal role `{role}` can only appear in preconditions")]
    UniversalOutsidePrecondition { rule: String, line: usize, role: String },

    #[error("rule `${rule}` (line {line}): probability `{value}` must be a number in (0, 1]")]
    InvalidProbability { rule: String, line: usize, value: String },

    #[error("rule `${rule}` (line {line}) is defined more than once")]
    DuplicateRule { rule: String, line: usize },

    #[error("rule `${rule}` (line {line}): response refers to undefined rule `${target}`")]
    UnknownResponseRule { rule: String, line: usize, target: String },

    #[error("rule `${rule}` (line {line}): response `${target}` pins `{role}`, which is not a required or optional role of `${target}`")]
    InvalidResponseTarget {
        rule: String,
        line: usize,
        target: String,
        role: String,
    },

    #[error("rule `${rule}` (line {line}): response `${target}` pins from `{role}`, which `${rule}` does not bind")]
    InvalidResponseSource {
        rule: String,
        line: usize,
        target: String,
        role: String,
    },
}

fn rule_prefix(rule: &Option<String>) -> String {
    match rule {
        Some(rule) => format!("rule `${}` ", rule),
        None => String::new(),
    }
}

impl CatalogError {
    /// Line of the rules text the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            CatalogError::Io { .. } => None,
            CatalogError::Syntax { line, .. }
            | CatalogError::UndeclaredRole { line, .. }
            | CatalogError::ReservedRole { line, .. }
            | CatalogError::DuplicateRole { line, .. }
            | CatalogError::UnknownType { line, .. }
            | CatalogError::ConstructedInPrecondition { line, .. }
            | CatalogError::UniversalOutsidePrecondition { line, .. }
            | CatalogError::InvalidProbability { line, .. }
            | CatalogError::DuplicateRule { line, .. }
            | CatalogError::UnknownResponseRule { line, .. }
            | CatalogError::InvalidResponseTarget { line, .. }
            | CatalogError::InvalidResponseSource { line, .. } => Some(*line),
        }
    }

    /// The rule the error belongs to, if any.
    pub fn rule(&self) -> Option<&str> {
        match self {
            CatalogError::Io { .. } => None,
            CatalogError::Syntax { rule, .. } => rule.as_deref(),
            CatalogError::UndeclaredRole { rule, .. }
            | CatalogError::ReservedRole { rule, .. }
            | CatalogError::DuplicateRole { rule, .. }
            | CatalogError::UnknownType { rule, .. }
            | CatalogError::ConstructedInPrecondition { rule, .. }
            | CatalogError::UniversalOutsidePrecondition { rule, .. }
            | CatalogError::InvalidProbability { rule, .. }
            | CatalogError::DuplicateRule { rule, .. }
            | CatalogError::UnknownResponseRule { rule, .. }
            | CatalogError::InvalidResponseTarget { rule, .. }
            | CatalogError::InvalidResponseSource { rule, .. } => Some(rule),
        }
    }
}

/// A failure while applying a rule to the world.
///
/// Application is transactional: when one of these is returned, neither the
/// fact store nor the entity registry has changed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("rule `${rule}`: constructing `{role}` needs `{missing}`, which is not bound")]
    UnresolvedRole {
        rule: String,
        role: String,
        missing: String,
    },

    #[error("no rule named `${0}`")]
    UnknownRule(String),

    #[error("rule `${rule}` has no required or optional role `{role}`")]
    UnknownRole { rule: String, role: String },

    #[error("rule `${0}` has no valid grounding for the requested roles")]
    NotApplicable(String),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// A failure while loading a [`SimulationConfig`](crate::SimulationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}
