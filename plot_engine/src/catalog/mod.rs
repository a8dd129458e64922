//! Rule catalog - parsing, validation and lookup of rule templates.

mod parser;
mod rule;

pub use rule::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::CatalogError;

/// What a `*:Type` placeholder in a precondition ranges over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniversalScope {
    /// The rule's own required and optional roles of that type.
    #[default]
    RuleRoles,
    /// Every entity of that type in the world.
    World,
}

/// Options that change how rules text is compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    pub universal_scope: UniversalScope,
}

/// A validated set of rules, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_id: HashMap<String, usize>,
}

impl RuleCatalog {
    /// Parse rules text with default options.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        Self::parse_with(text, &CatalogOptions::default())
    }

    pub fn parse_with(text: &str, options: &CatalogOptions) -> Result<Self, CatalogError> {
        Self::from_rules(parser::parse_rules(text, options)?)
    }

    /// Read and parse a rules file.
    pub fn load(path: impl AsRef<Path>, options: &CatalogOptions) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse_with(&text, options)
    }

    /// Build a catalog from already-compiled rules, checking ids and response menus.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            if by_id.insert(rule.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateRule {
                    rule: rule.id.clone(),
                    line: rule.line,
                });
            }
        }

        for rule in &rules {
            for response in &rule.responses {
                let target = by_id
                    .get(&response.rule_id)
                    .map(|&i| &rules[i])
                    .ok_or_else(|| CatalogError::UnknownResponseRule {
                        rule: rule.id.clone(),
                        line: response.line,
                        target: response.rule_id.clone(),
                    })?;
                for (pinned, _) in &response.pins {
                    if !target.role(pinned).is_some_and(|r| r.is_bindable()) {
                        return Err(CatalogError::InvalidResponseTarget {
                            rule: rule.id.clone(),
                            line: response.line,
                            target: target.id.clone(),
                            role: pinned.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { rules, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rules that can fire on their own (not response-only).
    pub fn top_level(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| !r.response_only)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = RuleCatalog::parse(
            "$Ask\nroles:\n    A:Character\nresponses:\n    Answer(B=A)\n\n$Answer (response)\nroles:\n    B:Character\n",
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("Answer").is_some_and(|r| r.response_only));
        assert_eq!(catalog.top_level().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["Ask"]);
        assert!(catalog.get("Missing").is_none());
    }

    #[test]
    fn test_duplicate_rule() {
        let err = RuleCatalog::parse("$Walk\n\n$Walk\n").unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateRule {
                rule: "Walk".to_string(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_unknown_response_rule() {
        let err = RuleCatalog::parse("$Ask\nroles:\n    A:Character\nresponses:\n    Nope(B=A)\n").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownResponseRule { line: 5, ref target, .. } if target == "Nope"));
    }

    #[test]
    fn test_response_pins_must_name_bindable_roles() {
        let text = "$Ask\nroles:\n    A:Character\nresponses:\n    Answer(Everyone=A)\n\n$Answer (response)\nroles:\n    *Everyone:Character\n";
        let err = RuleCatalog::parse(text).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidResponseTarget { ref role, .. } if role == "Everyone"));

        let text = "$Ask\nroles:\n    A:Character\nresponses:\n    Answer(Missing=A)\n\n$Answer (response)\nroles:\n    B:Character\n";
        assert!(matches!(
            RuleCatalog::parse(text),
            Err(CatalogError::InvalidResponseTarget { .. })
        ));
    }

    #[test]
    fn test_response_source_must_be_bound() {
        let text = "$Ask\nroles:\n    *All:Character\nresponses:\n    Answer(B=All)\n\n$Answer (response)\nroles:\n    B:Character\n";
        assert!(matches!(
            RuleCatalog::parse(text),
            Err(CatalogError::InvalidResponseSource { line: 5, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuleCatalog::load("/definitely/not/here.rules", &CatalogOptions::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert_eq!(err.line(), None);
    }
}
