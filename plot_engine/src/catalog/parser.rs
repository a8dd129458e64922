//! Line-structured rules text to [`Rule`] templates.
//!
//! Parsing happens in two passes. The first splits the text into raw records
//! (header, title, probability and section lines); the second compiles each
//! record, resolving role references and expanding `*:Type` placeholders.

use std::str::FromStr;

use mystery_world::{EntityType, SLOT};

use super::rule::{
    Clause, ConstructionExpr, Effect, ExprPart, Literal, ResponseSpec, RoleKind, RoleSpec, Rule, Term, THIS,
};
use super::{CatalogOptions, UniversalScope};
use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Roles,
    Preconditions,
    Effects,
    Responses,
}

#[derive(Debug)]
struct RawRule {
    id: String,
    line: usize,
    response_only: bool,
    debug: bool,
    title: Option<(usize, String)>,
    probability: Option<(usize, String)>,
    roles: Vec<(usize, String)>,
    preconditions: Vec<(usize, String)>,
    effects: Vec<(usize, String)>,
    responses: Vec<(usize, String)>,
}

impl RawRule {
    fn lines_mut(&mut self, section: Section) -> &mut Vec<(usize, String)> {
        match section {
            Section::Roles => &mut self.roles,
            Section::Preconditions => &mut self.preconditions,
            Section::Effects => &mut self.effects,
            Section::Responses => &mut self.responses,
        }
    }
}

/// Parse every rule in `text`. Cross-rule checks are left to the catalog.
pub(crate) fn parse_rules(text: &str, options: &CatalogOptions) -> Result<Vec<Rule>, CatalogError> {
    split_records(text)?
        .into_iter()
        .map(|raw| RuleCompiler::new(raw.id.clone(), options.universal_scope).compile(raw))
        .collect()
}

fn syntax(rule: Option<&str>, line: usize, message: impl Into<String>) -> CatalogError {
    CatalogError::Syntax {
        rule: rule.map(str::to_string),
        line,
        message: message.into(),
    }
}

fn strip_comment(text: &str) -> &str {
    match text.find(';') {
        Some(at) => text[..at].trim_end(),
        None => text,
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_role_name(text: &str) -> bool {
    is_identifier(text) && text.starts_with(|c: char| c.is_ascii_uppercase())
}

fn split_records(text: &str) -> Result<Vec<RawRule>, CatalogError> {
    let mut records: Vec<RawRule> = Vec::new();
    let mut section = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('$') {
            records.push(parse_header(strip_comment(header), line)?);
            section = None;
            continue;
        }

        let Some(record) = records.last_mut() else {
            return Err(syntax(None, line, "expected a `$RuleName` header"));
        };

        if trimmed.starts_with('"') {
            if section.is_some() || record.title.is_some() {
                return Err(syntax(Some(&record.id), line, "the title must directly follow the rule header"));
            }
            if trimmed.len() < 2 || !trimmed.ends_with('"') {
                return Err(syntax(Some(&record.id), line, "unterminated title"));
            }
            record.title = Some((line, trimmed[1..trimmed.len() - 1].to_string()));
            continue;
        }

        let content = strip_comment(trimmed);
        if content.is_empty() {
            continue;
        }

        if let Some(value) = content.strip_prefix("prob:") {
            if record.probability.is_some() {
                return Err(syntax(Some(&record.id), line, "probability declared twice"));
            }
            record.probability = Some((line, value.trim().to_string()));
            continue;
        }

        let header = match content {
            "roles:" => Some(Section::Roles),
            "preconditions:" => Some(Section::Preconditions),
            "effects:" => Some(Section::Effects),
            "responses:" => Some(Section::Responses),
            _ => None,
        };
        if header.is_some() {
            section = header;
            continue;
        }

        match section {
            Some(section) => record.lines_mut(section).push((line, content.to_string())),
            None => {
                return Err(syntax(
                    Some(&record.id),
                    line,
                    format!("`{}` is outside of a `roles:`, `preconditions:`, `effects:` or `responses:` section", content),
                ))
            }
        }
    }

    Ok(records)
}

fn parse_header(header: &str, line: usize) -> Result<RawRule, CatalogError> {
    let mut words = header.split_whitespace();
    let id = words.next().unwrap_or_default();
    if !is_identifier(id) {
        return Err(syntax(None, line, format!("`${}` is not a valid rule name", id)));
    }

    let mut raw = RawRule {
        id: id.to_string(),
        line,
        response_only: false,
        debug: false,
        title: None,
        probability: None,
        roles: Vec::new(),
        preconditions: Vec::new(),
        effects: Vec::new(),
        responses: Vec::new(),
    };
    for marker in words {
        match marker {
            "(response)" => raw.response_only = true,
            "debug" => raw.debug = true,
            other => return Err(syntax(Some(id), line, format!("unknown rule marker `{}`", other))),
        }
    }
    Ok(raw)
}

/// Where a literal appears; decides which role kinds it may mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Precondition,
    /// The condition of an `if` effect.
    Condition,
    Effect,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    This,
    Role(String),
    Any(EntityType),
    Wildcard,
}

#[derive(Debug, Clone, Copy)]
enum Segment<'t> {
    Text(&'t str),
    Name(&'t str),
}

#[derive(Debug, Clone)]
struct RawLiteral {
    negated: bool,
    tokens: Vec<Token>,
}

impl RawLiteral {
    fn placeholders(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Any(ty) => Some(*ty),
            _ => None,
        })
    }
}

/// One way of filling the `*:Type` placeholders of a line.
type Assignment = Vec<(EntityType, usize)>;

struct RuleCompiler {
    id: String,
    scope: UniversalScope,
    roles: Vec<RoleSpec>,
}

impl RuleCompiler {
    fn new(id: String, scope: UniversalScope) -> Self {
        Self {
            id,
            scope,
            roles: Vec::new(),
        }
    }

    fn syntax(&self, line: usize, message: impl Into<String>) -> CatalogError {
        syntax(Some(&self.id), line, message)
    }

    fn compile(mut self, raw: RawRule) -> Result<Rule, CatalogError> {
        let mut constructed = Vec::new();
        for (line, text) in &raw.roles {
            if let Some(source) = self.declare_role(*line, text)? {
                constructed.push((self.roles.len() - 1, *line, source));
            }
        }
        for (index, line, source) in constructed {
            let expr = self.construction_expr(line, &source)?;
            self.roles[index].kind = RoleKind::Constructed(expr);
        }

        let title = match raw.title {
            Some((line, title)) => {
                self.check_title(line, &title)?;
                title
            }
            None => String::new(),
        };

        let probability = match raw.probability {
            Some((line, value)) => match value.parse::<f64>() {
                Ok(p) if p > 0.0 && p <= 1.0 => p,
                _ => {
                    return Err(CatalogError::InvalidProbability {
                        rule: self.id.clone(),
                        line,
                        value,
                    })
                }
            },
            None => 1.0,
        };

        let mut preconditions = Vec::new();
        for (line, text) in &raw.preconditions {
            preconditions.extend(self.precondition(*line, text)?);
        }

        let mut effects = Vec::new();
        for (line, text) in &raw.effects {
            effects.extend(self.effect(*line, text)?);
        }

        let responses = raw
            .responses
            .iter()
            .map(|(line, text)| self.response(*line, text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            id: raw.id,
            title,
            probability,
            response_only: raw.response_only,
            debug: raw.debug,
            roles: self.roles,
            preconditions,
            effects,
            responses,
            line: raw.line,
        })
    }

    /// Declare one role line; returns the expression source of a constructed role.
    fn declare_role(&mut self, line: usize, text: &str) -> Result<Option<String>, CatalogError> {
        let (marker, body) = match text.chars().next() {
            Some(c @ ('?' | '*' | '+')) => (Some(c), text[1..].trim_start()),
            _ => (None, text),
        };
        let (head, type_name) = body
            .rsplit_once(':')
            .ok_or_else(|| self.syntax(line, format!("expected `Name:Type`, found `{}`", text)))?;

        let (name, expr) = if marker == Some('+') {
            let (name, expr) = head
                .split_once('=')
                .ok_or_else(|| self.syntax(line, "constructed roles are written `+Name=Expression:Type`"))?;
            (name.trim(), Some(expr.trim().to_string()))
        } else {
            (head.trim(), None)
        };

        if name == THIS {
            return Err(CatalogError::ReservedRole {
                rule: self.id.clone(),
                line,
            });
        }
        if !is_role_name(name) {
            return Err(self.syntax(line, format!("role name `{}` must start with an uppercase letter", name)));
        }
        if self.roles.iter().any(|r| r.name == name) {
            return Err(CatalogError::DuplicateRole {
                rule: self.id.clone(),
                line,
                role: name.to_string(),
            });
        }
        let entity_type = self.entity_type(line, type_name.trim())?;

        let kind = match marker {
            Some('?') => RoleKind::Optional,
            Some('*') => RoleKind::Universal { include_bound: false },
            // Resolved once every role is declared.
            Some('+') => RoleKind::Constructed(ConstructionExpr {
                parts: Vec::new(),
                source: String::new(),
            }),
            _ => RoleKind::Required,
        };
        self.roles.push(RoleSpec {
            name: name.to_string(),
            entity_type,
            kind,
        });
        Ok(expr)
    }

    fn entity_type(&self, line: usize, name: &str) -> Result<EntityType, CatalogError> {
        EntityType::from_str(name).map_err(|_| CatalogError::UnknownType {
            rule: self.id.clone(),
            line,
            type_name: name.to_string(),
        })
    }

    /// Index of a role referenced from `place`, or This.
    fn term(&self, line: usize, name: &str, place: Place) -> Result<Term, CatalogError> {
        if name == THIS {
            return Ok(Term::This);
        }
        let index = self.roles.iter().position(|r| r.name == name).ok_or_else(|| CatalogError::UndeclaredRole {
            rule: self.id.clone(),
            line,
            role: name.to_string(),
        })?;
        let role = &self.roles[index];
        match place {
            Place::Precondition if role.is_constructed() => Err(CatalogError::ConstructedInPrecondition {
                rule: self.id.clone(),
                line,
                role: role.name.clone(),
            }),
            Place::Effect | Place::Condition if role.is_universal() => Err(CatalogError::UniversalOutsidePrecondition {
                rule: self.id.clone(),
                line,
                role: role.name.clone(),
            }),
            _ => Ok(Term::Role(index)),
        }
    }

    /// Split a template into text and `{Role}` placeholders.
    fn segments<'t>(&self, line: usize, template: &'t str) -> Result<Vec<Segment<'t>>, CatalogError> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                return Err(self.syntax(line, format!("unmatched `}}` in `{}`", template)));
            }
            if open > 0 {
                segments.push(Segment::Text(&rest[..open]));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| self.syntax(line, format!("unclosed `{{` in `{}`", template)))?;
            segments.push(Segment::Name(after[..close].trim()));
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(self.syntax(line, format!("unmatched `}}` in `{}`", template)));
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }
        Ok(segments)
    }

    fn construction_expr(&self, line: usize, source: &str) -> Result<ConstructionExpr, CatalogError> {
        if source.is_empty() {
            return Err(self.syntax(line, "constructed role has an empty expression"));
        }
        let parts = self
            .segments(line, source)?
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => Ok(ExprPart::Text(text.to_string())),
                Segment::Name(name) => self.term(line, name, Place::Effect).map(ExprPart::Name),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConstructionExpr {
            parts,
            source: source.to_string(),
        })
    }

    fn check_title(&self, line: usize, title: &str) -> Result<(), CatalogError> {
        for segment in self.segments(line, title)? {
            if let Segment::Name(name) = segment {
                self.term(line, name, Place::Effect)?;
            }
        }
        Ok(())
    }

    fn token(&self, line: usize, word: &str) -> Result<Token, CatalogError> {
        if let Some(type_name) = word.strip_prefix("*:") {
            return Ok(Token::Any(self.entity_type(line, type_name)?));
        }
        if word == "*" {
            return Ok(Token::Wildcard);
        }
        if word.starts_with('*') {
            return Err(self.syntax(line, format!("`{}`: placeholders are written `*:Type`", word)));
        }
        if word == THIS {
            return Ok(Token::This);
        }
        if word.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Ok(Token::Role(word.to_string()));
        }
        Ok(Token::Word(word.to_string()))
    }

    /// `(words)` or `!(words)`.
    fn raw_literal(&self, line: usize, text: &str) -> Result<RawLiteral, CatalogError> {
        let (negated, body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, text),
        };
        let inner = body
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .ok_or_else(|| self.syntax(line, format!("expected `(literal)` or `!(literal)`, found `{}`", text)))?;
        if inner.contains(&['(', ')'][..]) {
            return Err(self.syntax(line, format!("nested parentheses in `{}`", text)));
        }
        let tokens = inner
            .split_whitespace()
            .map(|w| self.token(line, w))
            .collect::<Result<Vec<_>, _>>()?;
        if tokens.is_empty() {
            return Err(self.syntax(line, "empty literal"));
        }
        Ok(RawLiteral { negated, tokens })
    }

    fn check_balanced(&self, line: usize, text: &str) -> Result<(), CatalogError> {
        let mut depth = 0i32;
        for c in text.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                break;
            }
        }
        if depth != 0 {
            return Err(self.syntax(line, format!("unbalanced parentheses in `{}`", text)));
        }
        Ok(())
    }

    fn alternatives(&self, line: usize, text: &str) -> Result<Vec<RawLiteral>, CatalogError> {
        split_top_level(text, '/')
            .into_iter()
            .map(|alt| self.raw_literal(line, alt))
            .collect()
    }

    /// Every way of filling the placeholders found in `literals`.
    fn assignments(&mut self, literals: &[&RawLiteral], place: Place) -> Vec<Assignment> {
        let mut types: Vec<EntityType> = Vec::new();
        for ty in literals.iter().flat_map(|l| l.placeholders()) {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }

        let mut assignments: Vec<Assignment> = vec![Vec::new()];
        for ty in types {
            let choices: Vec<usize> = if place == Place::Precondition && self.scope == UniversalScope::World {
                vec![self.anonymous_universal(ty)]
            } else {
                self.roles
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| {
                        r.entity_type == ty && (r.is_bindable() || (place == Place::Effect && r.is_constructed()))
                    })
                    .map(|(i, _)| i)
                    .collect()
            };
            assignments = assignments
                .into_iter()
                .flat_map(|partial| {
                    choices.iter().map(move |&choice| {
                        let mut next = partial.clone();
                        next.push((ty, choice));
                        next
                    })
                })
                .collect();
        }
        assignments
    }

    fn anonymous_universal(&mut self, ty: EntityType) -> usize {
        let name = format!("*:{}", ty);
        if let Some(index) = self.roles.iter().position(|r| r.name == name) {
            return index;
        }
        self.roles.push(RoleSpec {
            name,
            entity_type: ty,
            kind: RoleKind::Universal { include_bound: true },
        });
        self.roles.len() - 1
    }

    fn literal(
        &self,
        line: usize,
        raw: &RawLiteral,
        assignment: &Assignment,
        place: Place,
    ) -> Result<Literal, CatalogError> {
        let mut words = Vec::with_capacity(raw.tokens.len());
        let mut terms = Vec::new();
        for token in &raw.tokens {
            let term = match token {
                Token::Word(word) => {
                    words.push(word.as_str());
                    continue;
                }
                Token::This => Term::This,
                Token::Role(name) => self.term(line, name, place)?,
                Token::Any(ty) => match assignment.iter().find(|(t, _)| t == ty) {
                    Some((_, index)) => Term::Role(*index),
                    None => return Err(self.syntax(line, format!("no role to stand in for `*:{}`", ty))),
                },
                Token::Wildcard if place == Place::Effect => {
                    return Err(self.syntax(line, "`*` can only be used in a condition"));
                }
                Token::Wildcard => Term::Any,
            };
            words.push(SLOT);
            terms.push(term);
        }
        Ok(Literal {
            label: words.join(" "),
            terms,
            negated: raw.negated,
        })
    }

    fn source(&self, text: &str, assignment: &Assignment) -> String {
        assignment.iter().fold(text.to_string(), |acc, (ty, index)| {
            acc.replace(&format!("*:{}", ty), &self.roles[*index].name)
        })
    }

    fn clause(
        &self,
        line: usize,
        text: &str,
        alternatives: &[RawLiteral],
        assignment: &Assignment,
        place: Place,
    ) -> Result<Clause, CatalogError> {
        Ok(Clause {
            alternatives: alternatives
                .iter()
                .map(|raw| self.literal(line, raw, assignment, place))
                .collect::<Result<_, _>>()?,
            source: self.source(text, assignment),
        })
    }

    /// One precondition line; expands to zero or more clauses.
    fn precondition(&mut self, line: usize, text: &str) -> Result<Vec<Clause>, CatalogError> {
        self.check_balanced(line, text)?;
        let alternatives = self.alternatives(line, text)?;
        let refs: Vec<_> = alternatives.iter().collect();
        self.assignments(&refs, Place::Precondition)
            .iter()
            .map(|assignment| self.clause(line, text, &alternatives, assignment, Place::Precondition))
            .collect()
    }

    fn branch(&self, line: usize, text: &str) -> Result<Option<RawLiteral>, CatalogError> {
        let inner = text.strip_prefix('(').and_then(|t| t.strip_suffix(')'));
        if inner.is_some_and(|i| i.trim().is_empty()) {
            return Ok(None);
        }
        if split_top_level(text, '/').len() > 1 {
            return Err(self.syntax(line, "a disjunction can only be used as a condition"));
        }
        self.raw_literal(line, text).map(Some)
    }

    /// One effect line; expands to zero or more effects.
    fn effect(&mut self, line: usize, text: &str) -> Result<Vec<Effect>, CatalogError> {
        self.check_balanced(line, text)?;

        let Some((then_text, rest)) = split_keyword(text, "if") else {
            let Some(raw) = self.branch(line, text)? else {
                return Ok(Vec::new());
            };
            return self
                .assignments(&[&raw], Place::Effect)
                .iter()
                .map(|assignment| Ok(Effect::Fact(self.literal(line, &raw, assignment, Place::Effect)?)))
                .collect();
        };

        let (condition_text, else_text) = match split_keyword(rest, "else") {
            Some((condition, otherwise)) => (condition, Some(otherwise)),
            None => (rest, None),
        };
        let then = self.branch(line, then_text)?;
        let otherwise = match else_text {
            Some(text) => self.branch(line, text)?,
            None => None,
        };
        let condition = self.alternatives(line, condition_text)?;

        let mut used: Vec<&RawLiteral> = condition.iter().collect();
        used.extend(then.iter());
        used.extend(otherwise.iter());

        self.assignments(&used, Place::Effect)
            .iter()
            .map(|assignment| {
                let resolve = |raw: &Option<RawLiteral>| {
                    raw.as_ref()
                        .map(|r| self.literal(line, r, assignment, Place::Effect))
                        .transpose()
                };
                Ok(Effect::Conditional {
                    condition: self.clause(line, condition_text, &condition, assignment, Place::Condition)?,
                    then: resolve(&then)?,
                    otherwise: resolve(&otherwise)?,
                })
            })
            .collect()
    }

    /// `Rule(Target=Source, ...)`.
    fn response(&self, line: usize, text: &str) -> Result<ResponseSpec, CatalogError> {
        let (name, args) = match text.find('(') {
            Some(open) => {
                let args = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| self.syntax(line, format!("expected `)` at the end of `{}`", text)))?;
                (text[..open].trim(), args)
            }
            None => (text, ""),
        };
        if !is_identifier(name) {
            return Err(self.syntax(line, format!("`{}` is not a valid rule name", name)));
        }

        let mut pins: Vec<(String, String)> = Vec::new();
        for pair in args.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (target, source) = pair
                .split_once('=')
                .ok_or_else(|| self.syntax(line, format!("expected `Role=Role`, found `{}`", pair)))?;
            let (target, source) = (target.trim(), source.trim());
            if pins.iter().any(|(t, _)| t == target) {
                return Err(self.syntax(line, format!("`{}` is pinned more than once", target)));
            }
            if source != THIS {
                let role = self.roles.iter().find(|r| r.name == source).ok_or_else(|| {
                    CatalogError::UndeclaredRole {
                        rule: self.id.clone(),
                        line,
                        role: source.to_string(),
                    }
                })?;
                if role.is_universal() {
                    return Err(CatalogError::InvalidResponseSource {
                        rule: self.id.clone(),
                        line,
                        target: name.to_string(),
                        role: source.to_string(),
                    });
                }
            }
            pins.push((target.to_string(), source.to_string()));
        }

        Ok(ResponseSpec {
            rule_id: name.to_string(),
            pins,
            line,
        })
    }
}

/// Split at every `separator` outside parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Split around the first standalone `keyword` outside parentheses.
fn split_keyword<'t>(text: &'t str, keyword: &str) -> Option<(&'t str, &'t str)> {
    let bounded = |c: Option<char>| c.map_or(true, |c| c.is_whitespace() || c == '(' || c == ')');
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && text[i..].starts_with(keyword) => {
                let end = i + keyword.len();
                if bounded(text[..i].chars().next_back()) && bounded(text[end..].chars().next()) {
                    return Some((text[..i].trim(), text[end..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Rule>, CatalogError> {
        parse_rules(text, &CatalogOptions::default())
    }

    const MURDER: &str = r#"
# comment
$Murder debug
"{Murderer} murders {Victim}"
prob:0.2                 ; rare
roles:
    Murderer:Character
    Victim:Character
    ?Witness:Character
    +Body={Victim}'s body:Prop
preconditions:
    !(murder has happened)
    (Murderer is upset at Victim) / (Murderer hates Victim)
    (Witness is alive)
effects:
    !(Victim is alive)
    (Body is the deceased)
    (This is a crime)
responses:
    CallsDetective(Caller=Witness)
"#;

    #[test]
    fn test_parse_full_rule() {
        let rules = parse(MURDER).unwrap();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.id, "Murder");
        assert_eq!(rule.line, 3);
        assert!(rule.debug);
        assert!(!rule.response_only);
        assert_eq!(rule.probability, 0.2);
        assert_eq!(rule.roles.len(), 4);
        assert!(rule.roles[2].is_optional());

        let RoleKind::Constructed(expr) = &rule.roles[3].kind else {
            panic!("Body should be constructed");
        };
        assert_eq!(
            expr.parts,
            vec![ExprPart::Name(Term::Role(1)), ExprPart::Text("'s body".to_string())]
        );

        assert_eq!(rule.preconditions.len(), 3);
        let motive = &rule.preconditions[1];
        assert_eq!(motive.alternatives.len(), 2);
        assert_eq!(motive.alternatives[0].label, "_ is upset at _");
        assert_eq!(motive.alternatives[1].terms, vec![Term::Role(0), Term::Role(1)]);
        assert!(rule.preconditions[0].alternatives[0].negated);
        assert!(rule.preconditions[0].alternatives[0].terms.is_empty());

        let Effect::Fact(crime) = &rule.effects[2] else {
            panic!("expected a plain effect");
        };
        assert_eq!(crime.label, "_ is a crime");
        assert_eq!(crime.terms, vec![Term::This]);

        assert_eq!(rule.responses[0].rule_id, "CallsDetective");
        assert_eq!(rule.responses[0].pins, vec![("Caller".to_string(), "Witness".to_string())]);
    }

    #[test]
    fn test_response_marker_and_default_probability() {
        let rules = parse("$Confess (response)\nroles:\n    Suspect:Character\neffects:\n    (Suspect confessed)\n").unwrap();
        assert!(rules[0].response_only);
        assert_eq!(rules[0].probability, 1.0);
        assert_eq!(rules[0].title, "");
    }

    #[test]
    fn test_placeholders_expand_over_rule_roles() {
        let text = "$Quarrel\nroles:\n    A:Character\n    B:Character\n    L:Location\npreconditions:\n    (*:Character is at L)\n";
        let rules = parse(text).unwrap();
        let clauses = &rules[0].preconditions;
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].source, "(A is at L)");
        assert_eq!(clauses[1].source, "(B is at L)");
        assert_eq!(rules[0].roles.len(), 3);
    }

    #[test]
    fn test_placeholders_become_universal_in_world_scope() {
        let text = "$Quarrel\nroles:\n    A:Character\n    L:Location\npreconditions:\n    (*:Character is at L)\n    (*:Character is alive)\n";
        let options = CatalogOptions {
            universal_scope: UniversalScope::World,
        };
        let rules = parse_rules(text, &options).unwrap();
        let rule = &rules[0];
        assert_eq!(rule.roles.len(), 3);
        assert_eq!(rule.roles[2].kind, RoleKind::Universal { include_bound: true });
        assert_eq!(rule.preconditions.len(), 2);
        assert_eq!(rule.preconditions[1].alternatives[0].terms, vec![Term::Role(2)]);
    }

    #[test]
    fn test_conditional_effect() {
        let text = "$Gossip\nroles:\n    A:Character\n    B:Character\neffects:\n    (A hates B) if (A is upset at B) else ()\n    () if (A hates B) else !(A likes B)\n";
        let rules = parse(text).unwrap();
        let Effect::Conditional { condition, then, otherwise } = &rules[0].effects[0] else {
            panic!("expected a conditional");
        };
        assert_eq!(condition.alternatives[0].label, "_ is upset at _");
        assert_eq!(then.as_ref().map(|l| l.label.as_str()), Some("_ hates _"));
        assert!(otherwise.is_none());

        let Effect::Conditional { then, otherwise, .. } = &rules[0].effects[1] else {
            panic!("expected a conditional");
        };
        assert!(then.is_none());
        assert!(otherwise.as_ref().is_some_and(|l| l.negated));
    }

    #[test]
    fn test_wildcard_term() {
        let text = "$Calm\nroles:\n    A:Character\npreconditions:\n    !(A is upset at *)\neffects:\n    (A is calm) if (* is upset at A)\n";
        let rules = parse(text).unwrap();
        let clause = rules[0].preconditions[0].single().unwrap();
        assert_eq!(clause.label, "_ is upset at _");
        assert_eq!(clause.terms, vec![Term::Role(0), Term::Any]);
        assert!(clause.negated);
        assert_eq!(rules[0].preconditions[0].roles().into_iter().collect::<Vec<_>>(), vec![0]);

        let Effect::Conditional { condition, .. } = &rules[0].effects[0] else {
            panic!("expected a conditional");
        };
        assert_eq!(condition.alternatives[0].terms, vec![Term::Any, Term::Role(0)]);

        let err = parse("$Bad\nroles:\n    A:Character\neffects:\n    (A is upset at *)\n").unwrap_err();
        assert!(matches!(err, CatalogError::Syntax { line: 5, .. }));
        assert!(parse("$Bad\nroles:\n    A:Character\npreconditions:\n    (A is upset at *B)\n").is_err());
    }

    #[test]
    fn test_undeclared_role_names_rule_and_line() {
        let err = parse("$Move\nroles:\n    A:Character\npreconditions:\n    (A is at Somewhere)\n").unwrap_err();
        assert_eq!(
            err,
            CatalogError::UndeclaredRole {
                rule: "Move".to_string(),
                line: 5,
                role: "Somewhere".to_string(),
            }
        );
    }

    #[test]
    fn test_reserved_this() {
        let err = parse("$Bad\nroles:\n    This:Event\n").unwrap_err();
        assert!(matches!(err, CatalogError::ReservedRole { line: 3, .. }));
    }

    #[test]
    fn test_constructed_in_precondition() {
        let err = parse("$Bad\nroles:\n    V:Character\n    +B={V}'s body:Prop\npreconditions:\n    (B is at home)\n").unwrap_err();
        assert!(matches!(err, CatalogError::ConstructedInPrecondition { line: 6, .. }));
    }

    #[test]
    fn test_universal_in_effect() {
        let err = parse("$Bad\nroles:\n    *Everyone:Character\neffects:\n    (Everyone is sad)\n").unwrap_err();
        assert!(matches!(err, CatalogError::UniversalOutsidePrecondition { line: 5, .. }));
    }

    #[test]
    fn test_unknown_type_and_bad_probability() {
        let err = parse("$Bad\nroles:\n    A:Dragon\n").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownType { ref type_name, .. } if type_name == "Dragon"));

        for value in ["0", "1.5", "often", "NaN"] {
            let err = parse(&format!("$Bad\nprob:{}\n", value)).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidProbability { line: 2, .. }), "{}", value);
        }
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            "roles:\n",
            "$Bad\n    (A is here)\n",
            "$Bad\nroles:\n    lower:Character\n",
            "$Bad\nroles:\n    A:Character\npreconditions:\n    (A is (here)\n",
            "$Bad\n\"{A} says hi\n",
            "$Bad\nroles:\n    A:Character\n    A:Character\n",
            "$Bad odd\n",
        ];
        for text in cases {
            assert!(parse(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_title_placeholders_are_checked() {
        let err = parse("$Bad\n\"{Nobody} waves\"\nroles:\n    A:Character\n").unwrap_err();
        assert!(matches!(err, CatalogError::UndeclaredRole { line: 2, .. }));
        assert!(parse("$Ok\n\"{A} waves at {This}\"\nroles:\n    A:Character\n").is_ok());
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(split_top_level("(a / b) / !(c)", '/'), vec!["(a / b)", "!(c)"]);
        assert_eq!(
            split_keyword("(A hates B) if (A is upset at B) else ()", "if"),
            Some(("(A hates B)", "(A is upset at B) else ()"))
        );
        assert_eq!(split_keyword("(A is iffy)", "if"), None);
    }
}
