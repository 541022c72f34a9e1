//! Label selectors used by label scoped step overrides

use crate::core::error::SelectorError;
use std::collections::BTreeMap;

/// Active label set
pub type Labels = BTreeMap<String, String>;

/// Decides whether a selector is satisfied by a label set
pub trait SelectorEvaluator: Send + Sync {
    fn matches(&self, selector: &str, labels: &Labels) -> Result<bool, SelectorError>;
}

/// One clause of a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    Absent(String),
}

impl Requirement {
    pub fn matches(&self, labels: &Labels) -> bool {
        match self {
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
            Requirement::NotEquals(key, value) => labels.get(key) != Some(value),
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::Absent(key) => !labels.contains_key(key),
        }
    }
}

/// Default selector language
///
/// Clauses are joined with `&&` or `,` and every clause must hold:
/// `env == prod`, `env = prod`, `env != dev`, `canary`, `!canary`.
/// An empty selector matches any label set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelSelector;

impl LabelSelector {
    pub fn parse(selector: &str) -> Result<Vec<Requirement>, SelectorError> {
        selector
            .split("&&")
            .flat_map(|part| part.split(','))
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(parse_clause)
            .collect()
    }
}

fn parse_clause(clause: &str) -> Result<Requirement, SelectorError> {
    let invalid = || SelectorError::InvalidClause(clause.to_string());

    if let Some((key, value)) = clause.split_once("!=") {
        let key = key_part(key).ok_or_else(invalid)?;
        let value = value_part(value).ok_or_else(invalid)?;
        return Ok(Requirement::NotEquals(key, value));
    }
    if let Some((key, value)) = clause.split_once("==").or_else(|| clause.split_once('=')) {
        let key = key_part(key).ok_or_else(invalid)?;
        let value = value_part(value).ok_or_else(invalid)?;
        return Ok(Requirement::Equals(key, value));
    }
    if let Some(key) = clause.strip_prefix('!') {
        return Ok(Requirement::Absent(key_part(key).ok_or_else(invalid)?));
    }
    Ok(Requirement::Exists(key_part(clause).ok_or_else(invalid)?))
}

fn key_part(raw: &str) -> Option<String> {
    let key = raw.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
    valid.then(|| key.to_string())
}

fn value_part(raw: &str) -> Option<String> {
    let value = raw.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return Some(value[1..value.len() - 1].to_string());
        }
    }
    if value.is_empty() || value.contains(char::is_whitespace) || value.contains('=') {
        return None;
    }
    Some(value.to_string())
}

impl SelectorEvaluator for LabelSelector {
    fn matches(&self, selector: &str, labels: &Labels) -> Result<bool, SelectorError> {
        let requirements = Self::parse(selector)?;
        Ok(requirements.iter().all(|r| r.matches(labels)))
    }
}
