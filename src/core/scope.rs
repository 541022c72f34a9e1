//! Scope resolution - picks the override body that applies to a step
//!
//! Workspace scopes are checked before label scopes. Within each set the
//! entries are evaluated in declaration order up to the first match. Label
//! scopes are only consulted when no workspace scope matched.

use crate::core::context::{EvalContext, LABELS_VARIABLE, WORKSPACE_VARIABLE};
use crate::core::error::ScopeEvaluationError;
use crate::core::expr::{interpolate_str, render_scalar};
use crate::core::selector::{Labels, SelectorEvaluator};
use crate::core::step::{LabelScope, StepBody, WorkspaceScope};
use serde_yaml::Value;
use tracing::debug;

/// The scoping rule that selected an override
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScopeMatch<'a> {
    Workspace(&'a WorkspaceScope),
    Label(&'a LabelScope),
}

impl<'a> ScopeMatch<'a> {
    /// The override body to decode instead of the base body
    pub fn body(&self) -> &'a StepBody {
        match self {
            ScopeMatch::Workspace(scope) => &scope.step,
            ScopeMatch::Label(scope) => &scope.step,
        }
    }
}

/// Selects at most one override body for a step
pub struct ScopeResolver<'e> {
    selector: &'e dyn SelectorEvaluator,
}

impl<'e> ScopeResolver<'e> {
    pub fn new(selector: &'e dyn SelectorEvaluator) -> Self {
        Self { selector }
    }

    /// Find the override that applies under `ctx`, if any
    pub fn resolve<'s>(
        &self,
        ctx: &EvalContext,
        workspace_scoped: &'s [WorkspaceScope],
        label_scoped: &'s [LabelScope],
    ) -> Result<Option<ScopeMatch<'s>>, ScopeEvaluationError> {
        if workspace_scoped.is_empty() && label_scoped.is_empty() {
            return Ok(None);
        }

        let workspace = active_workspace(ctx)?;
        if let Some(scope) = self.match_workspace(ctx, workspace.as_deref(), workspace_scoped)? {
            debug!("Workspace scope '{}' matched", scope.name);
            return Ok(Some(ScopeMatch::Workspace(scope)));
        }

        let labels = active_labels(ctx)?;
        if let Some(scope) = self.match_label(ctx, &labels, label_scoped)? {
            debug!("Label scope '{}' matched", scope.selector);
            return Ok(Some(ScopeMatch::Label(scope)));
        }

        Ok(None)
    }

    fn match_workspace<'s>(
        &self,
        ctx: &EvalContext,
        active: Option<&str>,
        scopes: &'s [WorkspaceScope],
    ) -> Result<Option<&'s WorkspaceScope>, ScopeEvaluationError> {
        for scope in scopes {
            let name = interpolate_str(&scope.name, ctx)
                .and_then(|value| render_scalar(&value))
                .map_err(|source| ScopeEvaluationError::Workspace {
                    name: scope.name.clone(),
                    source,
                })?;
            if active == Some(name.as_str()) {
                return Ok(Some(scope));
            }
        }
        Ok(None)
    }

    fn match_label<'s>(
        &self,
        ctx: &EvalContext,
        active: &Labels,
        scopes: &'s [LabelScope],
    ) -> Result<Option<&'s LabelScope>, ScopeEvaluationError> {
        for scope in scopes {
            let selector = interpolate_str(&scope.selector, ctx)
                .and_then(|value| render_scalar(&value))
                .map_err(|source| ScopeEvaluationError::LabelExpression {
                    selector: scope.selector.clone(),
                    source,
                })?;
            let matched = self.selector.matches(&selector, active).map_err(|source| {
                ScopeEvaluationError::LabelSelector {
                    selector: scope.selector.clone(),
                    source,
                }
            })?;
            if matched {
                return Ok(Some(scope));
            }
        }
        Ok(None)
    }
}

/// Active workspace name: a string, or a mapping with a `name` key
pub fn active_workspace(ctx: &EvalContext) -> Result<Option<String>, ScopeEvaluationError> {
    let invalid = || ScopeEvaluationError::ContextVariable {
        name: WORKSPACE_VARIABLE.to_string(),
        expected: "a string or a mapping with a string 'name'",
    };

    match ctx.variable(WORKSPACE_VARIABLE) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(Value::Mapping(map)) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|name| Some(name.to_string()))
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

/// Active labels: a mapping of scalar values
pub fn active_labels(ctx: &EvalContext) -> Result<Labels, ScopeEvaluationError> {
    let invalid = || ScopeEvaluationError::ContextVariable {
        name: LABELS_VARIABLE.to_string(),
        expected: "a mapping of scalar values",
    };

    match ctx.variable(LABELS_VARIABLE) {
        None | Some(Value::Null) => Ok(Labels::new()),
        Some(Value::Mapping(map)) => {
            let mut labels = Labels::new();
            for (key, value) in map {
                let key = key.as_str().ok_or_else(invalid)?;
                if matches!(value, Value::Mapping(_) | Value::Sequence(_)) {
                    return Err(invalid());
                }
                let value = render_scalar(value).map_err(|_| invalid())?;
                labels.insert(key.to_string(), value);
            }
            Ok(labels)
        }
        Some(_) => Err(invalid()),
    }
}
