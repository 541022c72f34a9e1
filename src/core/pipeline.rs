//! Pipeline domain model

use crate::core::{
    config::{Config, PipelineDefinition, PipelineFields},
    context::EvalContext,
    decode::{decode_step, extract_labels},
    error::ResolveError,
    scope::ScopeResolver,
    selector::Labels,
    step::{RawStep, Step, StepBody},
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Reference to a pipeline by id, for callers that do not need the
/// decoded pipeline itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRef {
    pub id: String,
}

/// A pipeline decoded from the configuration
///
/// Steps stay raw until [`Pipeline::steps`] is called, since the effective
/// body of each step depends on the context supplied at that point.
#[derive(Debug, Clone)]
pub struct Pipeline<'c> {
    /// Pipeline identifier
    pub id: String,

    /// Display name
    pub name: Option<String>,

    /// Free-form description
    pub description: Option<String>,

    raw_steps: &'c [RawStep],
    ctx: EvalContext,
    config: &'c Config,
}

impl<'c> Pipeline<'c> {
    pub(crate) fn new(
        raw: &'c PipelineDefinition,
        fields: PipelineFields,
        ctx: EvalContext,
        config: &'c Config,
    ) -> Self {
        Pipeline {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: fields.description,
            raw_steps: &raw.steps,
            ctx,
            config,
        }
    }

    /// Reference to this pipeline
    pub fn reference(&self) -> PipelineRef {
        PipelineRef {
            id: self.id.clone(),
        }
    }

    /// Raw steps in declaration order
    pub fn raw_steps(&self) -> &'c [RawStep] {
        self.raw_steps
    }

    /// Context this pipeline was looked up with
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// Registry this pipeline came from
    pub fn config(&self) -> &'c Config {
        self.config
    }

    /// Decode every step under `ctx`, applying scope overrides
    ///
    /// Stops at the first step that fails; no partial list is returned.
    pub fn steps(&self, ctx: Option<&EvalContext>) -> Result<Vec<Step>, ResolveError> {
        let ctx = EvalContext::append(&self.ctx, ctx);

        let mut steps = Vec::with_capacity(self.raw_steps.len());
        for (index, raw) in self.raw_steps.iter().enumerate() {
            let body = self.effective_body(index, raw, &ctx)?;
            let step = decode_step(&self.step_target(index, raw), &body.body, &ctx)?;
            steps.push(step);
        }

        Ok(steps)
    }

    /// Capability type of every step, after scope overrides
    ///
    /// Only the `use` reference is read, the step bodies are not decoded.
    pub fn step_capability_refs(&self, ctx: Option<&EvalContext>) -> Result<Vec<String>, ResolveError> {
        let ctx = EvalContext::append(&self.ctx, ctx);

        self.raw_steps
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                self.effective_body(index, raw, &ctx)
                    .map(|body| body.use_.type_.clone())
            })
            .collect()
    }

    /// Labels declared on every step's base body
    pub fn step_labels(&self, ctx: Option<&EvalContext>) -> Result<Vec<Labels>, ResolveError> {
        let ctx = EvalContext::append(&self.ctx, ctx);

        self.raw_steps
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                extract_labels(raw.body(), &ctx).map_err(|diagnostics| {
                    ResolveError::decode(
                        format!("labels of {}", self.step_target(index, raw)),
                        diagnostics,
                    )
                })
            })
            .collect()
    }

    fn effective_body<'s>(
        &self,
        index: usize,
        raw: &'s RawStep,
        ctx: &EvalContext,
    ) -> Result<&'s StepBody, ResolveError> {
        let resolver = ScopeResolver::new(self.config.selector());
        let matched = resolver
            .resolve(ctx, &raw.workspace_scoped, &raw.label_scoped)
            .map_err(|source| ResolveError::ScopeEvaluation {
                step: index,
                source,
            })?;

        Ok(matched.map(|m| m.body()).unwrap_or(&raw.base))
    }

    fn step_target(&self, index: usize, raw: &RawStep) -> String {
        match raw.body().get("name").and_then(Value::as_str) {
            Some(name) => format!("pipeline '{}' step {} ('{}')", self.id, index, name),
            None => format!("pipeline '{}' step {}", self.id, index),
        }
    }
}
