//! Pipeline configuration from YAML
//!
//! Loading performs only the shape pass: pipelines are split into ids,
//! names, raw steps and scoping rules. Everything that depends on the
//! evaluation context is decoded later, on lookup.

use crate::core::context::EvalContext;
use crate::core::decode::decode_body;
use crate::core::error::ResolveError;
use crate::core::functions::with_standard_functions;
use crate::core::pipeline::Pipeline;
use crate::core::selector::{LabelSelector, SelectorEvaluator};
use crate::core::step::RawStep;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A pipeline as declared in the document (shape form)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct PipelineDefinition {
    /// Unique pipeline identifier
    pub id: String,

    /// Optional display name
    pub name: Option<String>,

    /// Steps in declaration order
    pub steps: Vec<RawStep>,

    /// Remaining top-level keys, decoded on lookup
    pub remain: Mapping,
}

impl TryFrom<Mapping> for PipelineDefinition {
    type Error = String;

    fn try_from(mut body: Mapping) -> std::result::Result<Self, Self::Error> {
        let id = match body.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(_) => return Err("pipeline 'id' must be a non-empty string".to_string()),
            None => return Err("pipeline is missing 'id'".to_string()),
        };
        let name = match body.remove("name") {
            Some(Value::String(name)) => Some(name),
            Some(Value::Null) | None => None,
            Some(_) => return Err(format!("pipeline '{}': 'name' must be a string", id)),
        };
        let steps = match body.remove("steps") {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_yaml::from_value(value)
                .map_err(|e| format!("pipeline '{}': invalid steps: {}", id, e))?,
        };

        Ok(PipelineDefinition {
            id,
            name,
            steps,
            remain: body,
        })
    }
}

/// Top-level document layout
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    /// Variables available to every expression
    #[serde(default)]
    variables: Mapping,

    #[serde(default)]
    pipelines: Vec<PipelineDefinition>,
}

/// Fields of a pipeline decoded during lookup
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PipelineFields {
    #[serde(default)]
    pub description: Option<String>,
}

/// Registry of declared pipelines
///
/// The registry is read-only after construction. Lookups compose a fresh
/// context per call, so one registry can serve many threads.
#[derive(Clone)]
pub struct Config {
    pipelines: Vec<PipelineDefinition>,
    ctx: EvalContext,
    selector: Arc<dyn SelectorEvaluator>,
}

impl Config {
    /// Build a registry from already parsed pipelines and a base context
    pub fn new(pipelines: Vec<PipelineDefinition>, ctx: EvalContext) -> Self {
        Self {
            pipelines,
            ctx,
            selector: Arc::new(LabelSelector),
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: Document =
            serde_yaml::from_str(yaml).context("Invalid pipeline configuration")?;

        let ctx = with_standard_functions(EvalContext::new()).with_variables(&document.variables);
        let config = Self::new(document.pipelines, ctx);
        config.validate();

        debug!("Loaded {} pipeline(s)", config.pipelines.len());
        Ok(config)
    }

    /// Report suspicious but tolerated declarations
    fn validate(&self) {
        let mut seen = HashSet::new();
        for pipeline in &self.pipelines {
            if !seen.insert(pipeline.id.as_str()) {
                warn!(
                    "Duplicate pipeline id '{}': lookups resolve to the first declaration",
                    pipeline.id
                );
            }
        }
    }

    /// Replace the label selector evaluator
    pub fn with_selector_evaluator<S: SelectorEvaluator + 'static>(mut self, selector: S) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Base context every lookup starts from
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn selector(&self) -> &dyn SelectorEvaluator {
        self.selector.as_ref()
    }

    /// Raw pipeline declarations
    pub fn definitions(&self) -> &[PipelineDefinition] {
        &self.pipelines
    }

    /// Ids of all declared pipelines, in declaration order
    pub fn list_ids(&self) -> Vec<String> {
        self.pipelines.iter().map(|p| p.id.clone()).collect()
    }

    /// Look up and decode the pipeline `id`
    ///
    /// Returns `Ok(None)` when no pipeline has that id. A pipeline that
    /// exists but cannot be decoded is an error.
    pub fn lookup(
        &self,
        id: &str,
        ctx: Option<&EvalContext>,
    ) -> std::result::Result<Option<Pipeline<'_>>, ResolveError> {
        let ctx = EvalContext::append(&self.ctx, ctx);

        let Some(raw) = self.pipelines.iter().find(|p| p.id == id) else {
            debug!("Pipeline '{}' not found", id);
            return Ok(None);
        };

        let fields: PipelineFields = decode_body(&raw.remain, &ctx)
            .map_err(|diagnostics| ResolveError::decode(format!("pipeline '{}'", id), diagnostics))?;

        Ok(Some(Pipeline::new(raw, fields, ctx, self)))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("pipelines", &self.list_ids())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
