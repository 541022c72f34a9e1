//! CLI command definitions

use crate::core::EvalContext;
use clap::Args;

/// List declared pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Resolve every pipeline under the given scope
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Resolve the steps of one pipeline
#[derive(Debug, Args, Clone)]
pub struct ResolveCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Pipeline id
    #[arg(long)]
    pub id: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Evaluation scope supplied on the command line
#[derive(Debug, Args, Clone, Default)]
pub struct ScopeArgs {
    /// Active workspace
    #[arg(long)]
    pub workspace: Option<String>,

    /// Active labels (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub label: Vec<(String, String)>,

    /// Variable overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,
}

impl ScopeArgs {
    /// Build the caller context for lookups and step resolution
    pub fn to_context(&self) -> EvalContext {
        let mut ctx = EvalContext::new();
        for (key, value) in &self.var {
            ctx = ctx.with_variable(key.clone(), value.clone());
        }
        if let Some(workspace) = &self.workspace {
            ctx = ctx.with_workspace(workspace.clone());
        }
        if !self.label.is_empty() {
            ctx = ctx.with_labels(self.label.iter().cloned());
        }
        ctx
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
