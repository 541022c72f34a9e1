//! scoped-pipeline - resolves pipeline steps with workspace and label scoped overrides

pub mod cli;
pub mod core;

// Re-export commonly used types
pub use core::{Config, EvalContext, Pipeline, PipelineRef, ResolveError, Step};
pub use core::{LabelSelector, SelectorEvaluator};
