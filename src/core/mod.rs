//! Core domain models for Pipeline
//!
//! This module defines the pipelines, steps and evaluation contexts, and the
//! two-pass decoding that turns a raw declaration into resolved steps.

pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod expr;
pub mod functions;
pub mod pipeline;
pub mod scope;
pub mod selector;
pub mod step;

pub use config::{Config, PipelineDefinition};
pub use context::{EvalContext, Function};
pub use error::{Diagnostic, Diagnostics, ResolveError, ScopeEvaluationError};
pub use pipeline::*;
pub use scope::{ScopeMatch, ScopeResolver};
pub use selector::{LabelSelector, Labels, SelectorEvaluator};
pub use step::*;
