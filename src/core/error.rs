//! Error types for pipeline resolution

use std::fmt;
use thiserror::Error;

/// A single problem found while decoding a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dotted path of the offending field (e.g. `steps.image`)
    pub path: String,

    /// Expression text, when the problem came from template evaluation
    pub expression: Option<String>,

    /// What went wrong
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expression: None,
            message: message.into(),
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<body>" } else { &self.path };
        match &self.expression {
            Some(expr) => write!(f, "{}: {} (in `{{{{ {} }}}}`)", path, self.message, expr),
            None => write!(f, "{}: {}", path, self.message),
        }
    }
}

/// Ordered set of diagnostics produced by one decode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Errors raised while evaluating a `{{ ... }}` expression
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' failed: {message}")]
    FunctionFailed { name: String, message: String },

    #[error("invalid expression: {0}")]
    Syntax(String),

    #[error("cannot render {0} into a string")]
    NotRenderable(String),
}

/// Errors raised by a label selector
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid selector clause '{0}'")]
    InvalidClause(String),
}

/// Why a scoping rule could not be evaluated
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeEvaluationError {
    #[error("workspace scope '{name}': {source}")]
    Workspace {
        name: String,
        #[source]
        source: ExprError,
    },

    #[error("label scope '{selector}': {source}")]
    LabelExpression {
        selector: String,
        #[source]
        source: ExprError,
    },

    #[error("label scope '{selector}': {source}")]
    LabelSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("context variable '{name}' must be {expected}")]
    ContextVariable { name: String, expected: &'static str },
}

/// Errors returned by pipeline lookup and step resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("step {step}: scope evaluation failed: {source}")]
    ScopeEvaluation {
        step: usize,
        #[source]
        source: ScopeEvaluationError,
    },

    #[error("failed to decode {target}:\n{diagnostics}")]
    Decode {
        target: String,
        diagnostics: Diagnostics,
    },
}

impl ResolveError {
    pub fn decode(target: impl Into<String>, diagnostics: Diagnostics) -> Self {
        ResolveError::Decode {
            target: target.into(),
            diagnostics,
        }
    }

    /// Diagnostics attached to a decode failure, if any
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            ResolveError::Decode { diagnostics, .. } => Some(diagnostics),
            ResolveError::ScopeEvaluation { .. } => None,
        }
    }
}
