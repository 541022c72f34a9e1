//! Evaluation context - variable and function bindings for expressions
//!
//! Contexts form a parent chain. A child shadows its parent's bindings and
//! lookups fall back through the chain. Nodes are shared behind `Arc`, so
//! appending a child never touches the parent and a base context can be
//! reused from many threads at once.

use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Variable holding the active workspace name
pub const WORKSPACE_VARIABLE: &str = "workspace";

/// Variable holding the active label set
pub const LABELS_VARIABLE: &str = "labels";

type FunctionImpl = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

/// A callable bound in an evaluation context
#[derive(Clone)]
pub struct Function {
    call: Arc<FunctionImpl>,
    lenient: bool,
}

impl Function {
    /// Create a function whose arguments must all be defined
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(f),
            lenient: false,
        }
    }

    /// Create a function that receives `null` for undefined variable arguments
    pub fn lenient<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(f),
            lenient: true,
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("lenient", &self.lenient)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
struct Node {
    variables: HashMap<String, Value>,
    functions: HashMap<String, Function>,
    parent: Option<EvalContext>,
}

/// Immutable chain of variable and function bindings
#[derive(Clone, Default)]
pub struct EvalContext {
    node: Arc<Node>,
}

impl EvalContext {
    /// Create an empty root context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable on this node
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.node)
            .variables
            .insert(name.into(), value.into());
        self
    }

    /// Bind every entry of a mapping with a string key as a variable
    pub fn with_variables(mut self, variables: &Mapping) -> Self {
        let node = Arc::make_mut(&mut self.node);
        for (key, value) in variables {
            if let Some(name) = key.as_str() {
                node.variables.insert(name.to_string(), value.clone());
            }
        }
        self
    }

    /// Bind a function on this node
    pub fn with_function(mut self, name: impl Into<String>, function: Function) -> Self {
        Arc::make_mut(&mut self.node)
            .functions
            .insert(name.into(), function);
        self
    }

    /// Set the active workspace
    pub fn with_workspace(self, workspace: impl Into<String>) -> Self {
        self.with_variable(WORKSPACE_VARIABLE, Value::String(workspace.into()))
    }

    /// Set the active label set
    pub fn with_labels<I, K, V>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mapping: Mapping = labels
            .into_iter()
            .map(|(k, v)| (Value::String(k.into()), Value::String(v.into())))
            .collect();
        self.with_variable(LABELS_VARIABLE, Value::Mapping(mapping))
    }

    /// Create a child whose own bindings start empty
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                ..Node::default()
            }),
        }
    }

    pub fn parent(&self) -> Option<&EvalContext> {
        self.node.parent.as_ref()
    }

    /// Look up a variable, falling back through the parent chain
    pub fn variable(&self, name: &str) -> Option<&Value> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(value) = ctx.node.variables.get(name) {
                return Some(value);
            }
            current = ctx.parent();
        }
        None
    }

    /// Look up a function, falling back through the parent chain
    pub fn function(&self, name: &str) -> Option<&Function> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(function) = ctx.node.functions.get(name) {
                return Some(function);
            }
            current = ctx.parent();
        }
        None
    }

    /// Number of nodes in the chain, including this one
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = Some(self);
        while let Some(ctx) = current {
            depth += 1;
            current = ctx.parent();
        }
        depth
    }

    /// Visible variable names, sorted
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.finalize().node.variables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Compose `overlay`'s own bindings on top of `base`
    ///
    /// Only the overlay node's bindings are carried over, not its parents.
    pub fn append(base: &EvalContext, overlay: Option<&EvalContext>) -> EvalContext {
        let Some(overlay) = overlay else {
            return base.clone();
        };

        EvalContext {
            node: Arc::new(Node {
                variables: overlay.node.variables.clone(),
                functions: overlay.node.functions.clone(),
                parent: Some(base.clone()),
            }),
        }
    }

    /// Flatten the chain into a single root node
    pub fn finalize(&self) -> EvalContext {
        if self.parent().is_none() {
            return self.clone();
        }

        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(ctx) = current {
            chain.push(ctx);
            current = ctx.parent();
        }

        let mut flat = Node::default();
        for ctx in chain.into_iter().rev() {
            flat.variables
                .extend(ctx.node.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
            flat.functions
                .extend(ctx.node.functions.iter().map(|(k, f)| (k.clone(), f.clone())));
        }

        EvalContext { node: Arc::new(flat) }
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flat = self.finalize();
        let mut variables: Vec<_> = flat.node.variables.keys().collect();
        variables.sort();
        let mut functions: Vec<_> = flat.node.functions.keys().collect();
        functions.sort();
        f.debug_struct("EvalContext")
            .field("depth", &self.depth())
            .field("variables", &variables)
            .field("functions", &functions)
            .finish()
    }
}
