//! Final-pass decoding of bodies into typed values

use crate::core::context::EvalContext;
use crate::core::error::{Diagnostic, Diagnostics, ResolveError};
use crate::core::expr::{interpolate_mapping, interpolate_value, render_scalar};
use crate::core::selector::Labels;
use crate::core::step::Step;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

const LABELS_KEY: &str = "labels";

/// Evaluate a body against a context and decode it into `T`
///
/// Nothing is returned unless the whole body evaluated and decoded cleanly.
pub fn decode_body<T: DeserializeOwned>(body: &Mapping, ctx: &EvalContext) -> Result<T, Diagnostics> {
    let ctx = ctx.finalize();
    let evaluated = interpolate_mapping(body, &ctx)?;
    serde_path_to_error::deserialize(Value::Mapping(evaluated)).map_err(|e| {
        let path = match e.path().to_string() {
            root if root == "." => String::new(),
            path => path,
        };
        Diagnostic::new(path, e.into_inner().to_string()).into()
    })
}

/// Decode a step body and stamp it with the context used
pub fn decode_step(target: &str, body: &Mapping, ctx: &EvalContext) -> Result<Step, ResolveError> {
    let mut step: Step =
        decode_body(body, ctx).map_err(|diagnostics| ResolveError::decode(target, diagnostics))?;
    step.context = ctx.clone();
    debug!("Decoded {} (use {})", target, step.capability());
    Ok(step)
}

/// Read the `labels` mapping of a body, evaluating any templates in it
pub fn extract_labels(body: &Mapping, ctx: &EvalContext) -> Result<Labels, Diagnostics> {
    let Some(raw) = body.get(LABELS_KEY) else {
        return Ok(Labels::new());
    };

    let mut diagnostics = Diagnostics::new();
    let value = interpolate_value(raw, &ctx.finalize(), LABELS_KEY, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let map = match value {
        Value::Null => return Ok(Labels::new()),
        Value::Mapping(map) => map,
        _ => return Err(Diagnostic::new(LABELS_KEY, "labels must be a mapping").into()),
    };

    let mut labels = Labels::new();
    for (key, value) in &map {
        let Some(key) = key.as_str() else {
            diagnostics.push(Diagnostic::new(LABELS_KEY, "label keys must be strings"));
            continue;
        };
        match render_scalar(value) {
            Ok(value) => {
                labels.insert(key.to_string(), value);
            }
            Err(e) => {
                let path = format!("{}.{}", LABELS_KEY, key);
                diagnostics.push(Diagnostic::new(path, e.to_string()));
            }
        }
    }

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    Ok(labels)
}
