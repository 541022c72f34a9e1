//! Standard functions available to every pipeline expression

use crate::core::context::{EvalContext, Function};
use crate::core::expr::render_scalar;
use serde_yaml::Value;

fn expect_args(name: &str, args: &[Value], count: usize) -> Result<(), String> {
    if args.len() != count {
        return Err(format!(
            "{} expects {} argument(s), got {}",
            name,
            count,
            args.len()
        ));
    }
    Ok(())
}

fn string_arg(args: &[Value], index: usize) -> Result<String, String> {
    render_scalar(&args[index]).map_err(|e| e.to_string())
}

fn map_string(name: &'static str, f: fn(&str) -> String) -> Function {
    Function::new(move |args| {
        expect_args(name, args, 1)?;
        Ok(Value::String(f(&string_arg(args, 0)?)))
    })
}

/// `join(separator, list)`
fn join() -> Function {
    Function::new(|args| {
        expect_args("join", args, 2)?;
        let separator = string_arg(args, 0)?;
        let Value::Sequence(items) = &args[1] else {
            return Err("join expects a sequence as its second argument".to_string());
        };
        let parts = items
            .iter()
            .map(|item| render_scalar(item).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::String(parts.join(&separator)))
    })
}

/// `default(value, fallback)` - fallback when value is undefined or null
fn default() -> Function {
    Function::lenient(|args| {
        expect_args("default", args, 2)?;
        match &args[0] {
            Value::Null => Ok(args[1].clone()),
            other => Ok(other.clone()),
        }
    })
}

/// Bind the standard library onto a context
pub fn with_standard_functions(ctx: EvalContext) -> EvalContext {
    ctx.with_function("upper", map_string("upper", |s| s.to_uppercase()))
        .with_function("lower", map_string("lower", |s| s.to_lowercase()))
        .with_function("trim", map_string("trim", |s| s.trim().to_string()))
        .with_function("join", join())
        .with_function("default", default())
}

/// A fresh root context holding only the standard library
pub fn standard_context() -> EvalContext {
    with_standard_functions(EvalContext::new())
}
