//! Template expression evaluation
//!
//! String values in a body may embed `{{ expression }}` templates:
//!
//! - `{{ registry }}` / `{{ build.tag }}` - variable lookup, dotted paths walk
//!   mappings and sequence indices
//! - `{{ upper(env) }}` / `{{ join("-", parts) }}` - function call with path,
//!   quoted string, number or boolean arguments
//!
//! A string that is exactly one template evaluates to the typed value. Any
//! other string is rendered, with each template replaced by its scalar text.

use crate::core::context::EvalContext;
use crate::core::error::{Diagnostic, Diagnostics, ExprError};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

fn template_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("template regex is valid"))
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$").expect("call regex is valid")
    })
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)*$").expect("path regex is valid")
    })
}

/// List the expressions embedded in a string, without delimiters
pub fn template_expressions(text: &str) -> Vec<String> {
    template_regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Evaluate a bare expression (no `{{ }}` delimiters)
pub fn evaluate(expression: &str, ctx: &EvalContext) -> Result<Value, ExprError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(ExprError::Syntax("empty expression".to_string()));
    }

    if let Some(caps) = call_regex().captures(expression) {
        let name = &caps[1];
        let function = ctx
            .function(name)
            .ok_or_else(|| ExprError::UnknownFunction(name.to_string()))?;

        let mut args = Vec::new();
        for raw in split_arguments(&caps[2])? {
            let arg = match evaluate_argument(&raw, ctx) {
                Err(ExprError::UndefinedVariable(_)) if function.is_lenient() => Value::Null,
                other => other?,
            };
            args.push(arg);
        }

        return function
            .call(&args)
            .map_err(|message| ExprError::FunctionFailed {
                name: name.to_string(),
                message,
            });
    }

    lookup_path(expression, ctx)
}

fn evaluate_argument(raw: &str, ctx: &EvalContext) -> Result<Value, ExprError> {
    let raw = raw.trim();
    if let Some(literal) = unquote(raw) {
        return Ok(Value::String(literal));
    }
    match raw {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Ok(Value::Number(n.into()));
    }
    evaluate(raw, ctx)
}

fn unquote(raw: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(raw[1..raw.len() - 1].to_string());
        }
    }
    None
}

/// Split call arguments on commas that are not inside quotes or parentheses
fn split_arguments(raw: &str) -> Result<Vec<String>, ExprError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for ch in raw.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '(') => {
                depth += 1;
                current.push(ch);
            }
            (None, ')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ExprError::Syntax(format!("unbalanced ')' in '{}'", raw)))?;
                current.push(ch);
            }
            (None, ',') if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(ExprError::Syntax(format!("unterminated string in '{}'", raw)));
    }
    if depth != 0 {
        return Err(ExprError::Syntax(format!("unbalanced '(' in '{}'", raw)));
    }
    args.push(current.trim().to_string());

    if args.iter().any(|a| a.is_empty()) {
        return Err(ExprError::Syntax(format!("empty argument in '{}'", raw)));
    }
    Ok(args)
}

fn lookup_path(path: &str, ctx: &EvalContext) -> Result<Value, ExprError> {
    if !path_regex().is_match(path) {
        return Err(ExprError::Syntax(path.to_string()));
    }

    let mut segments = path.split('.');
    let root = segments.next().unwrap_or_default();
    let mut current = ctx
        .variable(root)
        .ok_or_else(|| ExprError::UndefinedVariable(path.to_string()))?;

    for segment in segments {
        let next = match current {
            Value::Mapping(map) => map.get(segment),
            Value::Sequence(seq) => segment.parse::<usize>().ok().and_then(|i| seq.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ExprError::UndefinedVariable(path.to_string()))?;
    }

    Ok(current.clone())
}

/// Render a scalar value as template text
pub fn render_scalar(value: &Value) -> Result<String, ExprError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Sequence(_) => Err(ExprError::NotRenderable("a sequence".to_string())),
        Value::Mapping(_) => Err(ExprError::NotRenderable("a mapping".to_string())),
        Value::Tagged(tagged) => render_scalar(&tagged.value),
    }
}

fn render(text: &str, ctx: &EvalContext) -> Result<Value, (String, ExprError)> {
    let re = template_regex();

    if let Some(caps) = re.captures(text) {
        let whole = caps.get(0).map(|m| m.range());
        if whole == Some(0..text.len()) {
            let expression = &caps[1];
            return evaluate(expression, ctx).map_err(|e| (expression.to_string(), e));
        }
    } else {
        return Ok(Value::String(text.to_string()));
    }

    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let expression = &caps[1];
        rendered.push_str(&text[last..whole.start()]);
        let value = evaluate(expression, ctx).map_err(|e| (expression.to_string(), e))?;
        let piece = render_scalar(&value).map_err(|e| (expression.to_string(), e))?;
        rendered.push_str(&piece);
        last = whole.end();
    }
    rendered.push_str(&text[last..]);

    Ok(Value::String(rendered))
}

/// Interpolate every template in a single string
pub fn interpolate_str(text: &str, ctx: &EvalContext) -> Result<Value, ExprError> {
    render(text, ctx).map_err(|(_, e)| e)
}

/// Interpolate a value recursively, recording failures in `diagnostics`
///
/// Failed leaves are left untouched so decoding can carry on and report
/// every problem in the body at once.
pub fn interpolate_value(
    value: &Value,
    ctx: &EvalContext,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Value {
    match value {
        Value::String(text) => match render(text, ctx) {
            Ok(v) => v,
            Err((expression, err)) => {
                diagnostics.push(Diagnostic::new(path, err.to_string()).with_expression(expression));
                value.clone()
            }
        },
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    interpolate_value(item, ctx, &format!("{}[{}]", path, i), diagnostics)
                })
                .collect(),
        ),
        Value::Mapping(map) => Value::Mapping(interpolate_entries(map, ctx, path, diagnostics)),
        other => other.clone(),
    }
}

fn interpolate_entries(
    map: &Mapping,
    ctx: &EvalContext,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Mapping {
    map.iter()
        .map(|(key, value)| {
            let key_name = render_scalar(key).unwrap_or_else(|_| "?".to_string());
            let child_path = if path.is_empty() {
                key_name
            } else {
                format!("{}.{}", path, key_name)
            };
            (key.clone(), interpolate_value(value, ctx, &child_path, diagnostics))
        })
        .collect()
}

/// Interpolate a whole body, failing with every diagnostic collected
pub fn interpolate_mapping(body: &Mapping, ctx: &EvalContext) -> Result<Mapping, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let result = interpolate_entries(body, ctx, "", &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    Ok(result)
}
