//! CLI output formatting

use crate::core::{Labels, ResolveError, Step};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Format labels as `k=v, k=v`
pub fn format_labels(labels: &Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a resolved step for display
pub fn format_step(index: usize, step: &Step) -> String {
    let name = step.name.clone().unwrap_or_else(|| format!("#{}", index));
    let mut line = format!(
        "{:>3}. {} {}",
        index + 1,
        style(name).bold(),
        style(format!("[{}]", step.capability())).cyan()
    );

    if let Some(image) = &step.image {
        line.push_str(&format!("\n       image: {}", image));
    }
    if let Some(command) = &step.command {
        line.push_str(&format!("\n       command: {}", command));
    }
    if !step.depends_on.is_empty() {
        line.push_str(&format!("\n       depends on: {}", step.depends_on.join(", ")));
    }
    if !step.labels.is_empty() {
        line.push_str(&format!(
            "\n       labels: {}",
            style(format_labels(&step.labels)).dim()
        ));
    }

    line
}

/// Format a resolution error, one diagnostic per line
pub fn format_error(err: &ResolveError) -> String {
    match err.diagnostics() {
        Some(diagnostics) => {
            let mut out = style("decode failed").red().to_string();
            for diagnostic in diagnostics.iter() {
                out.push_str(&format!("\n    {}", diagnostic));
            }
            out
        }
        None => style(err.to_string()).red().to_string(),
    }
}
