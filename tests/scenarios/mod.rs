//! Scenario-based tests for scoped-pipeline

mod concurrent_lookup;
mod deploy_labels;
mod lookup;
mod scope_precedence;
mod step_failures;
