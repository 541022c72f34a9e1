//! Test: Step Resolution Failures
//!
//! Any failing step aborts resolution; no partial step list is returned.

use crate::helpers::*;
use scoped_pipeline::core::{EvalContext, ResolveError, ScopeEvaluationError, SelectorEvaluator};
use scoped_pipeline::core::error::SelectorError;
use scoped_pipeline::core::Labels;

const FAILING_YAML: &str = r#"
pipelines:
  - id: broken
    steps:
      - name: fine
        use: docker
        image: ok-img
      - name: bad
        use: docker
        image: "{{ missing_registry }}/app"
        command: "{{ shout(mode) }}"
      - name: never-reached
        use: docker
        image: "{{ also_missing }}"
"#;

#[test]
fn test_first_failing_step_aborts() {
    let config = load(FAILING_YAML);
    let pipeline = lookup(&config, "broken");

    let err = pipeline.steps(None).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("step 1 ('bad')"), "unexpected message: {}", message);
    assert!(!message.contains("never-reached"));

    let diagnostics = err.diagnostics().expect("decode error carries diagnostics");
    let paths: Vec<&str> = diagnostics.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["image", "command"]);
}

#[test]
fn test_unknown_step_field_is_a_decode_error() {
    let yaml = r#"
pipelines:
  - id: typo
    steps:
      - use: docker
        imaeg: oops
"#;
    let config = load(yaml);
    let pipeline = lookup(&config, "typo");

    let err = pipeline.steps(None).unwrap_err();
    assert!(matches!(err, ResolveError::Decode { .. }));
    // Capability refs do not decode the body
    assert_eq!(pipeline.step_capability_refs(None).unwrap(), vec!["docker".to_string()]);
}

#[test]
fn test_scope_evaluation_error_names_the_step() {
    let yaml = r#"
pipelines:
  - id: scoped
    steps:
      - use: docker
      - use: docker
        workspace:
          - name: "{{ target_workspace }}"
            step: { use: docker }
"#;
    let config = load(yaml);
    let pipeline = lookup(&config, "scoped");
    let ctx = workspace_ctx("production");

    let err = pipeline.steps(Some(&ctx)).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ScopeEvaluation {
            step: 1,
            source: ScopeEvaluationError::Workspace { .. }
        }
    ));

    let err = pipeline.step_capability_refs(Some(&ctx)).unwrap_err();
    assert!(matches!(err, ResolveError::ScopeEvaluation { step: 1, .. }));
}

/// Selector evaluator that treats the selector as a single required label key
struct KeyOnlySelector;

impl SelectorEvaluator for KeyOnlySelector {
    fn matches(&self, selector: &str, labels: &Labels) -> Result<bool, SelectorError> {
        if selector.contains(' ') {
            return Err(SelectorError::InvalidClause(selector.to_string()));
        }
        Ok(labels.contains_key(selector))
    }
}

#[test]
fn test_custom_selector_evaluator() {
    let yaml = r#"
pipelines:
  - id: custom
    steps:
      - use: docker
        image: base
        label:
          - selector: canary
            step: { use: docker, image: canary-img }
"#;
    let config = load(yaml).with_selector_evaluator(KeyOnlySelector);

    let steps = resolve_steps(&config, "custom", &labels_ctx(&[("canary", "yes")]));
    assert_eq!(steps[0].image.as_deref(), Some("canary-img"));

    let steps = resolve_steps(&config, "custom", &EvalContext::new());
    assert_eq!(steps[0].image.as_deref(), Some("base"));
}

#[test]
fn test_scope_expressions_surface_consistently() {
    let yaml = r#"
pipelines:
  - id: unresolved-workspace
    steps:
      - use: docker
        workspace:
          - name: "{{ undefined_ws }}"
            step: { use: pack }
  - id: shadowed-selector
    steps:
      - use: docker
        workspace:
          - name: production
            step: { use: pack }
        label:
          - selector: "{{ undefined_sel }}"
            step: { use: exec }
"#;
    let config = load(yaml);

    // Workspace names are evaluated even with no active workspace
    let err = lookup(&config, "unresolved-workspace")
        .step_capability_refs(None)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ScopeEvaluation {
            step: 0,
            source: ScopeEvaluationError::Workspace { .. }
        }
    ));

    // A matching workspace scope means label selectors are never consulted
    let pipeline = lookup(&config, "shadowed-selector");
    let refs = pipeline
        .step_capability_refs(Some(&workspace_ctx("production")))
        .unwrap();
    assert_eq!(refs, vec!["pack".to_string()]);

    let err = pipeline.step_capability_refs(None).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ScopeEvaluation {
            step: 0,
            source: ScopeEvaluationError::LabelExpression { .. }
        }
    ));
}
