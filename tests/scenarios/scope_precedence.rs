//! Test: Scope Precedence
//!
//! Workspace overrides win over label overrides, regardless of the order
//! the scoping blocks are declared in.

use crate::helpers::*;
use scoped_pipeline::core::EvalContext;

const SCOPED_YAML: &str = r#"
pipelines:
  - id: release
    steps:
      - name: label-first
        use: docker
        image: base-img
        label:
          - selector: env == prod
            step: { use: docker, image: label-img }
        workspace:
          - name: production
            step: { use: docker, image: workspace-img }
      - name: workspace-only
        use: docker
        image: base-img
        workspace:
          - name: production
            step: { use: pack, image: workspace-only-img }
      - name: unscoped
        use: exec
        image: plain-img
"#;

#[test]
fn test_workspace_override_replaces_base() {
    let config = load(SCOPED_YAML);

    let steps = resolve_steps(&config, "release", &workspace_ctx("production"));

    assert_eq!(
        images(&steps),
        vec![
            Some("workspace-img".to_string()),
            Some("workspace-only-img".to_string()),
            Some("plain-img".to_string()),
        ]
    );
    assert_eq!(steps[1].capability(), "pack");
}

#[test]
fn test_workspace_wins_when_both_match() {
    let config = load(SCOPED_YAML);
    let ctx = EvalContext::new()
        .with_workspace("production")
        .with_labels([("env", "prod")]);

    for _ in 0..5 {
        let steps = resolve_steps(&config, "release", &ctx);
        assert_eq!(steps[0].image.as_deref(), Some("workspace-img"));
    }
}

#[test]
fn test_label_applies_in_other_workspace() {
    let config = load(SCOPED_YAML);
    let ctx = EvalContext::new()
        .with_workspace("staging")
        .with_labels([("env", "prod")]);

    let steps = resolve_steps(&config, "release", &ctx);

    assert_eq!(
        images(&steps),
        vec![
            Some("label-img".to_string()),
            Some("base-img".to_string()),
            Some("plain-img".to_string()),
        ]
    );
}

#[test]
fn test_no_matching_scope_uses_base_bodies() {
    let config = load(SCOPED_YAML);

    let steps = resolve_steps(&config, "release", &EvalContext::new());

    assert_eq!(
        images(&steps),
        vec![
            Some("base-img".to_string()),
            Some("base-img".to_string()),
            Some("plain-img".to_string()),
        ]
    );
}

#[test]
fn test_capability_refs_follow_workspace_override() {
    let config = load(SCOPED_YAML);
    let pipeline = lookup(&config, "release");

    let refs = pipeline
        .step_capability_refs(Some(&workspace_ctx("production")))
        .unwrap();

    assert_eq!(refs, vec!["docker".to_string(), "pack".to_string(), "exec".to_string()]);
}
