//! Test: Label Scoped Overrides
//!
//! The `deploy` pipeline's `build` step swaps its image when the active
//! labels select the production override.

use crate::helpers::*;
use scoped_pipeline::core::EvalContext;

#[test]
fn test_prod_label_selects_override_image() {
    let config = load(DEPLOY_YAML);

    let steps = resolve_steps(&config, "deploy", &labels_ctx(&[("env", "prod")]));

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].image.as_deref(), Some("prod-img"));
    assert_eq!(steps[0].name.as_deref(), Some("build"));
    assert_eq!(steps[1].image.as_deref(), Some("ghcr.io/acme/app"));
}

#[test]
fn test_empty_labels_use_base_image() {
    let config = load(DEPLOY_YAML);

    let steps = resolve_steps(&config, "deploy", &labels_ctx(&[]));

    assert_eq!(steps[0].image.as_deref(), Some("dev-img"));
    assert_eq!(steps[0].labels.get("tier").map(String::as_str), Some("build"));
}

#[test]
fn test_other_label_value_uses_base_image() {
    let config = load(DEPLOY_YAML);

    let steps = resolve_steps(&config, "deploy", &labels_ctx(&[("env", "staging")]));

    assert_eq!(steps[0].image.as_deref(), Some("dev-img"));
}

#[test]
fn test_capability_refs_match_step_count() {
    let config = load(DEPLOY_YAML);
    let pipeline = lookup(&config, "deploy");

    for ctx in [labels_ctx(&[("env", "prod")]), labels_ctx(&[]), EvalContext::new()] {
        let refs = pipeline.step_capability_refs(Some(&ctx)).unwrap();
        let steps = pipeline.steps(Some(&ctx)).unwrap();
        assert_eq!(refs.len(), steps.len());
        assert_eq!(refs, vec!["docker".to_string(), "registry-push".to_string()]);
    }
}

#[test]
fn test_step_labels_come_from_base_body() {
    let config = load(DEPLOY_YAML);
    let pipeline = lookup(&config, "deploy");

    let labels = pipeline.step_labels(Some(&labels_ctx(&[("env", "prod")]))).unwrap();

    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].get("tier").map(String::as_str), Some("build"));
    assert!(labels[1].is_empty());
}
