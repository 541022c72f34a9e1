//! Test: Pipeline Lookup
//!
//! Absence is reported as `None`, not as an error, and every declared
//! pipeline can be found by its id.

use crate::helpers::*;
use scoped_pipeline::core::{EvalContext, ResolveError};

#[test]
fn test_missing_pipeline_is_none() {
    let config = load(DEPLOY_YAML);

    let result = config.lookup("missing", Some(&EvalContext::new()));

    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_every_declared_pipeline_resolves_to_its_id() {
    let yaml = r#"
pipelines:
  - id: build
  - id: test
    name: Tests
  - id: deploy
    steps:
      - use: docker
"#;
    let config = load(yaml);

    assert_eq!(config.list_ids(), vec!["build", "test", "deploy"]);
    for id in config.list_ids() {
        let pipeline = lookup(&config, &id);
        assert_eq!(pipeline.reference().id, id);
    }
}

#[test]
fn test_malformed_pipeline_is_an_error() {
    let yaml = r#"
pipelines:
  - id: broken
    description: "{{ undefined_thing }}"
"#;
    let config = load(yaml);

    let err = config.lookup("broken", None).unwrap_err();

    match &err {
        ResolveError::Decode { diagnostics, .. } => {
            let first = diagnostics.iter().next().unwrap();
            assert_eq!(first.path, "description");
            assert_eq!(first.expression.as_deref(), Some("undefined_thing"));
        }
        other => panic!("Expected decode error, got {:?}", other),
    }
}

#[test]
fn test_caller_context_reaches_pipeline_fields() {
    let yaml = r#"
pipelines:
  - id: deploy
    description: "Deploys {{ default(tag, \"latest\") }}"
"#;
    let config = load(yaml);

    let defaulted = config.lookup("deploy", None).unwrap().unwrap();
    assert_eq!(defaulted.description.as_deref(), Some("Deploys latest"));

    let ctx = EvalContext::new().with_variable("tag", "v2");
    let tagged = config.lookup("deploy", Some(&ctx)).unwrap().unwrap();
    assert_eq!(tagged.description.as_deref(), Some("Deploys v2"));
}
