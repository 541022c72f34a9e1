//! Test utility functions for scoped-pipeline

#![allow(dead_code)]

use scoped_pipeline::core::{Config, EvalContext, Pipeline, Step};

/// The `deploy` document used across scenarios
pub const DEPLOY_YAML: &str = r#"
variables:
  registry: ghcr.io/acme

pipelines:
  - id: deploy
    name: "Deploy"
    steps:
      - name: build
        use: docker
        image: dev-img
        labels:
          tier: build
        label:
          - selector: env == prod
            step:
              name: build
              use: docker
              image: prod-img
      - name: push
        use: registry-push
        image: "{{ registry }}/app"
        depends_on: [build]
"#;

/// Load a configuration, panicking on invalid YAML
pub fn load(yaml: &str) -> Config {
    Config::from_yaml(yaml).expect("Should parse YAML")
}

/// Look up a pipeline that must exist
pub fn lookup<'c>(config: &'c Config, id: &str) -> Pipeline<'c> {
    config
        .lookup(id, None)
        .expect("Lookup should not fail")
        .unwrap_or_else(|| panic!("Pipeline '{}' should exist", id))
}

/// Caller context with the given labels
pub fn labels_ctx(labels: &[(&str, &str)]) -> EvalContext {
    EvalContext::new().with_labels(labels.iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

/// Caller context with an active workspace
pub fn workspace_ctx(workspace: &str) -> EvalContext {
    EvalContext::new().with_workspace(workspace)
}

/// Images of resolved steps, in order
pub fn images(steps: &[Step]) -> Vec<Option<String>> {
    steps.iter().map(|s| s.image.clone()).collect()
}

/// Resolve a pipeline's steps under a caller context
pub fn resolve_steps(config: &Config, id: &str, ctx: &EvalContext) -> Vec<Step> {
    lookup(config, id)
        .steps(Some(ctx))
        .expect("Steps should resolve")
}
