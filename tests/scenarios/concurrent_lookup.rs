//! Test: Concurrent Lookups
//!
//! One registry serves lookups from several threads; every thread sees its
//! own scope and the shared base context is never modified.

use crate::helpers::*;
use scoped_pipeline::core::EvalContext;
use std::thread;

#[test]
fn test_parallel_lookups_are_isolated() {
    let config = load(DEPLOY_YAML);

    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let config = &config;
                s.spawn(move || {
                    let env = if i % 2 == 0 { "prod" } else { "dev" };
                    let ctx = labels_ctx(&[("env", env)]);
                    let pipeline = config.lookup("deploy", Some(&ctx)).unwrap().unwrap();
                    let steps = pipeline.steps(None).unwrap();
                    (env, steps[0].image.clone())
                })
            })
            .collect();

        for handle in handles {
            let (env, image) = handle.join().unwrap();
            let expected = if env == "prod" { "prod-img" } else { "dev-img" };
            assert_eq!(image.as_deref(), Some(expected));
        }
    });

    assert_eq!(config.context().depth(), 1);
    let steps = resolve_steps(&config, "deploy", &EvalContext::new());
    assert_eq!(steps[0].image.as_deref(), Some("dev-img"));
}
