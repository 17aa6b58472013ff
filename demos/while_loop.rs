use serde_json::json;
use switchboard::{
    run_rule_set, Capability, CapabilityLookup, CircuitNode, Context, RuleSetBuilder,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Run with RUST_LOG=switchboard=trace to watch the loop iterate.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rules = RuleSetBuilder::new()
        .rule(|r| {
            r.name("drain_backlog")
                .when(CircuitNode::capability(Capability::predicate(|ctx| {
                    ctx.get("backlog").and_then(|v| v.as_i64()).unwrap_or(0) > 0
                })))
                .repeat(Capability::action(|ctx| {
                    let remaining = ctx.get("backlog").and_then(|v| v.as_i64()).unwrap_or(0) - 1;
                    ctx.insert("backlog", json!(remaining));
                    json!(remaining)
                }))
        })
        .build();

    let ctx = Context::new().with("backlog", 5);
    let outcome = run_rule_set(&rules, ctx, &CapabilityLookup::new())
        .await
        .expect("rule set failed");

    println!("iteration values: {}", outcome.result);
    println!("backlog now: {}", outcome.context.get("backlog").unwrap());
}
