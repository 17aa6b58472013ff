use serde_json::{json, Value};
use switchboard::{
    cap_ref, invoke, lit, run_rule_set, Capability, CapabilityLookup, Context, Operator,
    RuleSetBuilder,
};

#[tokio::main]
async fn main() {
    // Host-side capabilities: predicates and actions the rules can name.
    let lookup = CapabilityLookup::new()
        .bind(
            "store_open",
            Capability::predicate(|ctx| ctx.get("hour").and_then(|v| v.as_i64()).unwrap_or(0) < 18),
        )
        .bind(
            "greet",
            Capability::action(|ctx| {
                ctx.insert("greeting", json!("welcome in"));
                Value::Null
            }),
        )
        .bind(
            "turn_away",
            Capability::action(|ctx| {
                ctx.insert("greeting", json!("come back tomorrow"));
                Value::Null
            }),
        );

    // A bare proposition followed by a branching rule.
    let rules = RuleSetBuilder::new()
        .circuit(invoke(
            Operator::And,
            vec![lit(true), !cap_ref("store_open")],
        ))
        .rule(|r| {
            r.name("front_door")
                .when(cap_ref("store_open"))
                .branch("greet", "turn_away")
        })
        .build();

    let ctx = Context::new().with("hour", 14);
    let outcome = run_rule_set(&rules, ctx, &lookup)
        .await
        .expect("rule set failed");

    println!("results:  {:?}", outcome.results);
    println!("result:   {}", outcome.result);
    println!("greeting: {}", outcome.context.get("greeting").unwrap());
}
