use switchboard::{evaluate_proposition, Capability, CapabilityLookup, CircuitNode, Context};

#[tokio::main]
async fn main() {
    let circuit = CircuitNode::from_dsl(
        "# deploy gate
         AND(
             @tests_green,
             NOT(@freeze_window),
             OR(@on_call_ack, @low_risk)
         )",
    )
    .expect("invalid circuit DSL");

    println!("circuit: {circuit}");

    let lookup = CapabilityLookup::new()
        .bind("tests_green", Capability::predicate(|_| true))
        .bind("freeze_window", Capability::predicate(|_| false))
        .bind("on_call_ack", Capability::predicate(|_| false))
        .bind("low_risk", Capability::predicate(|_| true));

    let verdict = evaluate_proposition(&circuit, &Context::new(), &lookup)
        .await
        .expect("evaluation failed");
    println!("ship it: {verdict}");
}
