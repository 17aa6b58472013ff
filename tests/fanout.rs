use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use switchboard::{
    cap_ref, evaluate_proposition, invoke, lit, Capability, CapabilityLookup, Context, EvalError,
    Operator,
};
use tokio::time::timeout;

fn never_resolves() -> Capability {
    Capability::new(|_| async {
        futures::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    })
}

#[tokio::test]
async fn failing_operand_rejects_without_waiting_for_siblings() {
    let lookup = CapabilityLookup::new()
        .bind("stalled", never_resolves())
        .bind(
            "broken",
            Capability::new(|_| async { Err(EvalError::capability("immediate failure")) }),
        );

    let node = invoke(Operator::And, vec![cap_ref("stalled"), cap_ref("broken")]);

    // Fail-fast: the invocation must reject promptly even though one
    // operand never settles.
    let result = timeout(
        Duration::from_millis(500),
        evaluate_proposition(&node, &Context::new(), &lookup),
    )
    .await
    .expect("evaluation did not fail fast");

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "capability failed: immediate failure");
}

#[tokio::test]
async fn all_operands_resolve_concurrently() {
    // Three operands, each sleeping ~20ms: concurrent resolution finishes
    // well under the serial 60ms.
    let lookup = CapabilityLookup::new().bind(
        "nap",
        Capability::new(|_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!(true))
        }),
    );

    let node = invoke(
        Operator::And,
        vec![cap_ref("nap"), cap_ref("nap"), cap_ref("nap")],
    );

    let start = std::time::Instant::now();
    let result = evaluate_proposition(&node, &Context::new(), &lookup)
        .await
        .unwrap();
    assert!(result);
    assert!(
        start.elapsed() < Duration::from_millis(55),
        "operands appear to have resolved serially: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn operators_do_not_short_circuit() {
    // OR(true, probe): a short-circuiting OR would skip the probe.
    let hits = Arc::new(AtomicUsize::new(0));
    let probe_hits = Arc::clone(&hits);

    let lookup = CapabilityLookup::new().bind(
        "probe",
        Capability::predicate(move |_| {
            probe_hits.fetch_add(1, Ordering::SeqCst);
            false
        }),
    );

    let node = invoke(Operator::Or, vec![lit(true), cap_ref("probe")]);
    assert!(evaluate_proposition(&node, &Context::new(), &lookup)
        .await
        .unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Same for AND(false, probe).
    let node = invoke(Operator::And, vec![lit(false), cap_ref("probe")]);
    assert!(!evaluate_proposition(&node, &Context::new(), &lookup)
        .await
        .unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn sibling_operand_context_writes_are_visible_afterwards() {
    // Writes from fan-out operands land in the shared context; ordering
    // between siblings is unspecified, but both writes survive the join.
    let lookup = CapabilityLookup::new()
        .bind(
            "mark_a",
            Capability::predicate(|ctx| {
                ctx.insert("a", json!(1));
                true
            }),
        )
        .bind(
            "mark_b",
            Capability::predicate(|ctx| {
                ctx.insert("b", json!(2));
                true
            }),
        );

    let ctx = Context::new();
    let node = invoke(Operator::And, vec![cap_ref("mark_a"), cap_ref("mark_b")]);
    assert!(evaluate_proposition(&node, &ctx, &lookup).await.unwrap());
    assert_eq!(ctx.get("a"), Some(json!(1)));
    assert_eq!(ctx.get("b"), Some(json!(2)));
}
