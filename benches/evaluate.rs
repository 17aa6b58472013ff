use criterion::{black_box, criterion_group, criterion_main, Criterion};
use switchboard::{
    evaluate_proposition, invoke, lit, CapabilityLookup, CircuitNode, Context, Operator,
};
use tokio::runtime::Runtime;

/// AND over `n` literal operands: measures fan-out cost per operand.
fn wide_circuit(n: usize) -> CircuitNode {
    invoke(Operator::And, (0..n).map(|_| lit(true)).collect())
}

/// A NOT chain of the given depth: measures recursion overhead.
fn deep_circuit(depth: usize) -> CircuitNode {
    let mut node = lit(true);
    for _ in 0..depth {
        node = !node;
    }
    node
}

/// Nested IF chain: every level trampolines through OR/NOT.
fn compositional_circuit(depth: usize) -> CircuitNode {
    let mut node = lit(true);
    for _ in 0..depth {
        node = invoke(Operator::If, vec![lit(true), node]);
    }
    node
}

fn bench_evaluate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let lookup = CapabilityLookup::new();
    let ctx = Context::new();

    let mut group = c.benchmark_group("evaluate");

    for &n in &[4, 16, 64] {
        let node = wide_circuit(n);
        group.bench_function(format!("and_width_{n}"), |b| {
            b.to_async(&rt).iter(|| {
                let node = &node;
                let ctx = &ctx;
                let lookup = &lookup;
                async move {
                    evaluate_proposition(black_box(node), ctx, lookup)
                        .await
                        .unwrap()
                }
            });
        });
    }

    for &depth in &[8, 32, 96] {
        let node = deep_circuit(depth);
        group.bench_function(format!("not_depth_{depth}"), |b| {
            b.to_async(&rt).iter(|| {
                let node = &node;
                let ctx = &ctx;
                let lookup = &lookup;
                async move {
                    evaluate_proposition(black_box(node), ctx, lookup)
                        .await
                        .unwrap()
                }
            });
        });
    }

    for &depth in &[4, 16, 48] {
        let node = compositional_circuit(depth);
        group.bench_function(format!("if_chain_{depth}"), |b| {
            b.to_async(&rt).iter(|| {
                let node = &node;
                let ctx = &ctx;
                let lookup = &lookup;
                async move {
                    evaluate_proposition(black_box(node), ctx, lookup)
                        .await
                        .unwrap()
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
