//! Conversion and reset benchmarks.
//!
//! The hot paths of a running game are reading a conversion's displayed
//! values after the base resource changed (every frame) and performing a
//! prestige (purchase + tree reset). These benchmarks cover both.
//!
//! Run with: `cargo bench --bench conversion_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use accrue_core::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_conversion(modifier_steps: usize) -> (Runtime, Resource, Conversion) {
    let rt = Runtime::new();
    let base = Resource::new(rt.persistent("main", "particles", BigNum::ZERO).unwrap(), "particles");
    let gain = Resource::new(rt.persistent("f", "points", BigNum::ZERO).unwrap(), "flame");
    let modifier = SequentialModifier::new(
        (0..modifier_steps)
            .map(|i| Modifier::multiplicative(&rt, 1.5, format!("boost {i}"), true))
            .collect(),
    );
    let conversion = Conversion::new(
        &rt,
        "f.conversion",
        ConversionOptions::new(base.clone(), gain, Polynomial::new(&rt, 10, 1.0 / 3.0))
            .gain_modifier(modifier)
            .kind(ConversionKind::Cumulative),
    )
    .unwrap();
    (rt, base, conversion)
}

// ---------------------------------------------------------------------------
// Benchmark 1: displayed values after a base change
// ---------------------------------------------------------------------------

fn bench_displayed_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion_read_after_write");
    for steps in [0usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            let (_rt, base, conversion) = build_conversion(steps);
            let mut n = 1e3;
            b.iter(|| {
                n *= 1.001;
                base.set(BigNum::from(n));
                black_box((
                    conversion.current_gain(),
                    conversion.current_at(),
                    conversion.next_at(),
                ))
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: huge magnitudes
// ---------------------------------------------------------------------------

fn bench_huge_base(c: &mut Criterion) {
    c.bench_function("conversion_huge_base", |b| {
        let (_rt, base, conversion) = build_conversion(4);
        let mut exponent = 400.0;
        b.iter(|| {
            exponent += 1.0;
            base.set(BigNum::from_parts(1.5, exponent));
            black_box(conversion.current_gain())
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 3: one-way reset propagation
// ---------------------------------------------------------------------------

/// A `width`-wide, `depth`-deep lattice where every node branches to every
/// node of the next layer.
fn build_lattice(rt: &Runtime, width: usize, depth: usize) -> Tree {
    let mut side_nodes = Vec::new();
    let mut branches = Vec::new();
    for d in 0..depth {
        for w in 0..width {
            let id = format!("n{d}_{w}");
            let reset = Reset::new(rt, format!("{id}.reset"), ResetOptions::targets([id.clone()]));
            side_nodes.push(TreeNode::new(
                rt,
                id.clone(),
                TreeNodeOptions {
                    reset: Some(reset),
                    ..Default::default()
                },
            ));
            if d + 1 < depth {
                for next in 0..width {
                    branches.push(Branch::new(id.clone(), format!("n{}_{next}", d + 1)));
                }
            }
        }
    }
    Tree::new(
        rt,
        TreeOptions {
            side_nodes,
            branches,
            reset_propagation: ResetPropagation::OneWayBranched.into(),
            ..Default::default()
        },
    )
    .unwrap()
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_way_propagation");
    for width in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let rt = Runtime::new();
            let tree = build_lattice(&rt, width, 6);
            b.iter(|| black_box(tree.reset("n0_0")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_displayed_values, bench_huge_base, bench_propagation);
criterion_main!(benches);
