//! BigNum arithmetic benchmarks.
//!
//! Every tick of an incremental game performs a handful of additions and
//! multiplications per resource, and every conversion display performs a
//! `pow`/`log` pair. These benchmarks track the cost of those primitives
//! inside and outside the `f64` range.
//!
//! Run with: `cargo bench --bench num_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use accrue_num::BigNum;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn operands() -> Vec<(&'static str, BigNum, BigNum)> {
    vec![
        ("small", BigNum::from(1234.5), BigNum::from(67.25)),
        (
            "beyond_f64",
            BigNum::from_parts(3.3, 4_000.0),
            BigNum::from_parts(7.1, 3_990.0),
        ),
        (
            "huge_exponent",
            BigNum::from_parts(1.5, 1e200),
            BigNum::from_parts(2.5, 1e200),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Benchmark 1: field arithmetic
// ---------------------------------------------------------------------------

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");
    for (label, a, b) in operands() {
        group.bench_with_input(BenchmarkId::new("add", label), &(a, b), |bench, &(a, b)| {
            bench.iter(|| black_box(black_box(a) + black_box(b)));
        });
        group.bench_with_input(BenchmarkId::new("mul", label), &(a, b), |bench, &(a, b)| {
            bench.iter(|| black_box(black_box(a) * black_box(b)));
        });
        group.bench_with_input(BenchmarkId::new("div", label), &(a, b), |bench, &(a, b)| {
            bench.iter(|| black_box(black_box(a) / black_box(b)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: powers and logarithms
// ---------------------------------------------------------------------------

fn bench_pow_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("pow_log");
    for (label, a, _) in operands() {
        group.bench_with_input(BenchmarkId::new("pow_third", label), &a, |bench, &a| {
            bench.iter(|| black_box(black_box(a).pow(1.0 / 3.0)));
        });
        group.bench_with_input(BenchmarkId::new("pow_int", label), &a, |bench, &a| {
            bench.iter(|| black_box(black_box(a).pow(7.0)));
        });
        group.bench_with_input(BenchmarkId::new("log10", label), &a, |bench, &a| {
            bench.iter(|| black_box(black_box(a).log10()));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 3: accumulation over a simulated idle session
// ---------------------------------------------------------------------------

fn bench_accumulate(c: &mut Criterion) {
    c.bench_function("accumulate_10k_ticks", |b| {
        let rate = BigNum::from(1.7);
        b.iter(|| {
            let mut total = BigNum::ZERO;
            for _ in 0..10_000 {
                total += rate * 0.05;
            }
            black_box(total)
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 4: text round trip
// ---------------------------------------------------------------------------

fn bench_text(c: &mut Criterion) {
    let value = BigNum::from_parts(6.02214076, 12_345.0);
    c.bench_function("display_parse_round_trip", |b| {
        b.iter(|| {
            let text = black_box(value).to_string();
            black_box(text.parse::<BigNum>().ok())
        });
    });
    c.bench_function("format_precision_2", |b| {
        b.iter(|| black_box(black_box(value).format(2)));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_arithmetic,
    bench_pow_log,
    bench_accumulate,
    bench_text,
);
criterion_main!(benches);
