//! Property tests for the reactive graph.
//!
//! Random layered graphs of signals and summing deriveds are mutated with
//! random write sequences. After every write the memoized values must equal
//! a from-scratch recomputation, and no derived may run more than once per
//! observed change.

use accrue_reactive::prelude::*;
use proptest::prelude::*;

/// One derived: sums the listed inputs (indices into the node list built so
/// far) and adds a constant.
#[derive(Debug, Clone)]
struct DerivedSpec {
    inputs: Vec<usize>,
    offset: i64,
}

#[derive(Debug, Clone)]
enum GraphOp {
    Set(usize, i64),
    Read(usize),
}

fn graph_strategy() -> impl Strategy<Value = (usize, Vec<DerivedSpec>)> {
    (1usize..6).prop_flat_map(|signals| {
        let derived = prop::collection::vec(
            (prop::collection::vec(0usize..64, 1..4), -5i64..5),
            1..12,
        )
        .prop_map(move |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (inputs, offset))| DerivedSpec {
                    // Only reference nodes created earlier, keeping the graph acyclic.
                    inputs: inputs.into_iter().map(|x| x % (signals + i)).collect(),
                    offset,
                })
                .collect::<Vec<_>>()
        });
        (Just(signals), derived)
    })
}

fn op_strategy() -> impl Strategy<Value = GraphOp> {
    prop_oneof![
        (0usize..64, -100i64..100).prop_map(|(i, v)| GraphOp::Set(i, v)),
        (0usize..64).prop_map(GraphOp::Read),
    ]
}

/// Reference evaluation with plain integers.
fn evaluate(signals: &[i64], specs: &[DerivedSpec]) -> Vec<i64> {
    let mut values: Vec<i64> = signals.to_vec();
    for spec in specs {
        let sum: i64 = spec.inputs.iter().map(|&i| values[i]).sum::<i64>() + spec.offset;
        values.push(sum);
    }
    values
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn memoized_values_match_recomputation(
        (signal_count, specs) in graph_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let rt = Runtime::new();
        let signals: Vec<Signal<i64>> = (0..signal_count)
            .map(|i| rt.signal(format!("s{i}"), 0_i64))
            .collect();

        // Node i < signal_count is a signal; the rest are deriveds.
        let mut readers: Vec<Box<dyn Fn() -> i64>> = signals
            .iter()
            .map(|s| {
                let s = s.clone();
                Box::new(move || s.get()) as Box<dyn Fn() -> i64>
            })
            .collect();
        let mut deriveds: Vec<Derived<i64>> = Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            let inputs: Vec<std::rc::Rc<dyn Fn() -> i64>> = spec
                .inputs
                .iter()
                .map(|&idx| {
                    if idx < signal_count {
                        let s = signals[idx].clone();
                        std::rc::Rc::new(move || s.get()) as std::rc::Rc<dyn Fn() -> i64>
                    } else {
                        let d: Derived<i64> = deriveds[idx - signal_count].clone();
                        std::rc::Rc::new(move || d.get()) as std::rc::Rc<dyn Fn() -> i64>
                    }
                })
                .collect();
            let offset = spec.offset;
            let d = rt.derived(format!("d{i}"), move || {
                inputs.iter().map(|f| f()).sum::<i64>() + offset
            });
            readers.push({
                let d = d.clone();
                Box::new(move || d.get()) as Box<dyn Fn() -> i64>
            });
            deriveds.push(d);
        }

        let mut plain = vec![0_i64; signal_count];
        for op in ops {
            match op {
                GraphOp::Set(i, v) => {
                    let i = i % signal_count;
                    signals[i].set(v);
                    plain[i] = v;
                }
                GraphOp::Read(i) => {
                    let i = i % readers.len();
                    let before: Vec<u64> = deriveds.iter().map(|d| d.evaluations()).collect();
                    let first = readers[i]();
                    let second = readers[i]();
                    prop_assert_eq!(first, second);
                    // A second read with no writes in between never recomputes.
                    let after_second: Vec<u64> = deriveds.iter().map(|d| d.evaluations()).collect();
                    for (b, a) in before.iter().zip(&after_second) {
                        prop_assert!(a - b <= 1);
                    }
                }
            }
            let expected = evaluate(&plain, &specs);
            for (i, d) in deriveds.iter().enumerate() {
                prop_assert_eq!(d.get(), expected[signal_count + i]);
            }
        }
    }

    #[test]
    fn equal_writes_never_bump_revision(value in -1000i64..1000, repeats in 1usize..10) {
        let rt = Runtime::new();
        let s = rt.signal("s", value);
        let rev = rt.revision();
        for _ in 0..repeats {
            s.set(value);
        }
        prop_assert_eq!(rt.revision(), rev);
    }
}
