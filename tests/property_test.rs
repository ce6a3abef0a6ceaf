//! Property tests for indicator bounds, crossover detection and the
//! text round-trip of parsed strategies.

mod common;

use barsignal::domain::ast::{BinaryOperator, ExtremeKind, Node, Strategy as DslStrategy};
use barsignal::domain::compile;
use barsignal::domain::eval::evaluate;
use barsignal::domain::indicator::rsi::calculate_rsi;
use barsignal::domain::parser::parse;
use barsignal::domain::signal::Signal;
use barsignal::domain::validator::validate;
use common::bars_from_closes;
use proptest::prelude::*;

const FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];
const INDICATORS: [&str; 4] = ["sma", "ema", "rsi", "pct_change"];
const COMPARISONS: [BinaryOperator; 8] = [
    BinaryOperator::Gt,
    BinaryOperator::Lt,
    BinaryOperator::Ge,
    BinaryOperator::Le,
    BinaryOperator::Eq,
    BinaryOperator::Ne,
    BinaryOperator::CrossAbove,
    BinaryOperator::CrossBelow,
];

fn field() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS.to_vec()).prop_map(str::to_string)
}

fn window() -> impl Strategy<Value = f64> {
    (1u32..60).prop_map(f64::from)
}

fn operand() -> impl Strategy<Value = Node> {
    prop_oneof![
        field().prop_map(|field| Node::Series { field }),
        (-4000i32..4000).prop_map(|v| Node::number(f64::from(v) / 4.0)),
        (prop::sample::select(INDICATORS.to_vec()), field(), window())
            .prop_map(|(name, field, window)| Node::indicator(name, &field, window)),
        (field(), window()).prop_map(|(field, periods)| Node::Shift { field, periods }),
        (
            prop::sample::select(vec![ExtremeKind::Min, ExtremeKind::Max]),
            field(),
            window()
        )
            .prop_map(|(kind, field, window)| Node::RollingExtreme { kind, field, window }),
    ]
}

fn condition() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        4 => (operand(), prop::sample::select(COMPARISONS.to_vec()), operand())
            .prop_map(|(l, op, r)| Node::binary(l, op, r)),
        1 => Just(Node::Boolean { value: false }),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        (
            inner.clone(),
            prop::sample::select(vec![BinaryOperator::And, BinaryOperator::Or]),
            inner,
        )
            .prop_map(|(l, op, r)| Node::binary(l, op, r))
    })
}

fn dsl_strategy() -> impl Strategy<Value = DslStrategy> {
    (
        prop::collection::vec(condition(), 0..3),
        prop::collection::vec(condition(), 0..3),
    )
        .prop_map(|(entry, exit)| DslStrategy { entry, exit })
}

proptest! {
    #[test]
    fn rsi_stays_in_bounds(
        closes in prop::collection::vec(0.01f64..10_000.0, 0..120),
        period in 1usize..30,
    ) {
        for value in calculate_rsi(&closes, period).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value), "rsi {} out of bounds", value);
        }
    }

    #[test]
    fn canonical_text_round_trips(strategy in dsl_strategy()) {
        let text = strategy.to_string();
        let reparsed = parse(&text);
        prop_assert!(reparsed.is_ok(), "failed to reparse:\n{}\n{:?}", text, reparsed);
        prop_assert_eq!(reparsed.unwrap(), strategy.clone());
        prop_assert!(validate(&strategy).is_ok());
    }

    #[test]
    fn cross_above_fires_only_at_transition(
        below in prop::collection::vec(0.0f64..=10.0, 1..30),
        above in prop::collection::vec(10.5f64..20.0, 1..30),
    ) {
        let k = below.len();
        let closes: Vec<f64> = below.iter().chain(&above).copied().collect();
        let strategy = compile("ENTRY: (close cross_above 10)").unwrap();
        let signals = evaluate(&strategy, &bars_from_closes(&closes)).unwrap();

        prop_assert_eq!(signals.entry[0], Signal::Undefined);
        prop_assert_eq!(signals.entry.true_indices(), vec![k]);
    }
}
