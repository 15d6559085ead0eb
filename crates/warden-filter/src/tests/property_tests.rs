//! Property-based tests using proptest.

use proptest::prelude::*;

use crate::{Arity, FilterClause, FilterCompiler, FilterError, FilterOp, LinkOp, Scalar};

fn scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        Just(Scalar::Null),
        any::<bool>().prop_map(Scalar::Bool),
        any::<i64>().prop_map(Scalar::Int),
        "[a-z%]{0,8}".prop_map(Scalar::Text),
    ]
}

fn field() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,10}"
}

/// A clause that satisfies its operator's arity rule.
fn valid_clause() -> impl Strategy<Value = FilterClause> {
    (
        field(),
        prop::sample::select(FilterOp::ALL.to_vec()),
        scalar(),
        prop::collection::vec(scalar(), 1..5),
        prop::option::of(prop_oneof![Just(LinkOp::And), Just(LinkOp::Or)]),
    )
        .prop_map(|(field, op, value, mut values, link)| {
            let mut clause = FilterClause::new(field, op);
            clause.link = link;
            match op.arity() {
                Arity::None => {}
                Arity::Single => clause.value = Some(value),
                Arity::AtLeastOne => clause.values = values,
                Arity::ExactlyTwo => {
                    values.resize(2, Scalar::Null);
                    clause.values = values;
                }
            }
            clause
        })
}

proptest! {
    /// Valid clause sequences compile to one condition per clause, in order.
    #[test]
    fn valid_sequences_compile_one_fragment_per_clause(
        clauses in prop::collection::vec(valid_clause(), 0..12)
    ) {
        let predicate = FilterCompiler::default().compile(&clauses).unwrap();
        prop_assert_eq!(predicate.condition_count(), clauses.len());

        let ops: Vec<FilterOp> = predicate.conditions().iter().map(|c| c.op).collect();
        let expected: Vec<FilterOp> = clauses.iter().map(|c| c.operator).collect();
        prop_assert_eq!(ops, expected);
    }

    /// Compilation is deterministic and the placeholder count matches the
    /// bound parameters.
    #[test]
    fn rendering_is_deterministic(clauses in prop::collection::vec(valid_clause(), 0..8)) {
        let compiler = FilterCompiler::default();
        let a = compiler.render(&compiler.compile(&clauses).unwrap());
        let b = compiler.render(&compiler.compile(&clauses).unwrap());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.sql.matches('?').count(), a.params.len());
    }

    /// Appending a BETWEEN clause with the wrong number of values always
    /// fails, whatever precedes it.
    #[test]
    fn bad_between_always_fails(
        prefix in prop::collection::vec(valid_clause(), 0..6),
        count in prop_oneof![Just(0_usize), Just(1), 3_usize..6],
    ) {
        let mut clauses = prefix;
        clauses.push(
            FilterClause::new("status", FilterOp::Between)
                .with_values(std::iter::repeat_n(1_i64, count)),
        );
        let result = FilterCompiler::default().compile(&clauses);
        let is_arity_error = matches!(result, Err(FilterError::Arity { .. }));
        prop_assert!(is_arity_error);
    }
}
