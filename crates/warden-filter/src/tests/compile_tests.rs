//! Operator rendering, arity and combination tests.

use test_case::test_case;

use crate::{
    FilterClause, FilterCompiler, FilterError, FilterOp, FilterSettings, ListOptions, Placeholder,
    Predicate, Scalar, SortDirection,
};

fn sql(clauses: &[FilterClause]) -> String {
    let compiler = FilterCompiler::default();
    compiler.render(&compiler.compile(clauses).unwrap()).sql
}

#[test_case(FilterOp::Equals => "status = ?")]
#[test_case(FilterOp::NotEquals => "status != ?")]
#[test_case(FilterOp::LessThan => "status < ?")]
#[test_case(FilterOp::LessThanEqual => "status <= ?")]
#[test_case(FilterOp::GreaterThan => "status > ?")]
#[test_case(FilterOp::GreaterThanEqual => "status >= ?")]
#[test_case(FilterOp::Is => "status IS ?")]
#[test_case(FilterOp::Like => "status LIKE ?")]
#[test_case(FilterOp::ILike => "status ILIKE ?")]
#[test_case(FilterOp::NotLike => "status NOT LIKE ?")]
#[test_case(FilterOp::Match => "MATCH(status) AGAINST (? IN BOOLEAN MODE)")]
fn test_single_value_operators(op: FilterOp) -> String {
    sql(&[FilterClause::new("status", op).with_value("x")])
}

#[test_case(FilterOp::IsNull => "deleted_at IS NULL")]
#[test_case(FilterOp::IsNotNull => "deleted_at IS NOT NULL")]
fn test_null_checks_take_no_operand(op: FilterOp) -> String {
    sql(&[FilterClause::new("deletedAt", op)])
}

#[test]
fn test_in_lists_bind_every_value() {
    let compiler = FilterCompiler::default();
    let predicate = compiler
        .compile(&[FilterClause::new("id", FilterOp::NotIn).with_values([1_i64, 2, 3])])
        .unwrap();
    let rendered = compiler.render(&predicate);
    assert_eq!(rendered.sql, "id NOT IN (?, ?, ?)");
    assert_eq!(
        rendered.params,
        vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]
    );
}

#[test]
fn test_between_normalizes_field() {
    let compiler = FilterCompiler::default();
    let predicate = compiler
        .compile(&[FilterClause::new("createdAt", FilterOp::Between).with_values(["t0", "t1"])])
        .unwrap();
    let rendered = compiler.render(&predicate);
    assert_eq!(rendered.sql, "created_at BETWEEN ? AND ?");
    assert_eq!(rendered.params, vec![Scalar::from("t0"), Scalar::from("t1")]);
}

#[test_case(vec!["a"]; "one value")]
#[test_case(vec!["a", "b", "c"]; "three values")]
#[test_case(vec![]; "no values")]
fn test_between_needs_exactly_two(values: Vec<&str>) {
    let result = FilterCompiler::default()
        .compile(&[FilterClause::new("status", FilterOp::Between).with_values(values)]);
    assert!(matches!(
        result,
        Err(FilterError::Arity {
            op: FilterOp::Between,
            ..
        })
    ));
}

#[test_case(FilterOp::In)]
#[test_case(FilterOp::NotIn)]
fn test_in_needs_at_least_one(op: FilterOp) {
    let result = FilterCompiler::default().compile(&[FilterClause::new("status", op)]);
    assert!(matches!(result, Err(FilterError::Arity { .. })));
}

#[test]
fn test_missing_value_is_rejected() {
    for op in [FilterOp::Equals, FilterOp::Is, FilterOp::Like, FilterOp::Match] {
        let result = FilterCompiler::default().compile(&[FilterClause::new("name", op)]);
        assert_eq!(
            result,
            Err(FilterError::MissingValue {
                field: "name".into(),
                op
            })
        );
    }
}

#[test]
fn test_first_failure_aborts() {
    let clauses = [
        FilterClause::new("a", FilterOp::Equals).with_value(1_i64),
        FilterClause::new("b", FilterOp::Between).with_values([1_i64]),
        FilterClause::new("bad field!", FilterOp::Equals).with_value(1_i64),
    ];
    let err = FilterCompiler::default().compile(&clauses).unwrap_err();
    assert!(matches!(err, FilterError::Arity { ref field, .. } if field == "b"));
}

#[test]
fn test_invalid_field_is_rejected() {
    let result = FilterCompiler::default()
        .compile(&[FilterClause::new("1=1 OR x", FilterOp::IsNull)]);
    assert!(matches!(result, Err(FilterError::InvalidField(_))));
}

#[test]
fn test_empty_clause_list_is_empty_predicate() {
    let compiler = FilterCompiler::default();
    let predicate = compiler.compile(&[]).unwrap();
    assert!(predicate.is_empty());
    assert_eq!(compiler.render(&predicate).sql, "");
}

#[test]
fn test_clauses_combine_with_and_by_default() {
    assert_eq!(
        sql(&[
            FilterClause::new("a", FilterOp::Equals).with_value(1_i64),
            FilterClause::new("b", FilterOp::Equals).with_value(2_i64),
            FilterClause::new("c", FilterOp::IsNull),
        ]),
        "a = ? AND b = ? AND c IS NULL"
    );
}

#[test]
fn test_or_applies_to_everything_before_it() {
    let clauses = [
        FilterClause::new("a", FilterOp::Equals).with_value(1_i64),
        FilterClause::new("b", FilterOp::Equals).with_value(2_i64),
        FilterClause::new("c", FilterOp::Equals).with_value(3_i64).or(),
        FilterClause::new("d", FilterOp::Equals).with_value(4_i64),
    ];
    let predicate = FilterCompiler::default().compile(&clauses).unwrap();
    assert!(matches!(predicate, Predicate::And(ref l, _) if matches!(**l, Predicate::Or(..))));
    assert_eq!(sql(&clauses), "(a = ? AND b = ? OR c = ?) AND d = ?");
}

#[test]
fn test_leading_or_is_just_the_fragment() {
    assert_eq!(
        sql(&[FilterClause::new("a", FilterOp::Equals).with_value(1_i64).or()]),
        "a = ?"
    );
}

#[test]
fn test_numbered_placeholders() {
    let compiler = FilterCompiler::new(FilterSettings {
        placeholder: Placeholder::Numbered,
    });
    let predicate = compiler
        .compile(&[
            FilterClause::new("id", FilterOp::In).with_values([1_i64, 2]),
            FilterClause::new("createdAt", FilterOp::Between).with_values([3_i64, 4]),
            FilterClause::new("body", FilterOp::Match).with_value("rust").or(),
        ])
        .unwrap();
    assert_eq!(
        compiler.render(&predicate).sql,
        "(id IN ($1, $2) AND created_at BETWEEN $3 AND $4 OR MATCH(body) AGAINST ($5 IN BOOLEAN MODE))"
    );
}

#[test]
fn test_compile_query_passes_options_through() {
    let options: ListOptions = serde_json::from_str(
        r#"{"limit": 20, "offset": 40, "orderBy": "createdAt", "sortDirection": "DESC"}"#,
    )
    .unwrap();
    let query = FilterCompiler::default()
        .compile_query(
            &[FilterClause::new("status", FilterOp::Equals).with_value("active")],
            options.clone(),
        )
        .unwrap();

    assert_eq!(query.options, options);
    assert_eq!(query.options.order_by.as_deref(), Some("createdAt"));
    assert_eq!(query.options.sort_direction, Some(SortDirection::Desc));
    assert_eq!(query.rendered.sql, "status = ?");
}
