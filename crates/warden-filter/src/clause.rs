//! Filter clauses as received from a list operation.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A scalar operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Is,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    NotLike,
    Match,
    Between,
}

impl FilterOp {
    pub const ALL: [FilterOp; 16] = [
        FilterOp::Equals,
        FilterOp::NotEquals,
        FilterOp::LessThan,
        FilterOp::LessThanEqual,
        FilterOp::GreaterThan,
        FilterOp::GreaterThanEqual,
        FilterOp::Is,
        FilterOp::IsNull,
        FilterOp::IsNotNull,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::Like,
        FilterOp::ILike,
        FilterOp::NotLike,
        FilterOp::Match,
        FilterOp::Between,
    ];

    /// Wire name, e.g. `GREATER_THAN_EQUAL`.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Equals => "EQUALS",
            FilterOp::NotEquals => "NOT_EQUALS",
            FilterOp::LessThan => "LESS_THAN",
            FilterOp::LessThanEqual => "LESS_THAN_EQUAL",
            FilterOp::GreaterThan => "GREATER_THAN",
            FilterOp::GreaterThanEqual => "GREATER_THAN_EQUAL",
            FilterOp::Is => "IS",
            FilterOp::IsNull => "IS_NULL",
            FilterOp::IsNotNull => "IS_NOT_NULL",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT_IN",
            FilterOp::Like => "LIKE",
            FilterOp::ILike => "ILIKE",
            FilterOp::NotLike => "NOT_LIKE",
            FilterOp::Match => "MATCH",
            FilterOp::Between => "BETWEEN",
        }
    }

    /// Operand shape this operator requires.
    pub fn arity(self) -> Arity {
        match self {
            FilterOp::IsNull | FilterOp::IsNotNull => Arity::None,
            FilterOp::In | FilterOp::NotIn => Arity::AtLeastOne,
            FilterOp::Between => Arity::ExactlyTwo,
            _ => Arity::Single,
        }
    }
}

impl Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand shape of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No operand (null checks).
    None,
    /// Exactly one scalar in `value`.
    Single,
    /// One or more scalars in `values`.
    AtLeastOne,
    /// Exactly two scalars in `values`.
    ExactlyTwo,
}

/// How a clause joins the predicate compiled before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkOp {
    #[default]
    And,
    Or,
}

/// One filter condition of a list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkOp>,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: FilterOp) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
            values: Vec::new(),
            link: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the clause as OR-ed with everything compiled before it.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.link = Some(LinkOp::Or);
        self
    }

    pub fn link(&self) -> LinkOp {
        self.link.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clause_deserializes_from_wire_shape() {
        let json = r#"{"field":"createdAt","operator":"BETWEEN","values":["2020-01-01", 5],"link":"OR"}"#;
        let clause: FilterClause = serde_json::from_str(json).unwrap();
        assert_eq!(clause.operator, FilterOp::Between);
        assert_eq!(
            clause.values,
            vec![Scalar::Text("2020-01-01".into()), Scalar::Int(5)]
        );
        assert_eq!(clause.link(), LinkOp::Or);
        assert_eq!(clause.value, None);
    }

    #[test]
    fn test_link_defaults_to_and() {
        let clause: FilterClause =
            serde_json::from_str(r#"{"field":"name","operator":"ILIKE","value":"a%"}"#).unwrap();
        assert_eq!(clause.link(), LinkOp::And);
        assert_eq!(clause.operator, FilterOp::ILike);
    }

    #[test]
    fn test_wire_names_match_serde() {
        for op in FilterOp::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.as_str()));
        }
    }

    #[test]
    fn test_null_scalar() {
        let clause: FilterClause =
            serde_json::from_str(r#"{"field":"deletedAt","operator":"IS","value":null}"#).unwrap();
        // An explicit JSON null is indistinguishable from an absent value.
        assert_eq!(clause.value, None);
        assert_eq!(serde_json::from_str::<Scalar>("null").unwrap(), Scalar::Null);
    }
}
