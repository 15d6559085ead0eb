//! Compiled predicates and their SQL rendering.

use serde::{Deserialize, Serialize};

use crate::clause::{FilterOp, Scalar};

/// Bind-parameter syntax of rendered SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    /// `?` (MySQL, SQLite).
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

/// One normalized, arity-checked condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column in storage convention.
    pub column: String,
    pub op: FilterOp,
    /// Operands in bind order.
    pub operands: Vec<Scalar>,
}

/// A boolean expression over conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// No conditions; matches every row.
    #[default]
    Empty,
    Condition(Condition),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::Empty)
    }

    /// Number of conditions in the expression.
    pub fn condition_count(&self) -> usize {
        match self {
            Predicate::Empty => 0,
            Predicate::Condition(_) => 1,
            Predicate::And(l, r) | Predicate::Or(l, r) => l.condition_count() + r.condition_count(),
        }
    }

    /// Conditions in clause order.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Predicate::Empty => {}
            Predicate::Condition(c) => out.push(c),
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.collect_conditions(out);
                r.collect_conditions(out);
            }
        }
    }

    /// Renders the expression for a WHERE clause. `Or` nodes are
    /// parenthesized; the empty predicate renders as `""`.
    pub fn render(&self, placeholder: Placeholder) -> RenderedPredicate {
        let mut renderer = Renderer {
            placeholder,
            params: Vec::new(),
        };
        let sql = renderer.predicate(self);
        RenderedPredicate {
            sql,
            params: renderer.params,
        }
    }
}

/// SQL text plus bind parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedPredicate {
    pub sql: String,
    pub params: Vec<Scalar>,
}

struct Renderer {
    placeholder: Placeholder,
    params: Vec<Scalar>,
}

impl Renderer {
    fn bind(&mut self, value: &Scalar) -> String {
        self.params.push(value.clone());
        match self.placeholder {
            Placeholder::Question => "?".to_string(),
            Placeholder::Numbered => format!("${}", self.params.len()),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Empty => String::new(),
            Predicate::Condition(c) => self.condition(c),
            Predicate::And(l, r) => {
                let l = self.predicate(l);
                let r = self.predicate(r);
                format!("{l} AND {r}")
            }
            Predicate::Or(l, r) => {
                let l = self.predicate(l);
                let r = self.predicate(r);
                format!("({l} OR {r})")
            }
        }
    }

    fn condition(&mut self, c: &Condition) -> String {
        let col = &c.column;
        match c.op {
            FilterOp::IsNull => format!("{col} IS NULL"),
            FilterOp::IsNotNull => format!("{col} IS NOT NULL"),
            FilterOp::In | FilterOp::NotIn => {
                let list = c
                    .operands
                    .iter()
                    .map(|v| self.bind(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                let keyword = if c.op == FilterOp::In { "IN" } else { "NOT IN" };
                format!("{col} {keyword} ({list})")
            }
            FilterOp::Between => {
                let lo = self.operand(c, 0);
                let hi = self.operand(c, 1);
                format!("{col} BETWEEN {lo} AND {hi}")
            }
            FilterOp::Match => {
                let v = self.operand(c, 0);
                format!("MATCH({col}) AGAINST ({v} IN BOOLEAN MODE)")
            }
            FilterOp::Equals => self.binary(c, "="),
            FilterOp::NotEquals => self.binary(c, "!="),
            FilterOp::LessThan => self.binary(c, "<"),
            FilterOp::LessThanEqual => self.binary(c, "<="),
            FilterOp::GreaterThan => self.binary(c, ">"),
            FilterOp::GreaterThanEqual => self.binary(c, ">="),
            FilterOp::Is => self.binary(c, "IS"),
            FilterOp::Like => self.binary(c, "LIKE"),
            FilterOp::ILike => self.binary(c, "ILIKE"),
            FilterOp::NotLike => self.binary(c, "NOT LIKE"),
        }
    }

    fn binary(&mut self, c: &Condition, symbol: &str) -> String {
        let v = self.operand(c, 0);
        format!("{} {symbol} {v}", c.column)
    }

    /// Binds operand `i`. Conditions are arity-checked at compile time, so
    /// a missing operand binds NULL rather than panicking.
    fn operand(&mut self, c: &Condition, i: usize) -> String {
        let value = c.operands.get(i).cloned().unwrap_or(Scalar::Null);
        self.bind(&value)
    }
}
