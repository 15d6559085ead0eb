//! Clause-by-clause compilation into a [`Predicate`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_types::to_snake_case;

use crate::clause::{Arity, FilterClause, LinkOp};
use crate::predicate::{Condition, Placeholder, Predicate, RenderedPredicate};
use crate::{CompiledQuery, FilterError, ListOptions, Result};

/// Compiler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub placeholder: Placeholder,
}

/// Compiles ordered filter clauses into a predicate.
///
/// Pure and deterministic: the same clauses always yield the same
/// predicate, and one compiler is safe to share between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCompiler {
    settings: FilterSettings,
}

impl FilterCompiler {
    /// Creates a compiler with the given placeholder style.
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> FilterSettings {
        self.settings
    }

    /// Compiles `clauses` in order.
    ///
    /// An AND clause is conjoined with the accumulated predicate. An OR
    /// clause is disjoined with the *whole* accumulated predicate, not only
    /// the previous clause: `a AND b OR c` compiles to `(a AND b) OR c`.
    ///
    /// # Errors
    ///
    /// The first clause with a bad field name or wrong operand count aborts
    /// compilation; later clauses are not examined.
    pub fn compile(&self, clauses: &[FilterClause]) -> Result<Predicate> {
        let mut acc = Predicate::Empty;

        for (index, clause) in clauses.iter().enumerate() {
            let condition = compile_clause(clause).inspect_err(|e| {
                warn!(index, field = %clause.field, error = %e, "filter clause rejected");
            })?;
            acc = combine(acc, clause.link(), Predicate::Condition(condition));
        }

        debug!(clauses = clauses.len(), "filters compiled");
        Ok(acc)
    }

    /// Renders `predicate` with the configured placeholder style.
    pub fn render(&self, predicate: &Predicate) -> RenderedPredicate {
        predicate.render(self.settings.placeholder)
    }

    /// Compiles and renders `clauses`, carrying `options` through untouched.
    pub fn compile_query(
        &self,
        clauses: &[FilterClause],
        options: ListOptions,
    ) -> Result<CompiledQuery> {
        let predicate = self.compile(clauses)?;
        let rendered = self.render(&predicate);
        Ok(CompiledQuery {
            predicate,
            rendered,
            options,
        })
    }
}

fn combine(acc: Predicate, link: LinkOp, fragment: Predicate) -> Predicate {
    match (acc, link) {
        (Predicate::Empty, _) => fragment,
        (acc, LinkOp::And) => Predicate::And(Box::new(acc), Box::new(fragment)),
        (acc, LinkOp::Or) => Predicate::Or(Box::new(acc), Box::new(fragment)),
    }
}

fn compile_clause(clause: &FilterClause) -> Result<Condition> {
    let column = normalize_field(&clause.field)?;
    let op = clause.operator;

    let operands = match op.arity() {
        Arity::None => Vec::new(),
        Arity::Single => match &clause.value {
            Some(value) => vec![value.clone()],
            None => {
                return Err(FilterError::MissingValue {
                    field: clause.field.clone(),
                    op,
                });
            }
        },
        Arity::AtLeastOne if clause.values.is_empty() => {
            return Err(FilterError::Arity {
                field: clause.field.clone(),
                op,
                expected: "an array with at least 1 item in [values]",
            });
        }
        Arity::ExactlyTwo if clause.values.len() != 2 => {
            return Err(FilterError::Arity {
                field: clause.field.clone(),
                op,
                expected: "an array with exactly two items in [values]",
            });
        }
        Arity::AtLeastOne | Arity::ExactlyTwo => clause.values.clone(),
    };

    Ok(Condition {
        column,
        op,
        operands,
    })
}

/// Converts a field to its column name and checks it is a plain
/// identifier path (`[a-z0-9_]+` segments joined by `.`).
fn normalize_field(field: &str) -> Result<String> {
    let column = to_snake_case(field);
    let valid = !column.is_empty()
        && column.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        });

    if valid {
        Ok(column)
    } else {
        Err(FilterError::InvalidField(field.to_string()))
    }
}
