//! Filter predicates
//!
//! A [`Filter`] is a conjunction of `(dimension, operator, value)` terms
//! derived from a selection vector. Rendering pushes column names taken from
//! validated dimensions and binds every value as a parameter; no value is
//! ever spliced into the statement text.

use sqlx::{QueryBuilder, Sqlite};

use super::error::Result;
use super::schema::{CorpusSchema, Dimension};
use super::selection::{Facet, SelectionVector};

/// Comparison operator of a filter term.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => " = ",
        }
    }
}

/// One `column <op> ?` term.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Term {
    pub dimension: Dimension,
    pub op: CompareOp,
    pub value: String,
}

/// Conjunction of terms. An empty filter matches every row.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    /// One equality term per `Concrete` facet, in dimension order.
    pub fn from_selection(schema: &CorpusSchema, selection: &SelectionVector) -> Result<Self> {
        schema.check_selection(selection)?;
        let mut terms = Vec::new();
        for (index, facet) in selection.iter().enumerate() {
            if let Facet::Concrete(value) = facet {
                terms.push(Term {
                    dimension: schema.dimension(index)?,
                    op: CompareOp::Eq,
                    value: value.clone(),
                });
            }
        }
        Ok(Self { terms })
    }

    /// The same filter without any term on `dimension`.
    pub fn without(mut self, dimension: Dimension) -> Self {
        self.terms.retain(|t| t.dimension != dimension);
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Appends ` WHERE a = ? AND b = ?`, or nothing for an empty filter.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, term) in self.terms.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(term.dimension.column());
            qb.push(term.op.as_sql());
            qb.push_bind(term.value.clone());
        }
    }
}
