use crate::sql::types::{Operator, Row, Value};

/// A single bound comparison: `row[column] <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub column: usize,
    pub op: Operator,
    pub value: Value,
}

/// AND-conjoined comparisons over column positions
///
/// Produced by binding a parsed WHERE clause against a schema; an empty
/// predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Comparison>,
}

impl Predicate {
    pub fn new(conditions: Vec<Comparison>) -> Self {
        Self { conditions }
    }

    /// Predicate that matches every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for a one-term equality predicate
    pub fn equals(column: usize, value: Value) -> Self {
        Self::new(vec![Comparison { column, op: Operator::Equal, value }])
    }

    pub fn conditions(&self) -> &[Comparison] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|c| row.get(c.column).is_some_and(|v| c.op.evaluate(v, &c.value)))
    }

    /// First non-null equality on a column accepted by `indexed`
    pub fn index_probe(&self, indexed: impl Fn(usize) -> bool) -> Option<&Comparison> {
        self.conditions
            .iter()
            .find(|c| c.op == Operator::Equal && !c.value.is_null() && indexed(c.column))
    }
}
