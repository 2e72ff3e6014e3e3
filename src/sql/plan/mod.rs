use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::{self, ColumnRef, Condition, Literal},
        schema::Schema,
    },
    storage::Database,
};

mod planner;

use planner::Planner;

/// Execution plan node
///
/// Nodes still carry names and literals as written; executors bind them
/// against the live schemas when they run.
#[derive(Debug, PartialEq)]
pub enum Node {
    CreateTable {
        schema: Schema,
    },
    DropTable {
        table_name: String,
    },
    /// `columns` is None when every column is supplied in schema order
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Literal>,
    },
    /// Single-table selection, index-assisted when `filter` allows it
    Scan {
        table_name: String,
        filter: Vec<Condition>,
    },
    /// Pairs every left row with every right row satisfying `on`, then
    /// applies `filter` to the joined row
    NestedLoopJoin {
        left: Box<Node>,
        right: Box<Node>,
        on: (ColumnRef, ColumnRef),
        filter: Vec<Condition>,
    },
    /// Empty `columns` keeps every source column
    Projection {
        source: Box<Node>,
        columns: Vec<ColumnRef>,
    },
    Update {
        table_name: String,
        assignments: Vec<(String, Literal)>,
        filter: Vec<Condition>,
    },
    Delete {
        table_name: String,
        filter: Vec<Condition>,
    },
    DescribeSchema {
        table_name: String,
    },
    ListTables,
    /// Describes the wrapped query without running it
    Explain(Box<Node>),
}

/// Execution plan: the root node of a statement
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    pub fn build(stmt: ast::Statement) -> Result<Self> {
        Planner::new().build(stmt)
    }

    pub fn execute(self, db: &mut Database) -> Result<ResultSet> {
        <dyn Executor>::build(self.0).execute(db)
    }
}
