use std::{collections::BTreeMap, time::Duration};

use serde::Serialize;

use crate::sql::{
    executor::ResultSet,
    types::{Row, Value},
};

/// Counters and timing for one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    /// Rows visited while evaluating the statement
    pub rows_scanned: usize,
    /// Rows in the result
    pub rows_returned: usize,
    /// Column whose hash index served the lookup
    pub index_used: Option<String>,
    pub elapsed: Duration,
}

/// Outcome of one statement
///
/// Domain failures arrive here with `success == false` and the error text
/// in `message`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    /// Labels of the row values, empty for statements without output
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub stats: ExecutionStats,
}

impl ExecutionResult {
    /// Creates a failed result carrying `message`
    pub fn failure(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            message: message.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            stats: ExecutionStats {
                elapsed,
                ..ExecutionStats::default()
            },
        }
    }

    fn acknowledged(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            ..Self::failure(message, elapsed)
        }
    }

    /// Converts an executor result set into the public envelope
    pub fn from_result_set(result: ResultSet, elapsed: Duration) -> Self {
        match result {
            ResultSet::CreateTable { table_name } => {
                Self::acknowledged(format!("table {} created", table_name), elapsed)
            }
            ResultSet::DropTable { table_name } => {
                Self::acknowledged(format!("table {} dropped", table_name), elapsed)
            }
            ResultSet::Insert { count } => Self::acknowledged(format!("{} row inserted", count), elapsed),
            ResultSet::Update { count } => Self::acknowledged(format!("{} row(s) updated", count), elapsed),
            ResultSet::Delete { count } => Self::acknowledged(format!("{} row(s) deleted", count), elapsed),
            ResultSet::Scan {
                columns,
                rows,
                stats,
                index_used,
            } => Self {
                success: true,
                message: format!("{} row(s) returned", rows.len()),
                columns,
                rows,
                stats: ExecutionStats {
                    rows_scanned: stats.scanned,
                    rows_returned: stats.returned,
                    index_used,
                    elapsed,
                },
            },
            ResultSet::Tables { names } => {
                let rows: Vec<Row> = names.into_iter().map(|n| vec![Value::Text(n)]).collect();
                Self::listing(format!("{} table(s)", rows.len()), vec!["table".into()], rows, elapsed)
            }
            ResultSet::Schema { table_name, columns } => {
                let rows: Vec<Row> = columns
                    .into_iter()
                    .map(|c| {
                        vec![
                            Value::Text(c.name),
                            Value::Text(c.datatype.to_string()),
                            Value::Text(c.constraints.describe()),
                        ]
                    })
                    .collect();
                Self::listing(
                    format!("table {}: {} column(s)", table_name, rows.len()),
                    vec!["column".into(), "type".into(), "constraints".into()],
                    rows,
                    elapsed,
                )
            }
            ResultSet::Explain { lines } => Self::listing(
                "query plan".to_string(),
                vec!["plan".into()],
                lines.into_iter().map(|l| vec![Value::Text(l)]).collect(),
                elapsed,
            ),
        }
    }

    fn listing(message: String, columns: Vec<String>, rows: Vec<Row>, elapsed: Duration) -> Self {
        let count = rows.len();
        Self {
            success: true,
            message,
            columns,
            rows,
            stats: ExecutionStats {
                rows_scanned: count,
                rows_returned: count,
                index_used: None,
                elapsed,
            },
        }
    }

    /// Rows as column label to value mappings
    pub fn records(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// Value of `column` in row `row`, if both exist
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let pos = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(pos)
    }
}
