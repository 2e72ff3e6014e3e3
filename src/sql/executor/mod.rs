use crate::{
    error::{Error, Result},
    sql::{
        executor::{
            join::NestedLoopJoin,
            mutation::{Delete, Insert, Update},
            query::{Explain, Projection, Scan},
            schema::{CreateTable, DescribeSchema, DropTable, ListTables},
        },
        parser::ast::{ColumnRef, Condition},
        plan::Node,
        schema::{Column, Schema},
        types::Row,
    },
    storage::{
        Database,
        predicate::{Comparison, Predicate},
        table::ScanStats,
    },
};

mod join;
mod mutation;
mod query;
mod schema;

/// SQL executor trait
pub trait Executor {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet>;
}

impl dyn Executor {
    /// Builds an executor from a plan node, recursing into child nodes
    pub fn build(node: Node) -> Box<dyn Executor> {
        match node {
            Node::CreateTable { schema } => CreateTable::new(schema),
            Node::DropTable { table_name } => DropTable::new(table_name),
            Node::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Node::Scan { table_name, filter } => Scan::new(table_name, filter),
            Node::NestedLoopJoin {
                left,
                right,
                on,
                filter,
            } => NestedLoopJoin::new(Self::build(*left), Self::build(*right), on, filter),
            Node::Projection { source, columns } => Projection::new(Self::build(*source), columns),
            Node::Update {
                table_name,
                assignments,
                filter,
            } => Update::new(table_name, assignments, filter),
            Node::Delete { table_name, filter } => Delete::new(table_name, filter),
            Node::DescribeSchema { table_name } => DescribeSchema::new(table_name),
            Node::ListTables => ListTables::new(),
            Node::Explain(node) => Explain::new(*node),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable {
        table_name: String,
    },
    DropTable {
        table_name: String,
    },
    Insert {
        count: usize,
    },
    /// Rows labelled by `columns`; `index_used` names the probed column
    Scan {
        columns: Vec<String>,
        rows: Vec<Row>,
        stats: ScanStats,
        index_used: Option<String>,
    },
    Update {
        count: usize,
    },
    Delete {
        count: usize,
    },
    Tables {
        names: Vec<String>,
    },
    Schema {
        table_name: String,
        columns: Vec<Column>,
    },
    Explain {
        lines: Vec<String>,
    },
}

/// Label of a column inside a scan or join, always table-qualified
fn label(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

/// Splits a qualified label into table and column
fn split_label(label: &str) -> (&str, &str) {
    label.split_once('.').unwrap_or(("", label))
}

/// Finds the position of `column` among qualified labels. A bare name must
/// match exactly one label.
fn resolve_column(labels: &[String], column: &ColumnRef) -> Result<usize> {
    let mut found = labels.iter().enumerate().filter(|(_, l)| {
        let (table, name) = split_label(l);
        name == column.name && column.table.as_deref().is_none_or(|t| t == table)
    });
    match (found.next(), found.next()) {
        (Some((pos, _)), None) => Ok(pos),
        (Some(_), Some(_)) => Err(Error::Schema(format!("ambiguous column name {}", column))),
        (None, _) => Err(Error::NotFound(format!("column {}", column))),
    }
}

/// Binds WHERE conditions against one table, coercing each literal to the
/// column type
fn bind_filter(schema: &Schema, filter: &[Condition]) -> Result<Predicate> {
    let mut conditions = Vec::with_capacity(filter.len());
    for cond in filter {
        if cond.column.table.as_deref().is_some_and(|t| t != schema.name) {
            return Err(Error::NotFound(format!("column {}", cond.column)));
        }
        let column = schema.must_position(&cond.column.name)?;
        conditions.push(Comparison {
            column,
            op: cond.op,
            value: schema.column(column).datatype.coerce(&cond.value)?,
        });
    }
    Ok(Predicate::new(conditions))
}

/// Binds WHERE conditions against the labels of a joined row
fn bind_joined_filter(db: &Database, labels: &[String], filter: &[Condition]) -> Result<Predicate> {
    let mut conditions = Vec::with_capacity(filter.len());
    for cond in filter {
        let column = resolve_column(labels, &cond.column)?;
        let (table, name) = split_label(&labels[column]);
        let schema = db.must_get_table(table)?.schema();
        let datatype = schema.column(schema.must_position(name)?).datatype;
        conditions.push(Comparison {
            column,
            op: cond.op,
            value: datatype.coerce(&cond.value)?,
        });
    }
    Ok(Predicate::new(conditions))
}

fn describe_filter(filter: &[Condition]) -> String {
    filter
        .iter()
        .map(|c| format!("{} {} {}", c.column, c.op, c.value))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{ResultSet, resolve_column};
    use crate::{
        config::Config,
        error::{Error, Result},
        sql::{
            parser::{Parser, ast::ColumnRef},
            plan::Plan,
            types::Value,
        },
        storage::Database,
    };

    pub(super) fn execute(db: &mut Database, sql: &str) -> Result<ResultSet> {
        Plan::build(Parser::new(sql).parse()?)?.execute(db)
    }

    pub(super) fn setup(dir: &TempDir, statements: &[&str]) -> Result<Database> {
        let mut db = Database::open(Config::new(dir.path()))?;
        for sql in statements {
            execute(&mut db, sql)?;
        }
        Ok(db)
    }

    #[test]
    fn test_resolve_column() {
        let labels = vec!["a.id".to_string(), "a.name".to_string(), "b.id".to_string()];
        assert_eq!(resolve_column(&labels, &ColumnRef::bare("name")), Ok(1));
        assert_eq!(resolve_column(&labels, &ColumnRef::qualified("b", "id")), Ok(2));
        assert!(matches!(resolve_column(&labels, &ColumnRef::bare("id")), Err(Error::Schema(_))));
        assert!(matches!(
            resolve_column(&labels, &ColumnRef::qualified("c", "id")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_filter_binding_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = setup(&dir, &["create table t (id int primary key, name text)"])?;
        assert!(matches!(
            execute(&mut db, "select * from t where nope = 1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            execute(&mut db, "select * from t where other.id = 1"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            execute(&mut db, "select * from t where id = 'abc'"),
            Err(Error::Type(_))
        ));
        // Integer-valued strings coerce like they do on insert
        execute(&mut db, "insert into t values (7, 'x')")?;
        let ResultSet::Scan { rows, .. } = execute(&mut db, "select * from t where id = '7'")? else {
            panic!("expected scan");
        };
        assert_eq!(rows, vec![vec![Value::Integer(7), Value::Text("x".into())]]);
        Ok(())
    }
}
